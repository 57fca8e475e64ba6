//! Per-category price aggregate
//!
//! Records are grouped by their own `category` column, not by the category
//! they were crawled under. Sums are kept as `Decimal`, so the result does not
//! depend on record order.

use crate::model::{BookRecord, CategoryStats};
use crate::output::csv_output::write_csv_atomically;
use crate::PersistenceError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Column order of the aggregate CSV
pub const AGGREGATE_HEADERS: [&str; 3] = ["category", "books_count", "average_price"];

/// Aggregate table keyed by category name, in alphabetical order
pub type Aggregate = BTreeMap<String, CategoryStats>;

/// Folds book records into per-category counts and average prices
///
/// The average is taken over `price_including_tax` and is `0.0` for a
/// category with no books. A category whose price total does not fit in a
/// `Decimal` is logged and left out of the table.
pub fn aggregate(records: &[BookRecord]) -> Aggregate {
    let mut totals: BTreeMap<&str, Option<(u64, Decimal)>> = BTreeMap::new();
    for record in records {
        let entry = totals
            .entry(record.category.as_str())
            .or_insert(Some((0, Decimal::ZERO)));
        *entry = entry.and_then(|(count, total)| {
            let sum = total.checked_add(record.price_including_tax);
            if sum.is_none() {
                tracing::warn!(
                    "Price total for '{}' overflowed at {}, dropping category from aggregate",
                    record.category,
                    record.product_page_url
                );
            }
            sum.map(|sum| (count + 1, sum))
        });
    }

    totals
        .into_iter()
        .filter_map(|(category, totals)| totals.map(|totals| (category, totals)))
        .map(|(category, (count, total))| {
            let average_price = if count == 0 {
                0.0
            } else {
                (total / Decimal::from(count)).to_f64().unwrap_or(0.0)
            };
            (
                category.to_string(),
                CategoryStats {
                    category: category.to_string(),
                    books_count: count,
                    average_price,
                },
            )
        })
        .collect()
}

/// Writes the aggregate table, replacing any previous file
pub fn write_aggregate(path: &Path, stats: &Aggregate) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
    }

    write_csv_atomically(path, |writer| {
        writer.write_record(AGGREGATE_HEADERS)?;
        for entry in stats.values() {
            writer.write_record([
                entry.category.clone(),
                entry.books_count.to_string(),
                entry.average_price.to_string(),
            ])?;
        }
        Ok(())
    })?;

    tracing::info!("Wrote aggregate for {} categories to {}", stats.len(), path.display());
    Ok(())
}

/// Reads an aggregate table written by [`write_aggregate`]
pub fn read_aggregate(path: &Path) -> Result<Aggregate, PersistenceError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| PersistenceError::csv(path, e))?;
    let mut stats = Aggregate::new();

    for row in reader.records() {
        let row = row.map_err(|e| PersistenceError::csv(path, e))?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let malformed = |message: String| PersistenceError::Malformed {
            path: path.to_path_buf(),
            line,
            message,
        };

        let (Some(category), Some(count), Some(average)) = (row.get(0), row.get(1), row.get(2))
        else {
            return Err(malformed(format!("expected 3 columns, found {}", row.len())));
        };
        let books_count = count
            .trim()
            .parse()
            .map_err(|_| malformed(format!("bad books_count {:?}", count)))?;
        let average_price = average
            .trim()
            .parse()
            .map_err(|_| malformed(format!("bad average_price {:?}", average)))?;

        stats.insert(
            category.to_string(),
            CategoryStats {
                category: category.to_string(),
                books_count,
                average_price,
            },
        );
    }

    Ok(stats)
}
