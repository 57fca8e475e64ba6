//! Per-category CSV output
//!
//! Each category gets `{data_dir}/{slug}/scraped_books_{slug}.csv`. Files are
//! rewritten from scratch on every run, never appended to. A rewrite goes to a
//! temporary file that replaces the old CSV only once it is complete.

use crate::model::{parse_price, BookRecord, Rating};
use crate::PersistenceError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Column order of a category CSV
pub const BOOK_HEADERS: [&str; 10] = [
    "product_page_url",
    "universal_product_code (upc)",
    "title",
    "price_including_tax",
    "price_excluding_tax",
    "number_available",
    "product_description",
    "category",
    "review_rating",
    "image_url",
];

/// Directory holding one category's CSV and images
pub fn category_dir(data_dir: &Path, slug: &str) -> PathBuf {
    data_dir.join(slug)
}

/// Path of one category's CSV
pub fn category_csv_path(data_dir: &Path, slug: &str) -> PathBuf {
    category_dir(data_dir, slug).join(format!("scraped_books_{}.csv", slug))
}

/// Writes a category's records, replacing any previous file
///
/// The category directory is created if absent.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written CSV
/// * `Err(PersistenceError)` - Directory creation or write failed
pub fn write_category_records(
    data_dir: &Path,
    slug: &str,
    records: &[BookRecord],
) -> Result<PathBuf, PersistenceError> {
    let dir = category_dir(data_dir, slug);
    fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;

    let path = category_csv_path(data_dir, slug);
    write_csv_atomically(&path, |writer| {
        writer.write_record(BOOK_HEADERS)?;
        for record in records {
            writer.write_record([
                record.product_page_url.clone(),
                record.upc.clone(),
                record.title.clone(),
                record.price_including_tax.to_string(),
                record.price_excluding_tax.to_string(),
                record.number_available.to_string(),
                record.description.clone(),
                record.category.clone(),
                record.rating.to_string(),
                record.image_url.clone(),
            ])?;
        }
        Ok(())
    })?;

    tracing::debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(path)
}

/// Fills a CSV in a temporary file beside `path`, then renames it over `path`
///
/// If `fill` or the flush fails, the temporary file is removed and any
/// previous file at `path` is left as it was.
pub(crate) fn write_csv_atomically<F>(path: &Path, fill: F) -> Result<(), PersistenceError>
where
    F: FnOnce(&mut csv::Writer<&mut NamedTempFile>) -> csv::Result<()>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(|e| PersistenceError::io(dir, e))?;

    {
        let mut writer = csv::Writer::from_writer(&mut file);
        fill(&mut writer).map_err(|e| PersistenceError::csv(path, e))?;
        writer.flush().map_err(|e| PersistenceError::io(path, e))?;
    }

    file.persist(path).map_err(|e| PersistenceError::io(path, e.error))?;
    Ok(())
}

/// Reads a category CSV written by [`write_category_records`]
pub fn read_category_records(path: &Path) -> Result<Vec<BookRecord>, PersistenceError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| PersistenceError::csv(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| PersistenceError::csv(path, e))?
        .clone();
    let mut columns = [0usize; BOOK_HEADERS.len()];
    for (slot, name) in columns.iter_mut().zip(BOOK_HEADERS) {
        *slot = headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| PersistenceError::Malformed {
                path: path.to_path_buf(),
                line: 1,
                message: format!("missing column '{}'", name),
            })?;
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| PersistenceError::csv(path, e))?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let column = |index: usize| row.get(columns[index]).unwrap_or("").to_string();
        let malformed = |message: String| PersistenceError::Malformed {
            path: path.to_path_buf(),
            line,
            message,
        };

        let price_including_tax = parse_price(&column(3))
            .ok_or_else(|| malformed(format!("bad price_including_tax {:?}", column(3))))?;
        let price_excluding_tax = parse_price(&column(4))
            .ok_or_else(|| malformed(format!("bad price_excluding_tax {:?}", column(4))))?;
        let number_available = column(5)
            .parse()
            .map_err(|_| malformed(format!("bad number_available {:?}", column(5))))?;
        let rating = column(8)
            .parse::<u8>()
            .ok()
            .and_then(Rating::from_stars)
            .unwrap_or(Rating::UNRATED);

        records.push(BookRecord {
            product_page_url: column(0),
            upc: column(1),
            title: column(2),
            price_including_tax,
            price_excluding_tax,
            number_available,
            description: column(6),
            category: column(7),
            rating,
            image_url: column(9),
        });
    }

    Ok(records)
}

/// Reads every category CSV under `data_dir`
///
/// Looks one level deep: `{data_dir}/*/*.csv`. Directories and files are
/// visited in name order so the result is stable across runs.
pub fn load_records_from_dir(data_dir: &Path) -> Result<Vec<BookRecord>, PersistenceError> {
    let mut records = Vec::new();

    for dir in sorted_entries(data_dir)? {
        if !dir.is_dir() {
            continue;
        }
        for file in sorted_entries(&dir)? {
            if file.extension().is_some_and(|ext| ext == "csv") {
                let loaded = read_category_records(&file)?;
                tracing::debug!("Loaded {} records from {}", loaded.len(), file.display());
                records.extend(loaded);
            }
        }
    }

    Ok(records)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, PersistenceError> {
    let mut paths = fs::read_dir(dir)
        .map_err(|e| PersistenceError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PersistenceError::io(dir, e))?;
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn record(title: &str, price: &str, rating: &str) -> BookRecord {
        BookRecord {
            product_page_url: format!("http://example.com/{}", title),
            upc: format!("upc-{}", title),
            title: title.to_string(),
            price_including_tax: Decimal::from_str(price).unwrap(),
            price_excluding_tax: Decimal::from_str(price).unwrap(),
            number_available: 3,
            description: "Says \"hello\", then leaves".to_string(),
            category: "Travel".to_string(),
            rating: Rating::from_token(rating),
            image_url: "http://example.com/i.jpg".to_string(),
        }
    }

    #[test]
    fn test_csv_path_layout() {
        assert_eq!(
            category_csv_path(Path::new("data"), "travel_2"),
            PathBuf::from("data/travel_2/scraped_books_travel_2.csv")
        );
    }

    #[test]
    fn test_write_creates_directory_and_header() {
        let tmp = TempDir::new().unwrap();
        let path = write_category_records(tmp.path(), "travel_2", &[record("a", "10.00", "Three")])
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "product_page_url,universal_product_code (upc),title,price_including_tax,\
             price_excluding_tax,number_available,product_description,category,review_rating,image_url"
        );
        assert_eq!(
            lines.next().unwrap(),
            "http://example.com/a,upc-a,a,10.00,10.00,3,\"Says \"\"hello\"\", then leaves\",Travel,3,http://example.com/i.jpg"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_write_overwrites_previous_output() {
        let tmp = TempDir::new().unwrap();
        write_category_records(
            tmp.path(),
            "travel_2",
            &[record("a", "1.00", "One"), record("b", "2.00", "Two")],
        )
        .unwrap();
        let path = write_category_records(tmp.path(), "travel_2", &[record("c", "3.00", "Three")])
            .unwrap();

        let records = read_category_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "c");
    }

    #[test]
    fn test_failed_rewrite_keeps_previous_file() {
        let tmp = TempDir::new().unwrap();
        let path = write_category_records(tmp.path(), "travel_2", &[record("a", "1.00", "One")])
            .unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let result = write_csv_atomically(&path, |writer| {
            writer.write_record(BOOK_HEADERS)?;
            writer.write_record(["partial"; 10])?;
            writer.flush()?;
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
        });

        assert!(matches!(result, Err(PersistenceError::Csv { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_read_back_preserves_fields() {
        let tmp = TempDir::new().unwrap();
        let original = vec![record("a", "51.77", "Five"), record("b", "3.50", "Nope")];
        let path = write_category_records(tmp.path(), "travel_2", &original).unwrap();

        let loaded = read_category_records(&path).unwrap();
        assert_eq!(loaded, original);
        assert!(!loaded[1].rating.is_rated());
    }

    #[test]
    fn test_load_records_from_dir_reads_all_categories() {
        let tmp = TempDir::new().unwrap();
        write_category_records(tmp.path(), "travel_2", &[record("a", "1.00", "One")]).unwrap();
        write_category_records(
            tmp.path(),
            "mystery_3",
            &[record("b", "2.00", "Two"), record("c", "3.00", "Three")],
        )
        .unwrap();
        fs::write(tmp.path().join("stray.txt"), "ignored").unwrap();

        let records = load_records_from_dir(tmp.path()).unwrap();
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.csv");
        fs::write(&path, "title,category\nx,Travel\n").unwrap();

        let err = read_category_records(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed { .. }));
    }
}
