//! Output module for crawl results
//!
//! This module handles:
//! - Writing per-category CSV files and reading them back
//! - Folding records into the per-category aggregate
//! - Rendering the aggregate as charts
//! - Saving cover images
//! - Recording run statistics and failures

pub mod aggregate;
pub mod charts;
pub mod csv_output;
pub mod images;
pub mod stats;

pub use aggregate::{aggregate, read_aggregate, write_aggregate, Aggregate};
pub use charts::{render_charts, ChartRenderer, SvgChartRenderer};
pub use csv_output::{
    category_csv_path, load_records_from_dir, read_category_records, write_category_records,
};
pub use images::{save_image, ImageTarget};
pub use stats::{print_report, CategoryOutcome, CategoryStatus, CrawlReport, Failure, Stage};
