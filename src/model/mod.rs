//! Data model shared by the crawl pipeline
//!
//! # Components
//!
//! - `CategoryRef` / `CrawlJob`: one category discovered on the catalog root and its pending listing pages
//! - `BookRef` / `BookRecord`: a book detail link and the fields extracted from it
//! - `Rating`: the 1-5 star rating, with an explicit unrated marker
//! - `CategoryStats`: per-category count and average price

mod book;
mod category;
mod rating;

pub use book::{parse_availability, parse_price, BookRecord, BookRef};
pub use category::{CategoryRef, CategoryStats, CrawlJob};
pub use rating::Rating;
