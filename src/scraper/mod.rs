//! Browser-free helpers: plain HTTP, static HTML parsing and text cleanup.

pub mod cleaner;
pub mod http_client;
pub mod parsers;

pub use self::http_client::{FetchError, HttpClient};
