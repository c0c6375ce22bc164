//! Output module for reporting on stored crawl results

pub mod stats;

pub use stats::{load_statistics, print_statistics, StoreStatistics};
