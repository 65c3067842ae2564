//! HTML summaries of hyperparameter search runs.

pub mod report;

pub use report::{render_search_report, write_search_report};
