//! Normalizes the monthly "Kicken" spreadsheet exports into one goal table
//! and one outcome table, and derives the views a dashboard charts from them.

#[macro_use]
pub mod verbose;

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod loader;
pub mod model;
pub mod months;
pub mod outcomes;

pub use config::Config;
pub use dataset::Dataset;
pub use error::{PipelineError, Result};
pub use model::{Table, Value};
pub use outcomes::Winner;
