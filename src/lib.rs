//! Migration Charts - Australian migration statistics loader and chart renderer
//!
//! Loads the historical immigration workbook into a country-by-period table
//! and renders one of eleven summary charts as an embeddable PNG data URI or
//! an interactive map fragment.

pub mod charts;
pub mod config;
pub mod data;
pub mod error;
pub mod stats;

pub use charts::{BoundaryOverlay, ChartError, ChartSelector, EncodedOutput};
pub use config::{ChartConfig, ConfigError};
pub use data::{DataLoader, LoadError, MigrationTable};
pub use error::ErrorReport;
