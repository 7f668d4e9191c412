//! Data module - workbook loading and reshaping

mod loader;
pub(crate) mod processor;
mod table;

pub use loader::{DataLoader, LoadError, DEFAULT_SHEET};
pub use processor::{CountryRecord, DataProcessor, ReshapedSheet};
pub use table::{CountrySeries, MigrationTable, CONTINENT, COUNTRY, REGION, SUM};

#[cfg(test)]
pub(crate) use table::tests::synthetic_table;
