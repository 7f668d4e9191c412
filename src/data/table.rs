//! Migration Table Module
//! The canonical, read-only table every chart is computed from.

use super::loader::LoadError;
use super::processor::CountryRecord;
use polars::prelude::*;

pub const COUNTRY: &str = "country";
pub const CONTINENT: &str = "continent";
pub const REGION: &str = "region";
pub const SUM: &str = "sum";

/// Per-period counts for one country.
#[derive(Debug, Clone, PartialEq)]
pub struct CountrySeries {
    pub country: String,
    /// One value per period; empty cells read as zero.
    pub values: Vec<f64>,
    pub total: f64,
}

/// Countries as rows, keyed by name, with continent, region, one numeric
/// column per period and the row total in `sum`.
#[derive(Debug, Clone)]
pub struct MigrationTable {
    df: DataFrame,
    periods: Vec<String>,
}

impl MigrationTable {
    /// Assemble the table from reshaped records.
    pub fn from_records(
        periods: Vec<String>,
        records: Vec<CountryRecord>,
    ) -> Result<Self, LoadError> {
        let mut countries = Vec::with_capacity(records.len());
        let mut continents = Vec::with_capacity(records.len());
        let mut regions = Vec::with_capacity(records.len());
        let mut sums = Vec::with_capacity(records.len());
        let mut period_values: Vec<Vec<Option<f64>>> =
            vec![Vec::with_capacity(records.len()); periods.len()];

        for record in records {
            if record.values.len() != periods.len() {
                return Err(LoadError::SchemaMismatch(format!(
                    "{} has {} values for {} periods",
                    record.country,
                    record.values.len(),
                    periods.len()
                )));
            }
            sums.push(record.total());
            for (column, value) in period_values.iter_mut().zip(record.values) {
                column.push(value);
            }
            countries.push(record.country);
            continents.push(record.continent);
            regions.push(record.region);
        }

        let mut columns = vec![
            Column::new(COUNTRY.into(), countries),
            Column::new(CONTINENT.into(), continents),
            Column::new(REGION.into(), regions),
        ];
        for (period, values) in periods.iter().zip(period_values) {
            columns.push(Column::new(period.as_str().into(), values));
        }
        columns.push(Column::new(SUM.into(), sums));

        let df = DataFrame::new(columns)?;
        Ok(Self { df, periods })
    }

    /// Period column names in sheet order.
    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn countries(&self) -> PolarsResult<Vec<String>> {
        Ok(self
            .df
            .column(COUNTRY)?
            .str()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect())
    }

    /// Total migrants over every country and period.
    pub fn grand_total(&self) -> PolarsResult<f64> {
        Ok(self.df.column(SUM)?.f64()?.sum().unwrap_or(0.0))
    }

    /// Sum of `sum` grouped by `key` (continent or region), ordered by key.
    pub fn totals_by(&self, key: &str) -> PolarsResult<Vec<(String, f64)>> {
        let grouped = self
            .df
            .clone()
            .lazy()
            .group_by([col(key)])
            .agg([col(SUM).sum()])
            .sort([key], SortMultipleOptions::default())
            .collect()?;

        Self::label_value_pairs(&grouped, key)
    }

    /// The `n` largest countries by `sum`, optionally within one continent.
    pub fn top_countries(&self, n: usize, continent: Option<&str>) -> PolarsResult<Vec<(String, f64)>> {
        let mut frame = self.df.clone().lazy();
        if let Some(continent) = continent {
            frame = frame.filter(col(CONTINENT).eq(lit(continent)));
        }

        let top = frame
            .sort(
                [SUM],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .limit(n as IdxSize)
            .select([col(COUNTRY), col(SUM)])
            .collect()?;

        Self::label_value_pairs(&top, COUNTRY)
    }

    /// Column totals, one per period.
    pub fn period_totals(&self) -> PolarsResult<Vec<f64>> {
        self.periods
            .iter()
            .map(|period| Ok(self.df.column(period)?.f64()?.sum().unwrap_or(0.0)))
            .collect()
    }

    /// `(country, sum)` for every row, in table order.
    pub fn country_totals(&self) -> PolarsResult<Vec<(String, f64)>> {
        Self::label_value_pairs(&self.df, COUNTRY)
    }

    /// Raw per-period series for `country`, `None` if the table lacks it.
    pub fn country_series(&self, country: &str) -> PolarsResult<Option<CountrySeries>> {
        let row = self
            .df
            .clone()
            .lazy()
            .filter(col(COUNTRY).eq(lit(country)))
            .collect()?;

        if row.height() == 0 {
            return Ok(None);
        }

        let values = self
            .periods
            .iter()
            .map(|period| Ok(row.column(period)?.f64()?.get(0).unwrap_or(0.0)))
            .collect::<PolarsResult<Vec<f64>>>()?;
        let total = row.column(SUM)?.f64()?.get(0).unwrap_or(0.0);

        Ok(Some(CountrySeries {
            country: country.to_string(),
            values,
            total,
        }))
    }

    fn label_value_pairs(df: &DataFrame, label: &str) -> PolarsResult<Vec<(String, f64)>> {
        let labels = df.column(label)?.str()?;
        let values = df.column(SUM)?.f64()?;

        Ok(labels
            .into_iter()
            .zip(values.into_iter())
            .filter_map(|(l, v)| Some((l?.to_string(), v.unwrap_or(0.0))))
            .collect())
    }
}
