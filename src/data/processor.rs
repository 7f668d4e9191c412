//! Data Processor Module
//! Reshapes the raw sheet (attributes as rows, countries as columns) into
//! one record per country.

use super::loader::LoadError;
use calamine::Data;
use std::collections::HashSet;
use tracing::warn;

/// Partial-year fragment that upstream reported separately.
pub const SPLIT_PERIOD_FRAGMENT: &str = "Jan-Jun 1959";
/// Period the fragment is folded into.
pub const SPLIT_PERIOD_TARGET: &str = "1959–60";

/// Placeholder for a missing continent or region cell.
pub const UNKNOWN_ATTRIBUTE: &str = "Unknown";

/// Names that period labels may not take because the table uses them.
const RESERVED_COLUMNS: [&str; 4] = ["country", "continent", "region", "sum"];

/// One country after transposition and numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryRecord {
    pub country: String,
    pub continent: String,
    pub region: String,
    /// One entry per period, `None` for an empty cell.
    pub values: Vec<Option<f64>>,
}

impl CountryRecord {
    /// Row total; empty cells count as zero.
    pub fn total(&self) -> f64 {
        self.values.iter().flatten().sum()
    }
}

/// Reshaped sheet, ready to become a `MigrationTable`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReshapedSheet {
    pub periods: Vec<String>,
    pub records: Vec<CountryRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Continent,
    Region,
    Country,
    Period,
}

impl RowKind {
    fn classify(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "continent" => RowKind::Continent,
            "region" => RowKind::Region,
            "year" | "country" => RowKind::Country,
            _ => RowKind::Period,
        }
    }
}

/// Handles the transpose / rename / merge / coerce steps.
pub struct DataProcessor;

impl DataProcessor {
    /// Turn the raw grid into country records.
    ///
    /// The first column of every row is the attribute label. Rows labelled
    /// `Continent`, `Region` and `Year` carry the categorical attributes and
    /// the country names; every other labelled row is a year period.
    pub fn reshape(rows: &[Vec<Data>]) -> Result<ReshapedSheet, LoadError> {
        let mut continent_row: Option<&[Data]> = None;
        let mut region_row: Option<&[Data]> = None;
        let mut country_row: Option<&[Data]> = None;
        let mut period_rows: Vec<(String, &[Data])> = Vec::new();

        for row in rows {
            let Some(first) = row.first() else {
                continue;
            };
            let label = Self::cell_label(first);
            if label.is_empty() {
                continue;
            }

            let cells = &row[1..];
            match RowKind::classify(&label) {
                RowKind::Continent => continent_row = Some(cells),
                RowKind::Region => region_row = Some(cells),
                RowKind::Country => country_row = Some(cells),
                RowKind::Period => {
                    if RESERVED_COLUMNS.contains(&label.as_str()) {
                        return Err(LoadError::SchemaMismatch(format!(
                            "period label '{}' collides with a table column",
                            label
                        )));
                    }
                    if period_rows.iter().any(|(p, _)| p == &label) {
                        return Err(LoadError::SchemaMismatch(format!(
                            "period '{}' appears more than once",
                            label
                        )));
                    }
                    period_rows.push((label, cells));
                }
            }
        }

        let country_row = country_row.ok_or(LoadError::MissingAttribute("Year"))?;
        let continent_row = continent_row.ok_or(LoadError::MissingAttribute("Continent"))?;
        let region_row = region_row.ok_or(LoadError::MissingAttribute("Region"))?;

        if period_rows.is_empty() {
            return Err(LoadError::SchemaMismatch(
                "sheet has no year-period rows".to_string(),
            ));
        }

        let mut periods: Vec<String> = period_rows.iter().map(|(p, _)| p.clone()).collect();
        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for (col, cell) in country_row.iter().enumerate() {
            let country = Self::cell_label(cell);
            if country.is_empty() {
                continue;
            }
            if !seen.insert(country.clone()) {
                return Err(LoadError::DuplicateCountry(country));
            }

            let continent = Self::attribute(continent_row, col, &country, "continent");
            let region = Self::attribute(region_row, col, &country, "region");

            let values = period_rows
                .iter()
                .map(|(period, cells)| Self::coerce(cells.get(col), &country, period))
                .collect::<Result<Vec<_>, _>>()?;

            records.push(CountryRecord {
                country,
                continent,
                region,
                values,
            });
        }

        Self::merge_split_period(&mut periods, &mut records);

        Ok(ReshapedSheet { periods, records })
    }

    /// Fold the `Jan-Jun 1959` fragment into `1959–60` and drop it.
    ///
    /// Missing cells count as zero in the merged value; when only the
    /// fragment is present it simply takes the target name.
    pub fn merge_split_period(periods: &mut Vec<String>, records: &mut [CountryRecord]) {
        let Some(fragment) = periods.iter().position(|p| p == SPLIT_PERIOD_FRAGMENT) else {
            return;
        };

        let Some(target) = periods.iter().position(|p| p == SPLIT_PERIOD_TARGET) else {
            periods[fragment] = SPLIT_PERIOD_TARGET.to_string();
            return;
        };

        for record in records.iter_mut() {
            let merged = record.values[fragment].unwrap_or(0.0)
                + record.values[target].unwrap_or(0.0);
            record.values[target] = Some(merged);
            record.values.remove(fragment);
        }
        periods.remove(fragment);
    }

    /// Numeric coercion of one migration count.
    fn coerce(cell: Option<&Data>, country: &str, period: &str) -> Result<Option<f64>, LoadError> {
        let non_numeric = |value: String| LoadError::NonNumeric {
            country: country.to_string(),
            period: period.to_string(),
            value,
        };

        match cell {
            None | Some(Data::Empty) => Ok(None),
            Some(Data::Int(v)) => Ok(Some(*v as f64)),
            Some(Data::Float(v)) if v.is_finite() => Ok(Some(*v)),
            Some(Data::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                match trimmed.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(Some(v)),
                    _ => Err(non_numeric(s.clone())),
                }
            }
            Some(other) => Err(non_numeric(other.to_string())),
        }
    }

    fn attribute(cells: &[Data], col: usize, country: &str, what: &str) -> String {
        let value = cells.get(col).map(Self::cell_label).unwrap_or_default();
        if value.is_empty() {
            warn!("{} has no {}, using '{}'", country, what, UNKNOWN_ATTRIBUTE);
            UNKNOWN_ATTRIBUTE.to_string()
        } else {
            value
        }
    }

    /// Text of a label cell; whole floats print without a fraction.
    pub fn cell_label(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.trim().to_string(),
            Data::Int(v) => v.to_string(),
            Data::Float(v) if v.fract() == 0.0 && v.is_finite() => format!("{}", *v as i64),
            other => other.to_string().trim().to_string(),
        }
    }
}
