//! Chart Series Module
//! Pure aggregation from the migration table to render-ready series.

use super::error::ChartError;
use crate::data::{MigrationTable, CONTINENT, REGION};
use crate::stats::{Histogram, StatsCalculator, HISTOGRAM_BINS};
use std::fmt;
use std::str::FromStr;

/// Tick spacing of the region and top-ten bar charts.
pub const WIDE_BAR_TICK_STEP: f64 = 250_000.0;
/// Choropleth bin edges, in millions of migrants.
pub const MAP_BINS: [f64; 6] = [0.0, 0.15, 0.3, 0.5, 1.0, 2.5];

const TOP_TEN: usize = 10;
const TOP_FIVE: usize = 5;

/// Continents with a top-five breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continent {
    Asia,
    Europe,
    Africa,
    America,
}

impl Continent {
    pub const ALL: [Continent; 4] = [
        Continent::Asia,
        Continent::Europe,
        Continent::Africa,
        Continent::America,
    ];

    /// Name as it appears in the table's continent column.
    pub fn name(self) -> &'static str {
        match self {
            Continent::Asia => "Asia",
            Continent::Europe => "Europe",
            Continent::Africa => "Africa",
            Continent::America => "America",
        }
    }
}

/// Every chart the selector knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartOption {
    Timeline,
    Continent,
    Region,
    TopTen,
    ContinentTopFive(Continent),
    Map,
    Comparison,
    Histogram,
}

impl ChartOption {
    pub fn keyword(self) -> &'static str {
        match self {
            ChartOption::Timeline => "timeline",
            ChartOption::Continent => "continent",
            ChartOption::Region => "region",
            ChartOption::TopTen => "topten",
            ChartOption::ContinentTopFive(c) => c.name(),
            ChartOption::Map => "map",
            ChartOption::Comparison => "country",
            ChartOption::Histogram => "histogram",
        }
    }
}

impl FromStr for ChartOption {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let option = match s {
            "timeline" => ChartOption::Timeline,
            "continent" => ChartOption::Continent,
            "region" => ChartOption::Region,
            "topten" => ChartOption::TopTen,
            "map" => ChartOption::Map,
            "country" => ChartOption::Comparison,
            "histogram" => ChartOption::Histogram,
            other => Continent::ALL
                .into_iter()
                .find(|c| c.name() == other)
                .map(ChartOption::ContinentTopFive)
                .ok_or_else(|| ChartError::UnknownOption(other.to_string()))?,
        };
        Ok(option)
    }
}

impl fmt::Display for ChartOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One chart request: the option plus up to two countries to compare.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub option: ChartOption,
    pub country1: Option<String>,
    pub country2: Option<String>,
}

impl ChartRequest {
    pub fn new(option: ChartOption) -> Self {
        Self {
            option,
            country1: None,
            country2: None,
        }
    }

    /// Blank names count as absent.
    pub fn with_countries(mut self, country1: Option<&str>, country2: Option<&str>) -> Self {
        let clean = |c: Option<&str>| c.map(str::trim).filter(|c| !c.is_empty()).map(String::from);
        self.country1 = clean(country1);
        self.country2 = clean(country2);
        self
    }
}

/// Governing party of a shaded timeline span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Labor,
    Liberal,
}

impl Party {
    pub fn legend(self) -> &'static str {
        match self {
            Party::Labor => "Labor in Power",
            Party::Liberal => "Liberal in Power",
        }
    }
}

/// Span of periods, by index, during which one party governed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartySpan {
    pub start: f64,
    pub length: f64,
    pub party: Party,
}

/// Federal governments from 1945 on, in period-index units.
pub const PARTY_SPANS: [PartySpan; 8] = [
    PartySpan { start: 0.0, length: 2.0, party: Party::Labor },
    PartySpan { start: 2.0, length: 24.0, party: Party::Liberal },
    PartySpan { start: 26.0, length: 3.0, party: Party::Labor },
    PartySpan { start: 29.0, length: 8.0, party: Party::Liberal },
    PartySpan { start: 37.0, length: 13.0, party: Party::Labor },
    PartySpan { start: 50.0, length: 11.0, party: Party::Liberal },
    PartySpan { start: 61.0, length: 6.0, party: Party::Labor },
    PartySpan { start: 67.0, length: 5.0, party: Party::Liberal },
];

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSeries {
    pub title: String,
    pub periods: Vec<String>,
    pub totals: Vec<f64>,
    pub spans: Vec<PartySpan>,
    pub grand_total: f64,
}

impl TimelineSeries {
    pub fn annotation(&self) -> String {
        format!(
            "Total Number of Migrants: {}",
            StatsCalculator::format_thousands(self.grand_total)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DonutSeries {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// `"Europe: 1,234"` entries, one per slice.
    pub legend: Vec<String>,
}

/// Which bar palette a bar chart uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarPalette {
    /// First two bars highlighted.
    Ranked,
    /// Only the leading bar highlighted.
    Leader,
}

/// Canvas size class of a raster chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasSize {
    Wide,
    Short,
    Histogram,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    /// Largest first.
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// Share of the grand total, not of the charted subset.
    pub percents: Vec<f64>,
    pub tick_step: f64,
    pub palette: BarPalette,
    pub size: CanvasSize,
}

impl BarSeries {
    pub fn annotations(&self) -> Vec<String> {
        self.percents
            .iter()
            .map(|p| StatsCalculator::format_percent(*p))
            .collect()
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    pub values: Vec<f64>,
    pub total: f64,
}

impl NamedSeries {
    /// `"Italy : 1,234"` legend entry.
    pub fn legend(&self) -> String {
        format!("{} : {}", self.name, StatsCalculator::format_thousands(self.total))
    }

    pub fn axis_label(&self) -> String {
        format!("Number of Migrants - {}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonSeries {
    pub title: String,
    pub periods: Vec<String>,
    /// Drawn against the left axis.
    pub primary: NamedSeries,
    /// Drawn against an independent right axis.
    pub secondary: Option<NamedSeries>,
}

impl ComparisonSeries {
    pub fn series_count(&self) -> usize {
        1 + usize::from(self.secondary.is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    pub title: String,
    pub histogram: Histogram,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoroplethSeries {
    pub legend_name: String,
    /// `(country, migrants in millions)`.
    pub values: Vec<(String, f64)>,
    pub bins: Vec<f64>,
}

/// Aggregated data for one chart, independent of how it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesData {
    Timeline(TimelineSeries),
    Donut(DonutSeries),
    Bars(BarSeries),
    Comparison(ComparisonSeries),
    Histogram(HistogramSeries),
    Choropleth(ChoroplethSeries),
}

/// Run the aggregation behind `request`.
pub fn aggregate(table: &MigrationTable, request: &ChartRequest) -> Result<SeriesData, ChartError> {
    let series = match request.option {
        ChartOption::Timeline => SeriesData::Timeline(TimelineSeries {
            title: "Australia Historical Migration [From 1945 to 2018]".to_string(),
            periods: table.periods().to_vec(),
            totals: table.period_totals()?,
            spans: PARTY_SPANS.to_vec(),
            grand_total: table.grand_total()?,
        }),
        ChartOption::Continent => {
            let totals = table.totals_by(CONTINENT)?;
            SeriesData::Donut(DonutSeries {
                title: "Migration per Continent, Australia [1945 - 2018]".to_string(),
                legend: totals
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, StatsCalculator::format_thousands(*v)))
                    .collect(),
                labels: totals.iter().map(|(k, _)| k.clone()).collect(),
                values: totals.into_iter().map(|(_, v)| v).collect(),
            })
        }
        ChartOption::Region => {
            let mut totals = table.totals_by(REGION)?;
            totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            SeriesData::Bars(bar_series(
                table,
                totals,
                "Migrants per World Region; Australia [1945 - 2018]".to_string(),
                "World Region",
                WIDE_BAR_TICK_STEP,
                BarPalette::Ranked,
                CanvasSize::Wide,
            )?)
        }
        ChartOption::TopTen => SeriesData::Bars(bar_series(
            table,
            table.top_countries(TOP_TEN, None)?,
            "Top 10 Countries; Migration to Australia [1945 - 2018]".to_string(),
            "Top 10 Countries",
            WIDE_BAR_TICK_STEP,
            BarPalette::Ranked,
            CanvasSize::Wide,
        )?),
        ChartOption::ContinentTopFive(continent) => {
            let top = table.top_countries(TOP_FIVE, Some(continent.name()))?;
            if top.is_empty() {
                return Err(ChartError::EmptySelection(format!(
                    "no countries in {}",
                    continent.name()
                )));
            }
            let max = top.iter().map(|(_, v)| *v).fold(0.0, f64::max);
            SeriesData::Bars(bar_series(
                table,
                top,
                format!(
                    "Top Five Countries in {}; Migration to Australia [1945 - 2018]",
                    continent.name()
                ),
                "Top Five Countries",
                StatsCalculator::tick_step(max),
                BarPalette::Leader,
                CanvasSize::Short,
            )?)
        }
        ChartOption::Map => SeriesData::Choropleth(ChoroplethSeries {
            legend_name: "Migration to Australia from 1945 to 2018 (million)".to_string(),
            values: table
                .country_totals()?
                .into_iter()
                .map(|(country, total)| (country, total / 1_000_000.0))
                .collect(),
            bins: MAP_BINS.to_vec(),
        }),
        ChartOption::Comparison => SeriesData::Comparison(comparison_series(table, request)?),
        ChartOption::Histogram => SeriesData::Histogram(HistogramSeries {
            title: "Histogram for All Migrants Each Year".to_string(),
            histogram: StatsCalculator::histogram(&table.period_totals()?, HISTOGRAM_BINS),
        }),
    };

    Ok(series)
}

fn bar_series(
    table: &MigrationTable,
    rows: Vec<(String, f64)>,
    title: String,
    y_desc: &str,
    tick_step: f64,
    palette: BarPalette,
    size: CanvasSize,
) -> Result<BarSeries, ChartError> {
    let grand_total = table.grand_total()?;
    let (labels, values): (Vec<String>, Vec<f64>) = rows.into_iter().unzip();
    let percents = values
        .iter()
        .map(|v| StatsCalculator::percent_of(*v, grand_total))
        .collect();

    Ok(BarSeries {
        title,
        x_desc: "Number of Migrants".to_string(),
        y_desc: y_desc.to_string(),
        labels,
        values,
        percents,
        tick_step,
        palette,
        size,
    })
}

/// Whichever single country was given goes on the primary axis, so its
/// axis label always names the country actually drawn there.
fn comparison_series(
    table: &MigrationTable,
    request: &ChartRequest,
) -> Result<ComparisonSeries, ChartError> {
    let lookup = |name: &str| -> Result<NamedSeries, ChartError> {
        let series = table
            .country_series(name)?
            .ok_or_else(|| ChartError::UnknownCountry(name.to_string()))?;
        Ok(NamedSeries {
            name: series.country,
            values: series.values,
            total: series.total,
        })
    };

    let (primary, secondary) = match (&request.country1, &request.country2) {
        (Some(first), Some(second)) => (lookup(first)?, Some(lookup(second)?)),
        (Some(only), None) | (None, Some(only)) => (lookup(only)?, None),
        (None, None) => {
            return Err(ChartError::EmptySelection(
                "no country given for comparison".to_string(),
            ))
        }
    };

    let heading = match &secondary {
        Some(second) => format!("{} Compared to {}", primary.name, second.name),
        None => primary.name.clone(),
    };

    Ok(ComparisonSeries {
        title: format!("{} - Historical Migration to Australia [1945 - 2018]", heading),
        periods: table.periods().to_vec(),
        primary,
        secondary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{synthetic_table, CountryRecord};

    fn request(option: &str) -> ChartRequest {
        ChartRequest::new(option.parse().unwrap())
    }

    #[test]
    fn parses_every_keyword() {
        for keyword in [
            "timeline", "continent", "region", "topten", "Asia", "Europe", "Africa", "America",
            "map", "country", "histogram",
        ] {
            let option: ChartOption = keyword.parse().unwrap();
            assert_eq!(option.keyword(), keyword);
        }
    }

    #[test]
    fn unknown_keyword_is_rejected() {
        for keyword in ["", "Timeline", "oceania", "top10", "pie"] {
            let err = keyword.parse::<ChartOption>().unwrap_err();
            assert!(matches!(err, ChartError::UnknownOption(ref k) if k == keyword));
            assert!(err.is_client_error());
        }
    }

    #[test]
    fn continent_scenario_legend() {
        let table = MigrationTable::from_records(
            vec!["1945".to_string(), "1946".to_string()],
            vec![
                CountryRecord {
                    country: "A".to_string(),
                    continent: "X".to_string(),
                    region: "R1".to_string(),
                    values: vec![Some(60.0), Some(40.0)],
                },
                CountryRecord {
                    country: "B".to_string(),
                    continent: "Y".to_string(),
                    region: "R2".to_string(),
                    values: vec![Some(50.0), None],
                },
            ],
        )
        .unwrap();

        let SeriesData::Donut(donut) = aggregate(&table, &request("continent")).unwrap() else {
            panic!("continent should aggregate to a donut");
        };
        assert_eq!(donut.labels, vec!["X", "Y"]);
        assert_eq!(donut.values, vec![100.0, 50.0]);
        assert_eq!(donut.legend, vec!["X: 100", "Y: 50"]);
    }

    #[test]
    fn region_bars_descend() {
        let table = synthetic_table();
        let SeriesData::Bars(bars) = aggregate(&table, &request("region")).unwrap() else {
            panic!("region should aggregate to bars");
        };
        assert_eq!(bars.labels[0], "North-West Europe");
        assert!(bars.values.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(bars.tick_step, WIDE_BAR_TICK_STEP);
        assert_eq!(bars.palette, BarPalette::Ranked);
    }

    #[test]
    fn percents_use_grand_total_not_subset() {
        let table = synthetic_table();
        let grand = table.grand_total().unwrap();

        let SeriesData::Bars(bars) = aggregate(&table, &request("Asia")).unwrap() else {
            panic!("continent name should aggregate to bars");
        };
        let subset: f64 = bars.values.iter().sum();
        assert!(subset < grand);

        let share: f64 = bars.percents.iter().sum();
        assert!((share - subset / grand * 100.0).abs() < 1e-9);
        assert!(share <= 100.0);
        assert_eq!(bars.annotations()[0], StatsCalculator::format_percent(450.0 / grand * 100.0));

        for option in ["region", "topten"] {
            let SeriesData::Bars(bars) = aggregate(&table, &request(option)).unwrap() else {
                panic!("{} should aggregate to bars", option);
            };
            assert!(bars.percents.iter().sum::<f64>() <= 100.0 + 1e-9);
        }
    }

    #[test]
    fn continent_top_five_uses_computed_tick_step() {
        let table = synthetic_table();
        let SeriesData::Bars(bars) = aggregate(&table, &request("Europe")).unwrap() else {
            panic!("continent name should aggregate to bars");
        };
        assert_eq!(bars.labels.len(), 5);
        assert_eq!(bars.labels[0], "England");
        assert_eq!(bars.tick_step, 100.0);
        assert_eq!(bars.palette, BarPalette::Leader);
        assert_eq!(bars.size, CanvasSize::Short);
    }

    #[test]
    fn continent_tick_step_follows_leading_digit() {
        let table = synthetic_table();
        let SeriesData::Bars(bars) = aggregate(&table, &request("Asia")).unwrap() else {
            panic!("continent name should aggregate to bars");
        };
        assert_eq!(bars.max_value(), 450.0);
        assert_eq!(bars.tick_step, 40.0);
    }

    #[test]
    fn empty_continent_is_a_render_error() {
        let table = synthetic_table();
        let err = aggregate(&table, &request("America")).unwrap_err();
        assert!(matches!(err, ChartError::EmptySelection(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn timeline_carries_party_spans_and_total() {
        let table = synthetic_table();
        let SeriesData::Timeline(timeline) = aggregate(&table, &request("timeline")).unwrap() else {
            panic!("timeline should aggregate to a line");
        };
        assert_eq!(timeline.totals.len(), 3);
        assert_eq!(timeline.spans.len(), 8);
        assert_eq!(timeline.spans[0].party, Party::Labor);
        assert_eq!(timeline.spans[1].party, Party::Liberal);
        assert_eq!(timeline.annotation(), "Total Number of Migrants: 3,586");
    }

    #[test]
    fn map_values_are_in_millions() {
        let table = synthetic_table();
        let SeriesData::Choropleth(map) = aggregate(&table, &request("map")).unwrap() else {
            panic!("map should aggregate to a choropleth");
        };
        let england = map.values.iter().find(|(c, _)| c == "England").unwrap();
        assert!((england.1 - 0.0012).abs() < 1e-12);
        assert_eq!(map.bins, MAP_BINS.to_vec());
    }

    #[test]
    fn comparison_with_both_countries() {
        let table = synthetic_table();
        let req = request("country").with_countries(Some("Italy"), Some("China"));
        let SeriesData::Comparison(cmp) = aggregate(&table, &req).unwrap() else {
            panic!("country should aggregate to a comparison");
        };
        assert_eq!(cmp.series_count(), 2);
        assert_eq!(cmp.primary.axis_label(), "Number of Migrants - Italy");
        assert_eq!(cmp.secondary.as_ref().unwrap().legend(), "China : 450");
        assert!(cmp.title.starts_with("Italy Compared to China"));
    }

    #[test]
    fn comparison_with_only_second_country() {
        let table = synthetic_table();
        let req = request("country").with_countries(None, Some("Greece"));
        let SeriesData::Comparison(cmp) = aggregate(&table, &req).unwrap() else {
            panic!("country should aggregate to a comparison");
        };
        assert_eq!(cmp.series_count(), 1);
        assert_eq!(cmp.primary.name, "Greece");
        assert_eq!(cmp.primary.axis_label(), "Number of Migrants - Greece");
        assert!(cmp.title.starts_with("Greece - "));
    }

    #[test]
    fn comparison_errors() {
        let table = synthetic_table();

        let none = request("country").with_countries(Some("  "), None);
        assert!(matches!(
            aggregate(&table, &none),
            Err(ChartError::EmptySelection(_))
        ));

        let missing = request("country").with_countries(Some("Atlantis"), None);
        assert!(matches!(
            aggregate(&table, &missing),
            Err(ChartError::UnknownCountry(name)) if name == "Atlantis"
        ));
    }

    #[test]
    fn histogram_counts_each_period() {
        let table = synthetic_table();
        let SeriesData::Histogram(hist) = aggregate(&table, &request("histogram")).unwrap() else {
            panic!("histogram should aggregate to a histogram");
        };
        assert_eq!(hist.histogram.counts.len(), HISTOGRAM_BINS);
        assert_eq!(hist.histogram.total(), table.periods().len());
    }
}
