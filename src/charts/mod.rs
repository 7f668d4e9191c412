//! Charts module - aggregation, rendering and keyword dispatch

mod backend;
mod error;
pub(crate) mod map;
mod renderer;
mod selector;
mod series;

pub use backend::FontSafeBackend;
pub use error::ChartError;
pub use map::{bin_index, render_choropleth, BoundaryOverlay, MAP_ELEMENT_ID};
pub use renderer::{ChartRenderer, EncodedOutput};
pub use selector::ChartSelector;
pub use series::{
    aggregate, BarPalette, BarSeries, CanvasSize, ChartOption, ChartRequest, ChoroplethSeries,
    ComparisonSeries, Continent, DonutSeries, HistogramSeries, NamedSeries, Party, PartySpan,
    SeriesData, TimelineSeries, MAP_BINS, PARTY_SPANS, WIDE_BAR_TICK_STEP,
};
