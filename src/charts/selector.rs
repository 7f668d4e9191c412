//! Chart Selector Module
//! Maps a chart keyword onto an aggregation plus a renderer.

use super::error::ChartError;
use super::map::BoundaryOverlay;
use super::renderer::{ChartRenderer, EncodedOutput};
use super::series::{aggregate, ChartOption, ChartRequest};
use crate::config::ChartConfig;
use crate::data::MigrationTable;
use tracing::debug;

/// Entry point for producing one chart from a loaded table.
#[derive(Debug, Clone)]
pub struct ChartSelector {
    renderer: ChartRenderer,
}

impl ChartSelector {
    pub fn new(config: ChartConfig, overlay: Option<BoundaryOverlay>) -> Self {
        Self {
            renderer: ChartRenderer::new(config, overlay),
        }
    }

    pub fn renderer(&self) -> &ChartRenderer {
        &self.renderer
    }

    /// Render the chart named by `option`.
    ///
    /// `country1` and `country2` only matter for `country`; blank names are
    /// treated as absent.
    pub fn render(
        &self,
        option: &str,
        table: &MigrationTable,
        country1: Option<&str>,
        country2: Option<&str>,
    ) -> Result<EncodedOutput, ChartError> {
        let option: ChartOption = option.parse()?;
        let request = ChartRequest::new(option).with_countries(country1, country2);
        self.render_request(table, &request)
    }

    pub fn render_request(
        &self,
        table: &MigrationTable,
        request: &ChartRequest,
    ) -> Result<EncodedOutput, ChartError> {
        debug!(option = %request.option, "Rendering chart");
        let series = aggregate(table, request)?;
        let output = self.renderer.render_series(&series)?;
        debug!(option = %request.option, bytes = output.as_str().len(), "Chart ready");
        Ok(output)
    }
}
