use plotters::drawing::DrawingAreaErrorKind;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Unknown chart option '{0}'")]
    UnknownOption(String),
    #[error("Country '{0}' is not in the migration table")]
    UnknownCountry(String),
    #[error("Nothing to chart: {0}")]
    EmptySelection(String),
    #[error("Map requested but no boundary overlay was loaded")]
    MissingOverlay,
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

impl ChartError {
    /// Client errors are the caller's fault; everything else is ours.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ChartError::UnknownOption(_))
    }
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ChartError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ChartError::Drawing(err.to_string())
    }
}
