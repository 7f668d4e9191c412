//! Stats module - tick steps, binning and annotation formats

mod calculator;

pub use calculator::{Histogram, StatsCalculator, HISTOGRAM_BINS};
