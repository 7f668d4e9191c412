//! Static Chart Renderer
//! Draws aggregated series with plotters and encodes them for embedding.
//!
//! Raster charts share one protocol:
//! 1. Allocate an RGB buffer at the configured canvas size
//! 2. Draw through a font-tolerant bitmap backend
//! 3. Encode PNG in memory, base64 it, wrap it as a data URI
//!
//! The choropleth skips all of this and returns an HTML fragment.

use super::backend::FontSafeBackend;
use super::error::ChartError;
use super::map::{render_choropleth, BoundaryOverlay};
use super::series::{
    BarPalette, BarSeries, CanvasSize, ComparisonSeries, DonutSeries, HistogramSeries, Party,
    SeriesData, TimelineSeries,
};
use crate::config::ChartConfig;
use crate::stats::StatsCalculator;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbImage};
use plotters::coord::combinators::WithKeyPoints;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::fmt;
use std::io::Cursor;
use tracing::debug;

/// Encoded chart, ready to drop into a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedOutput {
    /// `data:image/png;base64,...`
    PngDataUri(String),
    HtmlFragment(String),
}

impl EncodedOutput {
    pub const PNG_PREFIX: &'static str = "data:image/png;base64,";

    pub fn from_png(bytes: &[u8]) -> Self {
        EncodedOutput::PngDataUri(format!("{}{}", Self::PNG_PREFIX, STANDARD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        match self {
            EncodedOutput::PngDataUri(s) | EncodedOutput::HtmlFragment(s) => s,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    /// Raw PNG bytes of a raster output.
    pub fn png_bytes(&self) -> Option<Vec<u8>> {
        match self {
            EncodedOutput::PngDataUri(s) => STANDARD.decode(s.strip_prefix(Self::PNG_PREFIX)?).ok(),
            EncodedOutput::HtmlFragment(_) => None,
        }
    }
}

impl fmt::Display for EncodedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Canvas<'a> = DrawingArea<FontSafeBackend<BitMapBackend<'a>>, Shift>;

/// Renders any `SeriesData` with a fixed configuration.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    config: ChartConfig,
    overlay: Option<BoundaryOverlay>,
}

impl ChartRenderer {
    pub fn new(config: ChartConfig, overlay: Option<BoundaryOverlay>) -> Self {
        Self { config, overlay }
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    /// Draw and encode one series.
    pub fn render_series(&self, series: &SeriesData) -> Result<EncodedOutput, ChartError> {
        let output = match series {
            SeriesData::Timeline(s) => {
                self.rasterize(self.config.wide_size, |root| self.draw_timeline(root, s))?
            }
            SeriesData::Donut(s) => {
                self.rasterize(self.config.wide_size, |root| self.draw_donut(root, s))?
            }
            SeriesData::Bars(s) => {
                let size = match s.size {
                    CanvasSize::Wide => self.config.wide_size,
                    CanvasSize::Short => self.config.short_size,
                    CanvasSize::Histogram => self.config.histogram_size,
                };
                self.rasterize(size, |root| self.draw_bars(root, s))?
            }
            SeriesData::Comparison(s) => {
                self.rasterize(self.config.wide_size, |root| self.draw_comparison(root, s))?
            }
            SeriesData::Histogram(s) => {
                self.rasterize(self.config.histogram_size, |root| self.draw_histogram(root, s))?
            }
            SeriesData::Choropleth(s) => {
                let overlay = self.overlay.as_ref().ok_or(ChartError::MissingOverlay)?;
                EncodedOutput::HtmlFragment(render_choropleth(s, overlay, &self.config.map)?)
            }
        };

        debug!(bytes = output.as_str().len(), "Chart encoded");
        Ok(output)
    }

    fn rasterize<F>(&self, (width, height): (u32, u32), draw: F) -> Result<EncodedOutput, ChartError>
    where
        F: FnOnce(&Canvas<'_>) -> Result<(), ChartError>,
    {
        if width == 0 || height == 0 {
            return Err(ChartError::Drawing(format!(
                "invalid canvas size {}x{}",
                width, height
            )));
        }

        let mut pixels = vec![0u8; width as usize * height as usize * 3];
        {
            let backend = BitMapBackend::with_buffer(&mut pixels, (width, height));
            let root = FontSafeBackend::new(backend).into_drawing_area();
            root.fill(&WHITE)?;
            draw(&root)?;
            root.present()?;
        }

        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| ChartError::Drawing("pixel buffer does not match canvas".to_string()))?;
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        Ok(EncodedOutput::from_png(&png))
    }

    fn font(&self, size: f64) -> FontDesc<'_> {
        (self.config.font_family.as_str(), size).into_font()
    }

    fn draw_timeline<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        series: &TimelineSeries,
    ) -> Result<(), ChartError> {
        let n = series.periods.len();
        if n == 0 {
            return Err(ChartError::EmptySelection("table has no periods".to_string()));
        }

        let lo = series.totals.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = series.totals.iter().copied().fold(0.0, f64::max);
        let y_max = hi.max(1.0) * 1.1;
        let line_color: RGBColor = self.config.timeline_color.into();

        let period_at = |x: &f64| period_label(&series.periods, *x);
        let thousands = |y: &f64| StatsCalculator::format_thousands(*y);

        let mut chart = ChartBuilder::on(root)
            .caption(&series.title, self.font(30.0))
            .margin(30)
            .x_label_area_size(100)
            .y_label_area_size(110)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)?;

        chart
            .configure_mesh()
            .x_labels(n)
            .x_label_formatter(&period_at)
            .x_label_style(self.font(13.0).transform(FontTransform::Rotate90))
            .y_label_formatter(&thousands)
            .y_labels(15)
            .label_style(self.font(14.0))
            .x_desc("Year")
            .y_desc("Number of Migrants")
            .axis_desc_style(self.font(20.0))
            .draw()?;

        for party in [Party::Labor, Party::Liberal] {
            let color: RGBColor = match party {
                Party::Labor => self.config.labor_color.into(),
                Party::Liberal => self.config.liberal_color.into(),
            };
            let fill = color.mix(self.config.party_alpha).filled();
            chart
                .draw_series(
                    series
                        .spans
                        .iter()
                        .filter(move |span| span.party == party)
                        .filter_map(move |span| {
                            // Spans past the last loaded period are clipped.
                            let start = span.start.max(-0.5);
                            let end = (span.start + span.length).min(n as f64 - 0.5);
                            (end > start).then(|| Rectangle::new([(start, lo), (end, hi)], fill))
                        }),
                )?
                .label(party.legend())
                .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 20, y + 6)], fill));
        }

        let points: Vec<(f64, f64)> = series
            .totals
            .iter()
            .enumerate()
            .map(|(i, v)| (i as f64, *v))
            .collect();
        chart.draw_series(LineSeries::new(points.iter().copied(), line_color.stroke_width(2)))?;
        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, line_color.filled())),
        )?;

        chart.draw_series(std::iter::once(Text::new(
            series.annotation(),
            (n as f64 * 0.6, y_max * 0.05),
            self.font(22.0).color(&BLACK),
        )))?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(self.font(20.0))
            .draw()?;

        Ok(())
    }

    fn draw_donut<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        series: &DonutSeries,
    ) -> Result<(), ChartError> {
        let total: f64 = series.values.iter().sum();
        if series.values.is_empty() || total <= 0.0 {
            return Err(ChartError::EmptySelection("no migrants to divide".to_string()));
        }

        let area = root.titled(&series.title, self.font(30.0))?;
        let (w, h) = area.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);
        let radius = f64::from(w.min(h)) * 0.4;
        let colors: Vec<RGBColor> = (0..series.values.len())
            .map(|i| self.config.continent_color(i).into())
            .collect();

        let mut pie = Pie::new(
            &center,
            &radius,
            series.values.as_slice(),
            colors.as_slice(),
            series.labels.as_slice(),
        );
        pie.start_angle(-90.0);
        pie.donut_hole(radius * 0.7);
        pie.label_style(self.font(20.0).color(&BLACK));
        pie.label_offset(20.0);
        pie.percentages(self.font(18.0).color(&BLACK));
        area.draw(&pie)?;

        // Legend sits inside the hole, one row per continent.
        let row_h = 32;
        let top = center.1 - (series.legend.len() as i32 * row_h) / 2;
        let left = center.0 - (radius * 0.45) as i32;
        for (i, (entry, color)) in series.legend.iter().zip(&colors).enumerate() {
            let y = top + i as i32 * row_h;
            area.draw(&Rectangle::new([(left, y + 4), (left + 20, y + 24)], color.filled()))?;
            area.draw(&Text::new(
                entry.as_str(),
                (left + 30, y + 14),
                self.font(22.0)
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Left, VPos::Center)),
            ))?;
        }

        Ok(())
    }

    fn draw_bars<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        series: &BarSeries,
    ) -> Result<(), ChartError> {
        let n = series.labels.len();
        if n == 0 {
            return Err(ChartError::EmptySelection("no bars to draw".to_string()));
        }

        let palette = match series.palette {
            BarPalette::Ranked => &self.config.ranked_bar_colors,
            BarPalette::Leader => &self.config.leader_bar_colors,
        };

        // Largest bar on top.
        let row_of = |i: usize| (n - 1 - i) as f64;
        let label_at = |y: &f64| {
            let row = y.round();
            if (y - row).abs() > 1e-6 || row < 0.0 || row as usize >= n {
                return String::new();
            }
            series.labels[n - 1 - row as usize].clone()
        };
        let thousands = |x: &f64| StatsCalculator::format_thousands(*x);

        let mut chart = ChartBuilder::on(root)
            .caption(&series.title, self.font(30.0))
            .margin(30)
            .x_label_area_size(80)
            .y_label_area_size(280)
            .build_cartesian_2d(value_axis(series), row_axis(n))?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_label_formatter(&label_at)
            .x_label_formatter(&thousands)
            .label_style(self.font(16.0))
            .x_desc(series.x_desc.as_str())
            .y_desc(series.y_desc.as_str())
            .axis_desc_style(self.font(20.0))
            .draw()?;

        chart.draw_series(series.values.iter().enumerate().map(|(i, v)| {
            let y = row_of(i);
            let color: RGBColor = self.config.bar_color(palette, i).into();
            Rectangle::new([(0.0, y - 0.25), (*v, y + 0.25)], color.filled())
        }))?;

        chart.draw_series(
            series
                .values
                .iter()
                .zip(series.annotations())
                .enumerate()
                .map(|(i, (v, text))| {
                    Text::new(
                        text,
                        (v * 1.01, row_of(i)),
                        self.font(18.0)
                            .color(&BLACK)
                            .pos(Pos::new(HPos::Left, VPos::Center)),
                    )
                }),
        )?;

        Ok(())
    }

    fn draw_comparison<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        series: &ComparisonSeries,
    ) -> Result<(), ChartError> {
        let n = series.periods.len();
        if n == 0 {
            return Err(ChartError::EmptySelection("table has no periods".to_string()));
        }

        let axis_max = |values: &[f64]| values.iter().copied().fold(0.0, f64::max).max(1.0) * 1.1;
        let primary_color: RGBColor = self.config.primary_series_color.into();
        let secondary_color: RGBColor = self.config.secondary_series_color.into();
        let x_range = -0.5f64..(n as f64 - 0.5);
        let y2_max = series
            .secondary
            .as_ref()
            .map(|s| axis_max(&s.values))
            .unwrap_or(1.0);

        let period_at = |x: &f64| period_label(&series.periods, *x);
        let thousands = |y: &f64| StatsCalculator::format_thousands(*y);

        let mut chart = ChartBuilder::on(root)
            .caption(&series.title, self.font(28.0))
            .margin(30)
            .x_label_area_size(100)
            .y_label_area_size(130)
            .right_y_label_area_size(if series.secondary.is_some() { 130 } else { 0 })
            .build_cartesian_2d(x_range.clone(), 0f64..axis_max(&series.primary.values))?
            .set_secondary_coord(x_range, 0f64..y2_max);

        chart
            .configure_mesh()
            .x_labels(n)
            .x_label_formatter(&period_at)
            .x_label_style(self.font(13.0).transform(FontTransform::Rotate90))
            .y_label_formatter(&thousands)
            .y_label_style(self.font(14.0).color(&primary_color))
            .x_desc("Year")
            .y_desc(series.primary.axis_label())
            .axis_desc_style(self.font(20.0).color(&primary_color))
            .draw()?;

        let points = |values: &[f64]| -> Vec<(f64, f64)> {
            values.iter().enumerate().map(|(i, v)| (i as f64, *v)).collect()
        };

        let primary_points = points(&series.primary.values);
        chart
            .draw_series(LineSeries::new(
                primary_points.iter().copied(),
                primary_color.stroke_width(2),
            ))?
            .label(series.primary.legend())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], primary_color.stroke_width(2))
            });
        chart.draw_series(
            primary_points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, primary_color.filled())),
        )?;

        if let Some(secondary) = &series.secondary {
            chart
                .configure_secondary_axes()
                .y_label_formatter(&thousands)
                .label_style(self.font(14.0).color(&secondary_color))
                .y_desc(secondary.axis_label())
                .axis_desc_style(self.font(20.0).color(&secondary_color))
                .draw()?;

            let secondary_points = points(&secondary.values);
            chart
                .draw_secondary_series(
                    DashedLineSeries::new(
                        secondary_points.iter().copied(),
                        10,
                        6,
                        secondary_color.stroke_width(2),
                    ),
                )?
                .label(secondary.legend())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], secondary_color.stroke_width(2))
                });
            chart.draw_secondary_series(
                secondary_points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4, secondary_color.filled())),
            )?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(self.font(20.0))
            .draw()?;

        Ok(())
    }

    fn draw_histogram<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        series: &HistogramSeries,
    ) -> Result<(), ChartError> {
        let hist = &series.histogram;
        let (Some(first), Some(last)) = (hist.edges.first(), hist.edges.last()) else {
            return Err(ChartError::EmptySelection("histogram has no bins".to_string()));
        };
        let bar_color: RGBColor = self.config.histogram_color.into();
        let thousands = |x: &f64| StatsCalculator::format_thousands(*x);
        let whole = |y: &f64| format!("{:.0}", y);

        let mut chart = ChartBuilder::on(root)
            .caption(&series.title, self.font(18.0))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(50)
            .build_cartesian_2d(*first..*last, 0f64..(hist.max_count() as f64 + 1.0))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(6)
            .x_label_formatter(&thousands)
            .y_label_formatter(&whole)
            .y_labels(hist.max_count() + 2)
            .label_style(self.font(11.0))
            .x_desc("Number of Migrants")
            .y_desc("Frequency")
            .axis_desc_style(self.font(13.0))
            .draw()?;

        let bars = hist
            .edges
            .windows(2)
            .zip(&hist.counts)
            .map(|(edge, count)| ([(edge[0], 0.0), (edge[1], *count as f64)], *count));

        chart.draw_series(
            bars.clone()
                .map(|(corners, _)| Rectangle::new(corners, bar_color.filled())),
        )?;
        chart.draw_series(
            bars.filter(|(_, count)| *count > 0)
                .map(|(corners, _)| Rectangle::new(corners, WHITE.stroke_width(1))),
        )?;

        Ok(())
    }
}

/// Value axis of a bar chart with a tick on every multiple of its tick step,
/// reaching ten percent past the longest bar.
fn value_axis(series: &BarSeries) -> WithKeyPoints<RangedCoordf64> {
    let step = series.tick_step;
    let ticks = StatsCalculator::tick_count(series.max_value(), step);
    let ticks_at = (0..=ticks).map(|i| i as f64 * step).collect();
    (0f64..ticks as f64 * step).with_key_points(ticks_at)
}

/// One tick per bar row.
fn row_axis(rows: usize) -> WithKeyPoints<RangedCoordf64> {
    (-0.5f64..(rows as f64 - 0.5)).with_key_points((0..rows).map(|r| r as f64).collect())
}

/// Tick label of a period index; blank between periods.
fn period_label(periods: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    periods.get(idx as usize).cloned().unwrap_or_default()
}
