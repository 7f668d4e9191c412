//! Chart Configuration Module
//! Immutable styling and layout settings handed to the chart selector.

use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),
}

/// An sRGB color written as `#rrggbb` in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub fn parse(hex: &str) -> Result<Self, ConfigError> {
        let digits = hex.trim().strip_prefix('#').unwrap_or(hex.trim());
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidColor(hex.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| ConfigError::InvalidColor(hex.to_string()))
        };
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

impl From<Rgb> for RGBColor {
    fn from(value: Rgb) -> Self {
        RGBColor(value.0, value.1, value.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn rgb(hex: &str) -> Rgb {
    Rgb::parse(hex).unwrap_or(Rgb::BLACK)
}

/// Leaflet map settings for the choropleth fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub center: (f64, f64),
    pub zoom: f64,
    pub height_px: u32,
    pub tiles_url: String,
    pub attribution: String,
    /// One color per bin, low to high (YlOrRd).
    pub fill_colors: Vec<Rgb>,
    pub fill_opacity: f64,
    pub line_opacity: f64,
    pub nan_fill_color: Rgb,
    pub nan_fill_opacity: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: (30.0, 10.0),
            zoom: 1.5,
            height_px: 600,
            tiles_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors".to_string(),
            fill_colors: vec![
                rgb("#ffffb2"),
                rgb("#fecc5c"),
                rgb("#fd8d3c"),
                rgb("#f03b20"),
                rgb("#bd0026"),
            ],
            fill_opacity: 0.8,
            line_opacity: 0.2,
            nan_fill_color: Rgb::WHITE,
            nan_fill_opacity: 0.3,
        }
    }
}

/// Styling for every chart the selector can produce.
///
/// Built once (defaults or a JSON file) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Timeline, continent, region, top ten and comparison charts.
    pub wide_size: (u32, u32),
    /// Continent top-five bars.
    pub short_size: (u32, u32),
    pub histogram_size: (u32, u32),
    pub font_family: String,
    /// Bars after the listed colors use `default_bar_color`.
    pub ranked_bar_colors: Vec<Rgb>,
    pub leader_bar_colors: Vec<Rgb>,
    pub default_bar_color: Rgb,
    pub continent_colors: Vec<Rgb>,
    pub labor_color: Rgb,
    pub liberal_color: Rgb,
    pub party_alpha: f64,
    pub timeline_color: Rgb,
    pub primary_series_color: Rgb,
    pub secondary_series_color: Rgb,
    pub histogram_color: Rgb,
    pub map: MapConfig,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            wide_size: (1800, 1000),
            short_size: (1800, 800),
            histogram_size: (800, 600),
            font_family: "sans-serif".to_string(),
            ranked_bar_colors: vec![rgb("#008080"), rgb("#e6e600")],
            leader_bar_colors: vec![rgb("#b30000")],
            default_bar_color: Rgb::BLACK,
            continent_colors: vec![
                rgb("#999999"),
                rgb("#666666"),
                rgb("#e6e600"),
                rgb("#008080"),
                rgb("#808080"),
            ],
            labor_color: rgb("#ff0000"),
            liberal_color: rgb("#0000ff"),
            party_alpha: 0.3,
            timeline_color: Rgb::BLACK,
            primary_series_color: rgb("#660000"),
            secondary_series_color: rgb("#006666"),
            histogram_color: rgb("#0d3300"),
            map: MapConfig::default(),
        }
    }
}

impl ChartConfig {
    /// Load a config from JSON; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Color of the bar at `rank`, falling back to the default bar color.
    pub fn bar_color(&self, palette: &[Rgb], rank: usize) -> Rgb {
        palette.get(rank).copied().unwrap_or(self.default_bar_color)
    }

    pub fn continent_color(&self, index: usize) -> Rgb {
        if self.continent_colors.is_empty() {
            return self.default_bar_color;
        }
        self.continent_colors[index % self.continent_colors.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(Rgb::parse("#008080").unwrap(), Rgb(0, 128, 128));
        assert_eq!(Rgb::parse("e6e600").unwrap(), Rgb(230, 230, 0));
        assert!(Rgb::parse("#12345").is_err());
        assert!(Rgb::parse("#zzzzzz").is_err());
        assert!(Rgb::parse("#+1+2+3").is_err());
        assert!(Rgb::parse("#-1ffff").is_err());
        assert_eq!(Rgb(189, 0, 38).to_hex(), "#bd0026");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ChartConfig::from_json_str(
            r##"{ "histogram_color": "#112233", "map": { "zoom": 3.0 } }"##,
        )
        .unwrap();

        assert_eq!(config.histogram_color, Rgb(0x11, 0x22, 0x33));
        assert_eq!(config.map.zoom, 3.0);
        assert_eq!(config.map.center, (30.0, 10.0));
        assert_eq!(config.wide_size, (1800, 1000));
    }

    #[test]
    fn rejects_bad_color_in_json() {
        let err = ChartConfig::from_json_str(r#"{ "labor_color": "red" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn bar_colors_fall_back_after_palette() {
        let config = ChartConfig::default();
        assert_eq!(config.bar_color(&config.ranked_bar_colors, 0), Rgb(0, 128, 128));
        assert_eq!(config.bar_color(&config.ranked_bar_colors, 5), Rgb::BLACK);
    }
}
