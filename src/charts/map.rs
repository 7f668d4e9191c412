//! Choropleth Map Module
//! Joins per-country totals onto a GeoJSON boundary overlay and emits a
//! self-contained Leaflet HTML fragment.

use super::error::ChartError;
use super::series::ChoroplethSeries;
use crate::config::{MapConfig, Rgb};
use crate::data::LoadError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Element id of the map container.
pub const MAP_ELEMENT_ID: &str = "migration-map";

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

/// Country boundary polygons keyed by `properties.name`.
#[derive(Debug, Clone)]
pub struct BoundaryOverlay {
    geojson: Value,
}

impl BoundaryOverlay {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(LoadError::MissingFile(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| LoadError::Overlay(format!("{}: {}", path.display(), e)))?;
        let geojson: Value =
            serde_json::from_str(&text).map_err(|e| LoadError::Overlay(e.to_string()))?;
        Self::from_value(geojson)
    }

    /// Accepts any document with a `features` array.
    pub fn from_value(geojson: Value) -> Result<Self, LoadError> {
        if !geojson.get("features").is_some_and(Value::is_array) {
            return Err(LoadError::Overlay(
                "expected a FeatureCollection with a 'features' array".to_string(),
            ));
        }
        Ok(Self { geojson })
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features()
            .iter()
            .filter_map(Self::feature_name)
            .collect()
    }

    fn features(&self) -> &[Value] {
        self.geojson
            .get("features")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn feature_name(feature: &Value) -> Option<&str> {
        feature.get("properties")?.get("name")?.as_str()
    }
}

/// Bin of `value` given ascending `edges`; values past the last edge fall
/// in the top bin, negative or NaN values in none.
pub fn bin_index(value: f64, edges: &[f64]) -> Option<usize> {
    let bins = edges.len().checked_sub(1).filter(|b| *b > 0)?;
    if value.is_nan() || value < edges[0] {
        return None;
    }
    let idx = edges[1..]
        .iter()
        .position(|upper| value < *upper)
        .unwrap_or(bins - 1);
    Some(idx)
}

/// Build the HTML fragment for a choropleth over `overlay`.
pub fn render_choropleth(
    series: &ChoroplethSeries,
    overlay: &BoundaryOverlay,
    config: &MapConfig,
) -> Result<String, ChartError> {
    let values: HashMap<&str, f64> = series
        .values
        .iter()
        .map(|(country, v)| (country.as_str(), *v))
        .collect();

    let mut geojson = overlay.geojson.clone();
    let mut matched = 0usize;
    if let Some(features) = geojson.get_mut("features").and_then(Value::as_array_mut) {
        for feature in features.iter_mut() {
            let value = BoundaryOverlay::feature_name(feature).and_then(|n| values.get(n).copied());
            let (fill, opacity) = match value.and_then(|v| bin_index(v, &series.bins)) {
                Some(bin) => {
                    matched += 1;
                    (fill_color(config, bin), config.fill_opacity)
                }
                None => (config.nan_fill_color, config.nan_fill_opacity),
            };
            if let Some(props) = feature.get_mut("properties").and_then(Value::as_object_mut) {
                props.insert("fill_color".to_string(), json!(fill.to_hex()));
                props.insert("fill_opacity".to_string(), json!(opacity));
                props.insert("migrants_million".to_string(), json!(value));
            }
        }
    }

    let unmatched = series.values.len().saturating_sub(matched);
    if unmatched > 0 {
        warn!("{} countries have no boundary in the overlay", unmatched);
    }
    debug!(matched, "Choropleth features coloured");

    // Keep a literal "</script>" inside the data from closing the tag.
    let data = serde_json::to_string(&geojson)
        .map_err(|e| ChartError::Drawing(e.to_string()))?
        .replace("</", "<\\/");

    Ok(format!(
        r#"<div id="{id}" style="width: 100%; height: {height}px;"></div>
<link rel="stylesheet" href="{css}"/>
<script src="{js}"></script>
<script>
(function() {{
  var map = L.map("{id}").setView([{lat}, {lon}], {zoom});
  L.tileLayer("{tiles}", {{ attribution: "{attribution}" }}).addTo(map);
  var data = {data};
  L.geoJSON(data, {{
    style: function(feature) {{
      return {{
        fillColor: feature.properties.fill_color,
        fillOpacity: feature.properties.fill_opacity,
        color: "black",
        weight: 1,
        opacity: {line_opacity}
      }};
    }},
    onEachFeature: function(feature, layer) {{
      var v = feature.properties.migrants_million;
      layer.bindTooltip(feature.properties.name + (v === null ? "" : ": " + v.toFixed(3) + "M"));
    }}
  }}).addTo(map);
  var legend = L.control({{ position: "topright" }});
  legend.onAdd = function() {{
    var div = L.DomUtil.create("div", "legend");
    div.style.background = "white";
    div.style.padding = "6px";
    div.innerHTML = "{legend}";
    return div;
  }};
  legend.addTo(map);
}})();
</script>"#,
        id = MAP_ELEMENT_ID,
        height = config.height_px,
        css = LEAFLET_CSS,
        js = LEAFLET_JS,
        lat = config.center.0,
        lon = config.center.1,
        zoom = config.zoom,
        tiles = js_escape(&config.tiles_url),
        attribution = js_escape(&config.attribution),
        data = data,
        line_opacity = config.line_opacity,
        legend = js_escape(&legend_html(series, config)),
    ))
}

fn fill_color(config: &MapConfig, bin: usize) -> Rgb {
    config
        .fill_colors
        .get(bin)
        .or(config.fill_colors.last())
        .copied()
        .unwrap_or(config.nan_fill_color)
}

fn legend_html(series: &ChoroplethSeries, config: &MapConfig) -> String {
    let mut html = format!("<b>{}</b><br/>", series.legend_name);
    for (bin, pair) in series.bins.windows(2).enumerate() {
        html.push_str(&format!(
            "<i style='display:inline-block;width:14px;height:14px;background:{}'></i> {} &ndash; {}<br/>",
            fill_color(config, bin),
            pair[0],
            pair[1]
        ));
    }
    html
}

fn js_escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace("</", "<\\/")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::charts::series::MAP_BINS;

    pub(crate) fn overlay() -> BoundaryOverlay {
        let square = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        });
        BoundaryOverlay::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "name": "England" }, "geometry": square },
                { "type": "Feature", "properties": { "name": "China" }, "geometry": square },
                { "type": "Feature", "properties": { "name": "Antarctica" }, "geometry": square }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn bins_follow_edges() {
        assert_eq!(bin_index(0.0, &MAP_BINS), Some(0));
        assert_eq!(bin_index(0.15, &MAP_BINS), Some(1));
        assert_eq!(bin_index(0.7, &MAP_BINS), Some(3));
        assert_eq!(bin_index(2.0, &MAP_BINS), Some(4));
        assert_eq!(bin_index(9.0, &MAP_BINS), Some(4));
        assert_eq!(bin_index(-1.0, &MAP_BINS), None);
        assert_eq!(bin_index(f64::NAN, &MAP_BINS), None);
        assert_eq!(bin_index(1.0, &[0.0]), None);
    }

    #[test]
    fn colours_matched_features_and_blanks_the_rest() {
        let series = ChoroplethSeries {
            legend_name: "Migrants (million)".to_string(),
            values: vec![("England".to_string(), 0.7), ("China".to_string(), 0.2)],
            bins: MAP_BINS.to_vec(),
        };
        let config = MapConfig::default();
        let html = render_choropleth(&series, &overlay(), &config).unwrap();

        assert!(html.contains(&format!("id=\"{}\"", MAP_ELEMENT_ID)));
        assert!(html.contains("\"fill_color\":\"#f03b20\""));
        assert!(html.contains("\"fill_color\":\"#fecc5c\""));
        assert!(html.contains("\"fill_color\":\"#ffffff\""));
        assert!(html.contains("Migrants (million)"));
        assert!(html.contains("setView([30, 10], 1.5)"));
    }

    #[test]
    fn overlay_requires_features() {
        assert!(BoundaryOverlay::from_value(json!({ "type": "Feature" })).is_err());
        assert_eq!(overlay().feature_names(), vec!["England", "China", "Antarctica"]);
    }

    #[test]
    fn overlay_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(&path, overlay().geojson.to_string()).unwrap();

        let loaded = BoundaryOverlay::load(&path).unwrap();
        assert_eq!(loaded.feature_names().len(), 3);

        assert!(matches!(
            BoundaryOverlay::load(dir.path().join("missing.json")),
            Err(LoadError::MissingFile(_))
        ));
    }
}
