use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::info;

use crate::error::Result;
use crate::model::{Coordinate, ResolvedSegment};

const NYC_CENTRE: [f64; 2] = [40.7128, -74.0060];
const ZOOM: u8 = 11;

/// Borough → colour lookup with an explicit fallback for anything unknown.
#[derive(Debug, Clone)]
pub struct ColourTable {
    entries: &'static [(&'static str, &'static str)],
    fallback: &'static str,
}

impl Default for ColourTable {
    fn default() -> Self {
        Self {
            entries: &[
                ("Bronx", "red"),
                ("Brooklyn", "blue"),
                ("Manhattan", "green"),
                ("Queens", "orange"),
                ("Staten Island", "purple"),
            ],
            fallback: "gray",
        }
    }
}

impl ColourTable {
    pub fn colour_for(&self, borough: &str) -> &'static str {
        self.entries
            .iter()
            .find(|(name, _)| *name == borough)
            .map(|(_, colour)| *colour)
            .unwrap_or(self.fallback)
    }
}

/// Consumes the resolved segments of a run and produces a map artifact.
pub trait MapRenderer {
    fn render(&self, segments: &[ResolvedSegment], colours: &ColourTable) -> Result<()>;
}

/// GeoJSON features for every segment: a line plus start/end markers for
/// two-point segments, a single marker otherwise.
pub fn feature_collection(segments: &[ResolvedSegment], colours: &ColourTable) -> Value {
    let mut features = Vec::with_capacity(segments.len() * 3);

    for seg in segments {
        let r = &seg.record;
        let colour = colours.colour_for(r.borough.name());

        match seg.end {
            Some(end) => {
                features.push(json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [lon_lat(seg.start), lon_lat(end)],
                    },
                    "properties": {
                        "kind": "segment",
                        "borough": r.borough.name(),
                        "colour": colour,
                        "popup": format!("{}: {} from {} to {}", r.borough, r.on_street, r.from_street, r.to_street),
                    },
                }));
                features.push(marker(seg.start, "start", colour, format!("START: {} & {}", r.on_street, r.from_street)));
                features.push(marker(end, "end", colour, format!("END: {} & {}", r.on_street, r.to_street)));
            }
            None => features.push(marker(
                seg.start,
                "point",
                colour,
                format!("{}: {} at {} (no end point found)", r.borough, r.on_street, r.from_street),
            )),
        }
    }

    json!({ "type": "FeatureCollection", "features": features })
}

fn marker(at: Coordinate, kind: &str, colour: &str, popup: String) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": lon_lat(at) },
        "properties": { "kind": kind, "colour": colour, "popup": popup },
    })
}

fn lon_lat(c: Coordinate) -> [f64; 2] {
    [c.longitude, c.latitude]
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

// ── Leaflet page ──

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>NYC concrete repairs</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map { height: 100%; margin: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
const segments = __GEOJSON__;
const map = L.map("map").setView(__CENTRE__, __ZOOM__);
L.tileLayer("https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png", {
  attribution: "&copy; OpenStreetMap contributors &copy; CARTO",
  maxZoom: 19
}).addTo(map);
L.geoJSON(segments, {
  style: f => ({ color: f.properties.colour, weight: 6, opacity: 0.35 }),
  pointToLayer: (f, latlng) => f.properties.kind === "point"
    ? L.marker(latlng)
    : L.circleMarker(latlng, {
        radius: 4, color: f.properties.colour, fill: true,
        fillColor: f.properties.colour, fillOpacity: 0.9
      }),
  onEachFeature: (f, layer) => layer.bindPopup(f.properties.popup)
}).addTo(map);
</script>
</body>
</html>
"#;

/// Self-contained HTML map page.
pub struct LeafletHtmlRenderer {
    path: PathBuf,
}

impl LeafletHtmlRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn page(segments: &[ResolvedSegment], colours: &ColourTable) -> String {
        let geojson = feature_collection(segments, colours)
            .to_string()
            .replace("</", "<\\/");
        PAGE_TEMPLATE
            .replace("__GEOJSON__", &geojson)
            .replace("__CENTRE__", &format!("[{}, {}]", NYC_CENTRE[0], NYC_CENTRE[1]))
            .replace("__ZOOM__", &ZOOM.to_string())
    }
}

impl MapRenderer for LeafletHtmlRenderer {
    fn render(&self, segments: &[ResolvedSegment], colours: &ColourTable) -> Result<()> {
        write_output(&self.path, &Self::page(segments, colours))?;
        info!("Map saved ➜ {}", self.path.display());
        Ok(())
    }
}

/// The same features as a standalone GeoJSON file.
pub struct GeoJsonRenderer {
    path: PathBuf,
}

impl GeoJsonRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MapRenderer for GeoJsonRenderer {
    fn render(&self, segments: &[ResolvedSegment], colours: &ColourTable) -> Result<()> {
        let body = serde_json::to_string_pretty(&feature_collection(segments, colours))
            .unwrap_or_else(|_| String::from("{}"));
        write_output(&self.path, &body)?;
        info!("GeoJSON saved ➜ {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Borough, StreetSegmentRecord};

    fn segment(borough: Borough, to: &str, end: Option<Coordinate>) -> ResolvedSegment {
        ResolvedSegment {
            record: StreetSegmentRecord {
                borough,
                on_street: "MAIN ST".into(),
                from_street: "OAK AVE".into(),
                to_street: to.into(),
            },
            start: Coordinate::new(40.75, -73.83),
            end,
        }
    }

    #[test]
    fn colour_lookup_has_fallback() {
        let table = ColourTable::default();
        assert_eq!(table.colour_for("Bronx"), "red");
        assert_eq!(table.colour_for("Staten Island"), "purple");
        assert_eq!(table.colour_for("Hoboken"), "gray");
        assert_eq!(table.colour_for(""), "gray");
        for b in Borough::ALL {
            assert_ne!(table.colour_for(b.name()), "gray", "{}", b);
        }
    }

    #[test]
    fn two_point_segment_gives_line_and_markers() {
        let segs = [segment(Borough::Queens, "5TH AVE", Some(Coordinate::new(40.76, -73.82)))];
        let fc = feature_collection(&segs, &ColourTable::default());
        let features = fc["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0]["geometry"]["type"], "LineString");
        assert_eq!(features[0]["geometry"]["coordinates"][0][0], -73.83);
        assert_eq!(features[0]["properties"]["colour"], "orange");
        assert_eq!(features[0]["properties"]["popup"], "Queens: MAIN ST from OAK AVE to 5TH AVE");
        assert_eq!(features[1]["properties"]["popup"], "START: MAIN ST & OAK AVE");
        assert_eq!(features[2]["properties"]["popup"], "END: MAIN ST & 5TH AVE");
    }

    #[test]
    fn point_only_segment_gives_single_marker() {
        let segs = [segment(Borough::Bronx, "5TH AVE", None)];
        let fc = feature_collection(&segs, &ColourTable::default());
        let features = fc["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["properties"]["kind"], "point");
        assert_eq!(
            features[0]["properties"]["popup"],
            "Bronx: MAIN ST at OAK AVE (no end point found)"
        );
    }

    #[test]
    fn html_renderer_writes_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/map.html");
        let segs = [segment(Borough::Manhattan, "", None)];
        LeafletHtmlRenderer::new(&path)
            .render(&segs, &ColourTable::default())
            .unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("L.map(\"map\").setView([40.7128, -74.006], 11)"));
        assert!(html.contains("\"colour\":\"green\""));
        assert!(!html.contains("__GEOJSON__"));
    }

    #[test]
    fn geojson_renderer_writes_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.geojson");
        GeoJsonRenderer::new(&path)
            .render(&[], &ColourTable::default())
            .unwrap();
        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"].as_array().unwrap().len(), 0);
    }
}
