use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::GeocodeError;
use crate::model::Coordinate;

pub const ARCGIS_URL: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates";

/// Resolves a free-form address to a coordinate. `Ok(None)` means the
/// service answered but found nothing.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError>;
}

// ── ArcGIS ──

pub struct ArcGisGeocoder {
    client: reqwest::Client,
    url: String,
}

impl ArcGisGeocoder {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Geocoder for ArcGisGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("SingleLine", address),
                ("f", "json"),
                ("maxLocations", "1"),
                ("outFields", "Match_addr"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        parse_candidates(&body)
    }
}

#[derive(Deserialize)]
struct CandidatesResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    location: Location,
}

#[derive(Deserialize)]
struct Location {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct ApiError {
    code: Option<i64>,
    message: Option<String>,
}

/// Best candidate of a `findAddressCandidates` body. The service reports
/// some failures (bad token, quota) as a 200 with an `error` object.
fn parse_candidates(body: &str) -> Result<Option<Coordinate>, GeocodeError> {
    let parsed: CandidatesResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;

    if let Some(err) = parsed.error {
        return Err(GeocodeError::Malformed(format!(
            "service error {}: {}",
            err.code.unwrap_or_default(),
            err.message.unwrap_or_default()
        )));
    }

    Ok(parsed
        .candidates
        .first()
        .map(|c| Coordinate::new(c.location.y, c.location.x)))
}

// ── Cache ──

#[derive(Default)]
struct CacheState {
    known: HashMap<String, Coordinate>,
    fresh: Vec<(String, Coordinate)>,
}

/// Serves previously resolved addresses from memory and remembers new
/// successes so they can be written back after the run. Misses and
/// failures are never cached.
pub struct CachingGeocoder<G> {
    inner: G,
    state: Mutex<CacheState>,
    hits: AtomicUsize,
}

impl<G> CachingGeocoder<G> {
    pub fn new(inner: G, seed: HashMap<String, Coordinate>) -> Self {
        Self {
            inner,
            state: Mutex::new(CacheState {
                known: seed,
                fresh: Vec::new(),
            }),
            hits: AtomicUsize::new(0),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Entries resolved since construction or the last call.
    pub fn take_fresh(&self) -> Vec<(String, Coordinate)> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut state.fresh)
    }

    fn lookup(&self, address: &str) -> Option<Coordinate> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.known.get(address).copied()
    }

    fn remember(&self, address: &str, coord: Coordinate) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.known.insert(address.to_string(), coord).is_none() {
            state.fresh.push((address.to_string(), coord));
        }
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachingGeocoder<G> {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        if let Some(coord) = self.lookup(address) {
            debug!("Cache hit: {}", address);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(coord));
        }
        let result = self.inner.geocode(address).await?;
        if let Some(coord) = result {
            self.remember(address, coord);
        }
        Ok(result)
    }
}
