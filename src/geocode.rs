use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{FuelError, Result};
use crate::geo::GeoPoint;

/// Address lookup collaborator.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the address resolved to nothing.
    async fn lookup(&self, address: &str) -> Result<Option<GeoPoint>>;
}

/// Nominatim-compatible search endpoint, restricted to Nigeria.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FuelError::Geocode(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn lookup(&self, address: &str) -> Result<Option<GeoPoint>> {
        let query = format!("{}, Lagos, Nigeria", address);
        debug!("Geocoding '{}'", query);

        let hits: Vec<SearchHit> = self
            .client
            .get(&self.url)
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", "ng"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FuelError::Geocode(e.to_string()))?
            .json()
            .await
            .map_err(|e| FuelError::Geocode(e.to_string()))?;

        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };
        match (hit.lat.parse::<f64>(), hit.lon.parse::<f64>()) {
            (Ok(lat), Ok(lng)) => Ok(Some(GeoPoint::new(lat, lng))),
            _ => Err(FuelError::Geocode(format!(
                "unparseable coordinates {} / {}",
                hit.lat, hit.lon
            ))),
        }
    }
}
