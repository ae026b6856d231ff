//! Station registration, community verification and region cleanup.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::db::FuelStore;
use crate::error::{FuelError, Result};
use crate::geo::{Bounds, GeoPoint};
use crate::geocode::Geocoder;
use crate::models::message::{StationDraft, Vote};
use crate::models::Station;

pub struct StationRegistry {
    store: Arc<dyn FuelStore>,
    geocoder: Arc<dyn Geocoder>,
    geocode_timeout: Duration,
    region: Bounds,
}

impl StationRegistry {
    pub fn new(
        store: Arc<dyn FuelStore>,
        geocoder: Arc<dyn Geocoder>,
        geocode_timeout: Duration,
        region: Bounds,
    ) -> Self {
        Self {
            store,
            geocoder,
            geocode_timeout,
            region,
        }
    }

    /// Saves a new station. Missing or out-of-region coordinates are looked up
    /// from the address; a failed, slow or out-of-region lookup saves the
    /// station without coordinates instead of refusing it.
    pub async fn register(&self, draft: StationDraft) -> Result<Station> {
        let name = draft.name.trim();
        if name.is_empty() || draft.id.trim().is_empty() {
            return Err(FuelError::Validation(vec![
                "Station id and name are required".to_string(),
            ]));
        }

        // Submitted coordinates get the same region check as geocoded ones
        let submitted = match (draft.lat, draft.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        };
        let position = match submitted {
            Some(point) if self.region.contains(&point) => Some(point),
            Some(point) => {
                warn!(
                    "Station {} submitted outside the service region ({}, {}), geocoding address",
                    draft.id, point.lat, point.lng
                );
                self.locate(&draft.address).await
            }
            None => self.locate(&draft.address).await,
        };

        let mut station = Station::new(draft.id.trim(), name, draft.address.trim());
        if let Some(point) = position {
            station = station.with_position(point.lat, point.lng);
        }
        self.store.insert_station(&station).await?;

        info!(
            "Registered station {} ({}), located: {}",
            station.id,
            station.name,
            station.position().is_some()
        );
        Ok(station)
    }

    async fn locate(&self, address: &str) -> Option<GeoPoint> {
        if address.trim().is_empty() {
            return None;
        }
        match tokio::time::timeout(self.geocode_timeout, self.geocoder.lookup(address)).await {
            Ok(Ok(Some(point))) if self.region.contains(&point) => Some(point),
            Ok(Ok(Some(point))) => {
                warn!(
                    "Geocoded '{}' outside the service region ({}, {}), ignoring",
                    address, point.lat, point.lng
                );
                None
            }
            Ok(Ok(None)) => {
                warn!("No geocoding match for '{}'", address);
                None
            }
            Ok(Err(e)) => {
                warn!("Geocoding '{}' failed: {}", address, e);
                None
            }
            Err(_) => {
                warn!(
                    "Geocoding '{}' timed out after {:?}",
                    address, self.geocode_timeout
                );
                None
            }
        }
    }

    /// Applies a confirm/flag vote from an authenticated user.
    pub async fn verify(&self, station_id: &str, user_id: &str, vote: Vote) -> Result<Station> {
        let mut station = self
            .store
            .get_station(station_id)
            .await?
            .ok_or_else(|| FuelError::StationNotFound(station_id.to_string()))?;

        let changed = match vote {
            Vote::Confirm => station.confirm(user_id),
            Vote::Flag => station.flag(user_id),
        };
        if changed {
            self.store.set_verification(&station).await?;
        }
        Ok(station)
    }

    /// Removes stations whose coordinates fall outside the service region.
    /// Stations without coordinates are kept. Returns the removed ids.
    pub async fn purge_out_of_region(&self) -> Result<Vec<String>> {
        let stations = self.store.list_stations().await?;
        let mut removed = Vec::new();

        for id in out_of_region(&stations, &self.region) {
            self.store.delete_station(&id).await?;
            removed.push(id);
        }

        info!("Removed {} out-of-region stations", removed.len());
        Ok(removed)
    }
}

pub fn out_of_region(stations: &[Station], region: &Bounds) -> Vec<String> {
    stations
        .iter()
        .filter(|s| s.position().is_some_and(|p| !region.contains(&p)))
        .map(|s| s.id.clone())
        .collect()
}
