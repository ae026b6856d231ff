//! Picks the station to route a user to.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::geo::GeoPoint;
use crate::models::{Identity, Station};
use crate::notify::{PresenceIntent, PresenceSink};

/// Radius inside which the user is taken to be standing at the station.
pub const DEFAULT_ON_SITE_THRESHOLD_KM: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<'a> {
    pub station: &'a Station,
    pub distance_km: f64,
    pub on_site: bool,
}

/// Pure selection step.
///
/// Stations without coordinates are never chosen. Equal distances keep the
/// first station in input order. Policy, in order: the absolute nearest if
/// within the on-site threshold whatever its status, else the nearest active
/// station, else the absolute nearest.
pub fn select_nearest<'a>(
    location: Option<GeoPoint>,
    stations: &'a [Station],
    on_site_threshold_km: f64,
) -> Option<Resolution<'a>> {
    let location = location.filter(|p| p.lat.is_finite() && p.lng.is_finite())?;

    let mut absolute: Option<(&Station, f64)> = None;
    let mut active: Option<(&Station, f64)> = None;

    for station in stations {
        let Some(position) = station.position() else {
            continue;
        };
        let distance = location.distance_to(&position);

        if absolute.map_or(true, |(_, best)| distance < best) {
            absolute = Some((station, distance));
        }
        if station.is_active() && active.map_or(true, |(_, best)| distance < best) {
            active = Some((station, distance));
        }
    }

    let (station, distance_km) = match (absolute, active) {
        (Some(nearest), _) if nearest.1 <= on_site_threshold_km => nearest,
        (_, Some(nearest_active)) => nearest_active,
        (Some(nearest), None) => nearest,
        (None, None) => return None,
    };

    Some(Resolution {
        station,
        distance_km,
        on_site: distance_km <= on_site_threshold_km,
    })
}

/// Selection plus the arrival side channel.
#[derive(Clone)]
pub struct NearestStationResolver {
    on_site_threshold_km: f64,
    presence: Option<Arc<dyn PresenceSink>>,
}

impl NearestStationResolver {
    pub fn new(on_site_threshold_km: f64) -> Self {
        Self {
            on_site_threshold_km,
            presence: None,
        }
    }

    pub fn with_presence(mut self, sink: Arc<dyn PresenceSink>) -> Self {
        self.presence = Some(sink);
        self
    }

    pub fn resolve<'a>(
        &self,
        location: Option<GeoPoint>,
        stations: &'a [Station],
    ) -> Option<Resolution<'a>> {
        select_nearest(location, stations, self.on_site_threshold_km)
    }

    /// Resolves and, on arrival, records presence. A failing presence sink is
    /// logged and never affects the result.
    pub async fn resolve_and_record<'a>(
        &self,
        location: Option<GeoPoint>,
        stations: &'a [Station],
        identity: &Identity,
    ) -> Option<Resolution<'a>> {
        let resolution = self.resolve(location, stations)?;

        if resolution.on_site {
            if let Some(sink) = &self.presence {
                let intent = PresenceIntent {
                    station_id: resolution.station.id.clone(),
                    user_id: identity.user_id().map(str::to_string),
                };
                match sink.record_presence(&intent).await {
                    Ok(()) => debug!("Recorded presence at station {}", intent.station_id),
                    Err(e) => warn!(
                        "Failed to record presence at station {}: {}",
                        intent.station_id, e
                    ),
                }
            }
        }

        Some(resolution)
    }
}
