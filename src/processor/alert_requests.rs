use tracing::info;
use uuid::Uuid;

use crate::alerts;
use crate::db::FuelStore;
use crate::error::{FuelError, Result};
use crate::models::{AlertRequest, PriceAlert};

/// Creates an alert after checking its target against the current price.
pub async fn create_price_alert(store: &dyn FuelStore, request: &AlertRequest) -> Result<PriceAlert> {
    let stations = match &request.station_id {
        Some(id) => vec![store
            .get_station(id)
            .await?
            .ok_or_else(|| FuelError::StationNotFound(id.clone()))?],
        None => store.list_stations().await?,
    };

    let current = alerts::current_price(request, &stations);
    let now = store.server_time().await?;
    let alert = alerts::create_alert(request, current, now)?;
    store.create_alert(&alert).await?;

    info!(
        "Created price alert {} for user {} ({} <= {})",
        alert.id, alert.user_id, alert.fuel_type, alert.target_price
    );
    Ok(alert)
}

/// Out-of-band removal by the alert's owner.
pub async fn delete_price_alert(store: &dyn FuelStore, alert_id: Uuid, user_id: &str) -> Result<()> {
    if !store.delete_alert(alert_id, user_id).await? {
        return Err(FuelError::AlertNotFound(alert_id));
    }
    info!("Deleted price alert {} for user {}", alert_id, user_id);
    Ok(())
}
