use std::sync::Arc;
use tracing::{info, warn};

use crate::db::FuelStore;
use crate::error::FuelError;
use crate::geo::format_distance;
use crate::models::message::{InboundEvent, LocationFix};
use crate::processor::alert_requests;
use crate::processor::submission::{ReportPipeline, SubmissionOutcome};
use crate::resolver::NearestStationResolver;
use crate::stations::StationRegistry;

/// Everything an inbound event may touch.
pub struct EventContext {
    pub store: Arc<dyn FuelStore>,
    pub pipeline: ReportPipeline,
    pub resolver: NearestStationResolver,
    pub registry: StationRegistry,
}

/// Handles one raw event payload. Malformed payloads and rejected operations
/// are logged and skipped; only collaborator failures are returned.
pub async fn process_message(ctx: &EventContext, payload: &[u8]) -> anyhow::Result<()> {
    // 1. Parse JSON
    let event: InboundEvent = match serde_json::from_slice(payload) {
        Ok(e) => e,
        Err(e) => {
            warn!("Failed to parse message: {}", e);
            return Ok(());
        }
    };

    // 2. Dispatch
    let result = match event {
        InboundEvent::LocationFix(fix) => {
            handle_location(ctx, fix).await;
            Ok(())
        }
        InboundEvent::SubmitReport(submission) => {
            let station_id = submission.station_id.clone();
            match ctx.pipeline.submit_and_reply(submission).await {
                Ok(SubmissionOutcome::Accepted { report, triggered }) => {
                    info!(
                        "Report {} stored for station {}, {} alerts fired",
                        report.id,
                        station_id,
                        triggered.len()
                    );
                    Ok(())
                }
                Ok(SubmissionOutcome::NeedsConfirmation { last_report }) => {
                    info!(
                        "Report for station {} held for confirmation (previous report {} at {})",
                        station_id, last_report.id, last_report.created_at
                    );
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        InboundEvent::CreateAlert(request) => {
            alert_requests::create_price_alert(ctx.store.as_ref(), &request)
                .await
                .map(|_| ())
        }
        InboundEvent::DeleteAlert { alert_id, user_id } => {
            alert_requests::delete_price_alert(ctx.store.as_ref(), alert_id, &user_id).await
        }
        InboundEvent::RegisterStation(draft) => ctx.registry.register(draft).await.map(|_| ()),
        InboundEvent::VerifyStation {
            station_id,
            user_id,
            vote,
        } => ctx
            .registry
            .verify(&station_id, &user_id, vote)
            .await
            .map(|_| ()),
        InboundEvent::PurgeOutOfRegion => ctx.registry.purge_out_of_region().await.map(|_| ()),
    };

    // 3. User-facing rejections are not processing failures
    match result {
        Ok(()) => Ok(()),
        Err(e @ FuelError::Store { .. }) => Err(e.into()),
        Err(e) => {
            warn!("Rejected event: {}", e);
            Ok(())
        }
    }
}

async fn handle_location(ctx: &EventContext, fix: LocationFix) {
    let stations = match ctx.store.list_stations().await {
        Ok(s) => s,
        Err(e) => {
            warn!("Could not load stations for location fix: {}", e);
            return;
        }
    };

    match ctx
        .resolver
        .resolve_and_record(fix.point(), &stations, &fix.identity)
        .await
    {
        Some(resolution) => info!(
            "Nearest station for {}: {} ({}{})",
            fix.identity.display_name(),
            resolution.station.name,
            format_distance(resolution.distance_km),
            if resolution.on_site { ", on site" } else { "" }
        ),
        None => info!(
            "No station resolvable for {}",
            fix.identity.display_name()
        ),
    }
}
