use std::sync::Arc;

use fuelwatch::config::AppConfig;
use fuelwatch::db::{self, FuelStore, OutboxNotifier, PgStore, StorePresence};
use fuelwatch::geo::LAGOS_BOUNDS;
use fuelwatch::geocode::NominatimGeocoder;
use fuelwatch::kafka;
use fuelwatch::processor::message_processor::EventContext;
use fuelwatch::processor::submission::ReportPipeline;
use fuelwatch::resolver::NearestStationResolver;
use fuelwatch::stations::StationRegistry;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Fuelwatch core service...");

    // Init DB
    let pool = db::init_pool(&config.database_url).await?;
    info!("Connected to database");

    let store = Arc::new(PgStore::new(pool));
    let geocoder = NominatimGeocoder::new(
        &config.geocoder_url,
        &config.geocoder_user_agent,
        config.geocode_timeout(),
    )?;

    let ctx = EventContext {
        store: store.clone() as Arc<dyn FuelStore>,
        pipeline: ReportPipeline::new(
            store.clone(),
            Arc::new(OutboxNotifier(store.clone())),
            config.submission_policy(),
        ),
        resolver: NearestStationResolver::new(config.on_site_threshold_km)
            .with_presence(Arc::new(StorePresence(store.clone()))),
        registry: StationRegistry::new(
            store.clone(),
            Arc::new(geocoder),
            config.geocode_timeout(),
            LAGOS_BOUNDS,
        ),
    };
    info!(
        "Policy: duplicate window {} min, {} reports per {} min, on-site radius {} km",
        config.duplicate_window_minutes,
        config.rate_limit_max_reports,
        config.rate_limit_window_minutes,
        config.on_site_threshold_km
    );

    // Start Kafka
    kafka::start_kafka_consumer(&config, ctx).await?;

    Ok(())
}
