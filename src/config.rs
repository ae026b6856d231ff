use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::processor::submission::SubmissionPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub kafka_bootstrap_servers: String,
    pub kafka_topic: String,
    pub kafka_group_id: String,
    pub kafka_auto_offset_reset: String,
    pub kafka_sasl_mechanism: String,
    pub kafka_username: String,
    pub kafka_password: String,
    pub kafka_security_protocol: String,
    pub kafka_max_retries: u32,
    pub kafka_circuit_breaker_cooldown: u64,
    pub database_url: String,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub geocode_timeout_secs: u64,
    pub duplicate_window_minutes: i64,
    pub rate_limit_max_reports: usize,
    pub rate_limit_window_minutes: i64,
    pub on_site_threshold_km: f64,
    pub log_level: String,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Parsed variable, falling back to `default` when unset or malformed.
fn parsed_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let kafka_bootstrap_servers = var_or("KAFKA_BOOTSTRAP_SERVERS", "localhost:9092");
        let kafka_topic = var_or("KAFKA_TOPIC", "fuelwatch-events");
        let kafka_group_id = var_or("KAFKA_GROUP_ID", "fuelwatch-core");
        let kafka_auto_offset_reset = var_or("KAFKA_AUTO_OFFSET_RESET", "latest");
        let kafka_sasl_mechanism = var_or("KAFKA_SASL_MECHANISM", "SCRAM-SHA-256");
        let kafka_username = env::var("KAFKA_USERNAME").unwrap_or_default();
        let kafka_password = env::var("KAFKA_PASSWORD").unwrap_or_default();
        let kafka_security_protocol = var_or("KAFKA_SECURITY_PROTOCOL", "SASL_PLAINTEXT");
        let kafka_max_retries = parsed_or("KAFKA_MAX_RETRIES", 5);
        let kafka_circuit_breaker_cooldown = parsed_or("KAFKA_CIRCUIT_BREAKER_COOLDOWN", 300);

        let db_host = var_or("DB_HOST", "localhost");
        let db_port = var_or("DB_PORT", "5432");
        let db_name = var_or("DB_DATABASE", "fuelwatch");
        let db_user = var_or("DB_USER", "fuelwatch");
        let db_pwd = var_or("DB_PWD", "fuelwatch");

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );

        let geocoder_url = var_or(
            "GEOCODER_URL",
            "https://nominatim.openstreetmap.org/search",
        );
        let geocoder_user_agent = var_or("GEOCODER_USER_AGENT", "fuelwatch/0.1");
        let geocode_timeout_secs = parsed_or("GEOCODE_TIMEOUT_SECS", 5);

        let defaults = SubmissionPolicy::default();
        let duplicate_window_minutes =
            parsed_or("DUPLICATE_WINDOW_MINUTES", defaults.duplicate_window_minutes);
        let rate_limit_max_reports = parsed_or("RATE_LIMIT_MAX_REPORTS", defaults.max_reports);
        let rate_limit_window_minutes =
            parsed_or("RATE_LIMIT_WINDOW_MINUTES", defaults.rate_window_minutes);
        let on_site_threshold_km = parsed_or(
            "ON_SITE_THRESHOLD_KM",
            crate::resolver::DEFAULT_ON_SITE_THRESHOLD_KM,
        );

        let log_level = var_or("LOG_LEVEL", "info");

        Ok(Self {
            kafka_bootstrap_servers,
            kafka_topic,
            kafka_group_id,
            kafka_auto_offset_reset,
            kafka_sasl_mechanism,
            kafka_username,
            kafka_password,
            kafka_security_protocol,
            kafka_max_retries,
            kafka_circuit_breaker_cooldown,
            database_url,
            geocoder_url,
            geocoder_user_agent,
            geocode_timeout_secs,
            duplicate_window_minutes,
            rate_limit_max_reports,
            rate_limit_window_minutes,
            on_site_threshold_km,
            log_level,
        })
    }

    pub fn submission_policy(&self) -> SubmissionPolicy {
        SubmissionPolicy {
            duplicate_window_minutes: self.duplicate_window_minutes,
            max_reports: self.rate_limit_max_reports,
            rate_window_minutes: self.rate_limit_window_minutes,
        }
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocode_timeout_secs)
    }
}
