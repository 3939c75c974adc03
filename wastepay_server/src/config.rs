use std::{env, fmt::Display, str::FromStr, time::Duration};

use chrono::Duration as ChronoDuration;
use log::*;
use wastepay_common::helpers::{parse_boolean_flag, parse_number};

const DEFAULT_WPS_HOST: &str = "127.0.0.1";
const DEFAULT_WPS_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/wastepay.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_RECONCILE_INTERVAL_MINS: u64 = 60;
const DEFAULT_UNPAID_ORDER_TIMEOUT_MINS: i64 = 60;
const DEFAULT_PROVIDER_LATENCY_MS: u64 = 2000;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// How often the reconciler looks for unpaid orders.
    pub reconcile_interval: Duration,
    /// The time an order may wait for payment before it is cancelled and its participants refunded.
    pub unpaid_order_timeout: ChronoDuration,
    /// The simulated round-trip time of the payment provider.
    pub provider_latency: Duration,
    /// If true, pending database migrations are applied at startup.
    pub run_migrations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_WPS_HOST.to_string(),
            port: DEFAULT_WPS_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            reconcile_interval: Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_MINS * 60),
            unpaid_order_timeout: ChronoDuration::minutes(DEFAULT_UNPAID_ORDER_TIMEOUT_MINS),
            provider_latency: Duration::from_millis(DEFAULT_PROVIDER_LATENCY_MS),
            run_migrations: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("WPS_HOST").ok().unwrap_or_else(|| DEFAULT_WPS_HOST.into());
        let port = setting("WPS_PORT", DEFAULT_WPS_PORT);
        let database_url = env::var("WPS_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ WPS_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let db_max_connections = setting("WPS_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let reconcile_mins = setting("WPS_RECONCILE_INTERVAL_MINS", DEFAULT_RECONCILE_INTERVAL_MINS);
        let reconcile_mins = if reconcile_mins == 0 {
            warn!("🪛️ WPS_RECONCILE_INTERVAL_MINS must be at least 1. Using 1 minute.");
            1
        } else {
            reconcile_mins
        };
        let timeout_mins = setting("WPS_UNPAID_ORDER_TIMEOUT_MINS", DEFAULT_UNPAID_ORDER_TIMEOUT_MINS).max(0);
        let latency_ms = setting("WPS_PROVIDER_LATENCY_MS", DEFAULT_PROVIDER_LATENCY_MS);
        let run_migrations = parse_boolean_flag(env::var("WPS_RUN_MIGRATIONS").ok(), true);
        Self {
            host,
            port,
            database_url,
            db_max_connections,
            reconcile_interval: Duration::from_secs(reconcile_mins * 60),
            unpaid_order_timeout: ChronoDuration::minutes(timeout_mins),
            provider_latency: Duration::from_millis(latency_ms),
            run_migrations,
        }
    }
}

/// Reads a numeric setting from the environment. Missing or invalid values fall back to `default`.
fn setting<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match parse_number::<T>(env::var(name).ok()) {
        Ok(Some(v)) => v,
        Ok(None) => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Err(e) => {
            error!("🪛️ Invalid configuration value for {name}. {e} Using the default, {default}, instead.");
            default
        },
    }
}
