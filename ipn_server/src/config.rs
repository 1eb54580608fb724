use std::{env, fmt::Display, str::FromStr, time::Duration as StdDuration};

use chrono::Duration;
use ipn_common::helpers::env_flag;
use ipn_engine::{
    idempotency::{DEFAULT_MISS_THRESHOLD, DEFAULT_MISS_WINDOW_DAYS, MAX_MISS_WINDOW_DAYS},
    verification::DEFAULT_VERIFY_URL,
    ReconciliationOptions,
};
use log::*;

const DEFAULT_IPN_HOST: &str = "127.0.0.1";
const DEFAULT_IPN_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/ipn_ledger.db";
const DEFAULT_VERIFY_TIMEOUT: StdDuration = StdDuration::from_secs(20);

/// Where the redelivery (miss) counters are kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissCounterBackend {
    /// Counters live in the ledger database and survive restarts.
    #[default]
    Database,
    /// Counters live in process memory and are shared by all workers.
    Memory,
}

impl FromStr for MissCounterBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "database" | "db" | "sqlite" => Ok(Self::Database),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("'{other}' is not a miss counter backend. Use 'database' or 'memory'.")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The processor's verification endpoint. Every notification body is replayed here.
    pub verify_url: String,
    /// How long to wait for the verification endpoint before giving up on a notification.
    pub verify_timeout: StdDuration,
    /// Namespace for miss counter keys, so that several deployments can share one store.
    pub cache_prefix: String,
    /// Redeliveries of an unmatched refund (or purchase, see `tolerate_purchase_misses`) before it is dropped.
    pub miss_threshold: u64,
    /// Miss counters are forgotten after this long.
    pub miss_window: Duration,
    pub tolerate_purchase_misses: bool,
    pub miss_counter: MissCounterBackend,
    /// If true, the X-Forwarded-For header will be used to determine the sender's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the sender's IP address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_IPN_HOST.to_string(),
            port: DEFAULT_IPN_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            verify_url: DEFAULT_VERIFY_URL.to_string(),
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            cache_prefix: String::default(),
            miss_threshold: DEFAULT_MISS_THRESHOLD,
            miss_window: Duration::days(DEFAULT_MISS_WINDOW_DAYS),
            tolerate_purchase_misses: false,
            miss_counter: MissCounterBackend::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("IPN_HOST").ok().unwrap_or(defaults.host);
        let port = parse_env("IPN_PORT", defaults.port);
        let database_url = env::var("IPN_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ IPN_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            defaults.database_url
        });
        let verify_url = env::var("IPN_VERIFY_URL").ok().unwrap_or_else(|| {
            info!("🪛️ IPN_VERIFY_URL is not set. Notifications will be verified against {DEFAULT_VERIFY_URL}.");
            defaults.verify_url
        });
        let verify_timeout = StdDuration::from_secs(parse_env("IPN_VERIFY_TIMEOUT", DEFAULT_VERIFY_TIMEOUT.as_secs()));
        let cache_prefix = env::var("IPN_CACHE_PREFIX").ok().unwrap_or_default();
        let miss_threshold = parse_env("IPN_MISS_THRESHOLD", defaults.miss_threshold);
        let miss_window = miss_window_from_days(parse_env("IPN_MISS_WINDOW_DAYS", DEFAULT_MISS_WINDOW_DAYS));
        let tolerate_purchase_misses = env_flag("IPN_TOLERATE_PURCHASE_MISSES", false);
        let miss_counter = parse_env("IPN_MISS_COUNTER", defaults.miss_counter);
        let use_x_forwarded_for = env_flag("IPN_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("IPN_USE_FORWARDED", false);
        Self {
            host,
            port,
            database_url,
            verify_url,
            verify_timeout,
            cache_prefix,
            miss_threshold,
            miss_window,
            tolerate_purchase_misses,
            miss_counter,
            use_x_forwarded_for,
            use_forwarded,
        }
    }

    pub fn reconciliation_options(&self) -> ReconciliationOptions {
        ReconciliationOptions {
            cache_prefix: self.cache_prefix.clone(),
            miss_threshold: self.miss_threshold,
            tolerate_purchase_misses: self.tolerate_purchase_misses,
        }
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions::from_config(self)
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

/// Miss windows must be at least a day and at most [`MAX_MISS_WINDOW_DAYS`] long.
fn miss_window_from_days(days: i64) -> Duration {
    if (1..=MAX_MISS_WINDOW_DAYS).contains(&days) {
        Duration::days(days)
    } else {
        error!(
            "🪛️ {days} is not a valid value for IPN_MISS_WINDOW_DAYS. It must be between 1 and {MAX_MISS_WINDOW_DAYS}. \
             Using the default, {DEFAULT_MISS_WINDOW_DAYS}, instead."
        );
        Duration::days(DEFAULT_MISS_WINDOW_DAYS)
    }
}

impl Display for MissCounterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => write!(f, "database"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// A subset of the server configuration that route handlers can see
#[derive(Clone, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
