use serde::Deserialize;
use std::env;
use std::time::Duration;
use uyir_catalog::FareConfig;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub fare: FareConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    #[serde(default)]
    pub seed_demo_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    /// OSRM base URL; without it every route uses the straight-line estimate
    pub osrm_base: Option<String>,
    pub timeout_ms: u64,
    pub fallback_speed_kmh: f64,
}

impl RoutingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            osrm_base: None,
            timeout_ms: 5_000,
            fallback_speed_kmh: 30.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    pub offer_ttl_seconds: u64,
    pub candidates: usize,
    /// Only offer ambulances of the booked class
    #[serde(default)]
    pub match_class: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            offer_ttl_seconds: 15,
            candidates: 5,
            match_class: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    pub channel_capacity: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { channel_capacity: 64 }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `UYIR__SERVER__PORT=9000` sets `server.port`
            .add_source(config::Environment::with_prefix("UYIR").prefix_separator("__").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
