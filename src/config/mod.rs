use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub discovery: DiscoveryConfig,
    pub adaptation: AdaptationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port).parse().unwrap()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Fallback share of the feed drawn from outside the preferred themes,
    /// used when the user has no interest mode.
    pub exploration_ratio: f64,
    /// How many high-affinity themes are promoted into the preferred set.
    pub promote_top_themes: usize,
    /// Window that defines "recent" affinity for theme promotion.
    pub recent_window_days: i64,
    pub nearby_km: f64,
    pub medium_km: f64,
    /// Museums with fewer total interactions than this qualify as hidden gems.
    pub hidden_gem_max_interactions: usize,
    pub similar_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationConfig {
    pub baseline_max_results: usize,
    pub short_visit_max_results: usize,
    /// Visits at or below this many minutes trigger the time rule.
    pub short_visit_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: num_cpus::get(),
            },
            database: DatabaseConfig {
                url: "sqlite://musea.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            discovery: DiscoveryConfig {
                exploration_ratio: 0.2,
                promote_top_themes: 2,
                recent_window_days: 30,
                nearby_km: 20.0,
                medium_km: 50.0,
                hidden_gem_max_interactions: 10,
                similar_results: 3,
            },
            adaptation: AdaptationConfig {
                baseline_max_results: 12,
                short_visit_max_results: 3,
                short_visit_minutes: 15,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("MUSEA"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
