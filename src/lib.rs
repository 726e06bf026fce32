pub mod config;
pub mod models;
pub mod services;
pub mod algorithms;
pub mod utils;

pub use config::Config;
pub use models::*;

use anyhow::Result;
use services::discovery::DiscoveryService;
use services::store::{EventStore, SqliteStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn EventStore>,
    pub discovery_service: Arc<DiscoveryService>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        let sqlite = SqliteStore::new(&config).await?;
        sqlite.init_schema().await?;
        let store: Arc<dyn EventStore> = Arc::new(sqlite);

        Ok(Self::with_store(config, store))
    }

    /// Wire the services over any store implementation; tests and the
    /// seeder's dry run pass a `MemoryStore`.
    pub fn with_store(config: Arc<Config>, store: Arc<dyn EventStore>) -> Self {
        let discovery_service = Arc::new(DiscoveryService::new(store.clone(), config.clone()));

        Self {
            config,
            store,
            discovery_service,
        }
    }
}

pub async fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
