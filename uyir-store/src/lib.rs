pub mod app_config;
pub mod database;
pub mod memory;
pub mod osrm;
pub mod seed;

pub use app_config::Config;
pub use database::PgStore;
pub use memory::MemoryStore;
pub use osrm::OsrmClient;
pub use seed::{seed_demo_data, SeedSummary};

use std::sync::Arc;
use tracing::info;
use uyir_core::repository::{RecordStore, StoreError, StoreResult};

use app_config::{StoreBackend, StoreConfig};

/// Opens the configured backend, running migrations for Postgres and loading
/// demo data when asked.
pub async fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory record store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| StoreError::Database("store.database_url is not set".to_string()))?;
            let pg = PgStore::connect(url)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
            pg.migrate()
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
            info!("Connected to Postgres record store");
            Arc::new(pg)
        }
    };

    if config.seed_demo_data {
        if store.list_vehicles().await?.is_empty() {
            seed_demo_data(store.as_ref()).await?;
        } else {
            info!("Fleet already present, skipping demo seed");
        }
    }

    Ok(store)
}
