use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::oracle::{ContentOracle, HttpOracle};
use crate::store::{DocumentStore, MemoryStore, MongoStore};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub oracle: Arc<dyn ContentOracle>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Mongo => {
                tracing::info!("Connecting to MongoDB database {}", config.mongo_database);
                Arc::new(MongoStore::connect(&config.mongo_uri, &config.mongo_database).await?)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };

        let oracle = Arc::new(HttpOracle::new(
            &config.ml_service_url,
            config.ml_timeout_seconds,
        )?);
        tracing::info!("ML service configured at {}", config.ml_service_url);

        Ok(Self::with_backends(config, store, oracle))
    }

    pub fn with_backends(
        config: Config,
        store: Arc<dyn DocumentStore>,
        oracle: Arc<dyn ContentOracle>,
    ) -> Self {
        Self {
            config,
            store,
            oracle,
        }
    }
}

pub mod auth_service;
pub mod progress_service;
pub mod quiz_service;
pub mod roadmap_service;
pub mod task_service;
pub mod tutor_service;
