//! Application context: one store, one coordinator and one gateway sharing a
//! single remote client.

use std::sync::Arc;

use fluxa_core::config::{Config, SyncConfig};
use fluxa_core::{EntityStore, MutationGateway, RemoteClient, SyncCoordinator, SyncService};
use fluxa_miniflux::MinifluxClient;

#[derive(Clone)]
pub struct App {
    pub store: EntityStore,
    pub coordinator: SyncCoordinator,
    pub gateway: MutationGateway,
}

impl App {
    pub fn new(remote: Arc<dyn RemoteClient>) -> Self {
        let store = EntityStore::new();
        let coordinator = SyncCoordinator::new(remote.clone(), store.clone());
        let gateway = MutationGateway::new(remote, coordinator.clone());
        Self {
            store,
            coordinator,
            gateway,
        }
    }

    /// Build the app against the Miniflux server named in `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = MinifluxClient::from_config(&config.server)?;
        tracing::info!(server = client.base_url(), "using miniflux server");
        Ok(Self::new(Arc::new(client)))
    }

    /// Background refresh service configured from `[sync]`.
    pub fn background_sync(&self, sync: &SyncConfig) -> SyncService {
        SyncService::new(self.coordinator.clone())
            .with_interval(sync.interval())
            .sync_on_start(sync.on_startup)
    }
}
