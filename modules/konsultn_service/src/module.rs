//! Module composition root and lifecycle

use crate::api::native::NativeClient;
use crate::config::Config;
use crate::contract::KonsultnApi;
use crate::domain::{IdentityProvider, Services};
use crate::infra::storage::schema::create_schema;
use anyhow::Result;
use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Konsultn service module
pub struct KonsultnModule {
    config: RwLock<Config>,
    services: RwLock<Option<Arc<Services>>>,
}

impl Default for KonsultnModule {
    fn default() -> Self {
        Self {
            config: RwLock::new(Config::default()),
            services: RwLock::new(None),
        }
    }
}

impl KonsultnModule {
    /// Wire the domain services over `db`. Calling it again rebuilds them
    /// with the new configuration.
    pub fn init(
        &self,
        config: Config,
        db: Arc<DatabaseConnection>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<()> {
        config.validate()?;
        let services = Arc::new(Services::new(db, identity, &config));
        *self.config.write() = config;
        *self.services.write() = Some(services);

        tracing::info!("Konsultn service initialized");
        Ok(())
    }

    /// Create any missing tables and indexes.
    pub async fn migrate(&self, db: &DatabaseConnection) -> Result<()> {
        create_schema(db).await?;
        tracing::info!("Konsultn service schema ready");
        Ok(())
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn services(&self) -> Result<Arc<Services>> {
        self.services
            .read()
            .as_ref()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }

    /// In-process client over the initialized services.
    pub fn client(&self) -> Result<Arc<dyn KonsultnApi>> {
        let client: Arc<dyn KonsultnApi> = Arc::new(NativeClient::new(self.services()?));
        Ok(client)
    }
}
