use crate::api;
use crate::application::{Marketplace, MarketplaceStore};
use crate::config::{Settings, StorageBackend};
use crate::infrastructure::log_messages::application as messages;
use crate::infrastructure::{Database, InMemoryStore, PostgresStore};
use crate::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

/// Main application struct that coordinates all components
pub struct Application {
    settings: Settings,
    market: Marketplace,
}

impl Application {
    /// Load settings from the environment and open the configured store
    pub async fn new() -> Result<Self> {
        Self::with_settings(Settings::new()?).await
    }

    #[instrument(skip(settings), fields(backend = ?settings.database.backend))]
    pub async fn with_settings(settings: Settings) -> Result<Self> {
        let store: Arc<dyn MarketplaceStore> = match settings.database.backend {
            StorageBackend::Postgres => {
                info!(host = %settings.database.host, "{}", messages::CONNECTING_TO_DATABASE);
                let db = Database::connect(&settings.database, &settings.database_url()).await?;
                if settings.database.run_migrations {
                    db.migrate().await?;
                }
                Arc::new(PostgresStore::new(db))
            }
            StorageBackend::Memory => {
                warn!("{}", messages::USING_MEMORY_STORE);
                Arc::new(InMemoryStore::new())
            }
        };

        let market = Marketplace::new(store, settings.marketplace.clone());
        Ok(Self { settings, market })
    }

    /// Serve HTTP until a shutdown signal arrives
    #[instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        let address = self.settings.bind_address();
        info!(address = %address, "{}", messages::STARTING_SERVER);

        let listener = TcpListener::bind(&address).await?;
        let app = api::router(self.market, &self.settings.http);

        info!("{}", messages::STARTED_SUCCESSFULLY);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn marketplace(&self) -> &Marketplace {
        &self.market
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("{}", messages::SHUTTING_DOWN);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ApplicationSettings, DatabaseSettings, HttpSettings, LogFormat, LoggingSettings,
        MarketplaceSettings,
    };

    fn settings(backend: StorageBackend) -> Settings {
        Settings {
            application: ApplicationSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: "test".to_string(),
            },
            database: DatabaseSettings {
                backend,
                host: "localhost".to_string(),
                port: 5432,
                username: "postgres".to_string(),
                password: "password".to_string(),
                database_name: "farm_market_test".to_string(),
                max_connections: 2,
                run_migrations: true,
            },
            http: HttpSettings {
                body_limit_bytes: 1_048_576,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
            marketplace: MarketplaceSettings {
                low_stock_threshold: 5,
                default_page_size: 20,
                max_page_size: 100,
            },
        }
    }

    #[tokio::test]
    async fn test_memory_backend_needs_no_database() {
        let app = Application::with_settings(settings(StorageBackend::Memory))
            .await
            .unwrap();
        assert!(app.marketplace().health_check().await.is_ok());
        assert_eq!(app.settings().application.environment, "test");
    }

    #[tokio::test]
    #[ignore = "requires database connection"]
    async fn test_application_can_be_created() {
        let app = Application::with_settings(settings(StorageBackend::Postgres))
            .await
            .expect("Failed to create application");
        assert!(app.marketplace().health_check().await.is_ok());
    }
}
