//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::auth::hash_password;
use crate::config::{Profile, ServiceConfig, StorageConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::jobs::{JobDispatcher, JobWorker};
use crate::storage::{InMemoryStorage, PostgresStorage, Storage, UserStorage};
use nodebase_core::{JobEvent, User};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

const DEMO_EMAIL: &str = "demo@nodebase.dev";
const DEMO_PASSWORD: &str = "nodebase-dev";

/// Nodebase daemon server
pub struct Server {
    config: ServiceConfig,
    storage: Arc<dyn Storage>,
    dispatcher: JobDispatcher,
    queue_rx: mpsc::UnboundedReceiver<JobEvent>,
}

impl Server {
    /// Create a new server with the given configuration
    pub async fn new(config: ServiceConfig) -> ServiceResult<Self> {
        let storage: Arc<dyn Storage> = match &config.storage {
            StorageConfig::Memory => Arc::new(InMemoryStorage::new()),
            StorageConfig::Postgres {
                url,
                max_connections,
                connect_timeout_secs,
            } => Arc::new(PostgresStorage::new(url, *max_connections, *connect_timeout_secs).await?),
        };

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let dispatcher = JobDispatcher::new(storage.clone(), queue_tx);

        let server = Self {
            config,
            storage,
            dispatcher,
            queue_rx,
        };

        if server.config.profile == Profile::Development {
            server.seed_demo_user().await?;
        }

        Ok(server)
    }

    /// Run the server until shutdown, then drain the job queue.
    pub async fn run(self) -> ServiceResult<()> {
        let Self {
            config,
            storage,
            dispatcher,
            queue_rx,
        } = self;

        let state = AppState::new(
            storage.clone(),
            dispatcher.clone(),
            config.ai.backends.clone(),
            config.auth.session_ttl_hours,
        );

        let http = nodebase_adapters::http_client()
            .map_err(|e| ServiceError::Server(e.to_string()))?;
        let worker = JobWorker::new(storage, config.ai.backends.clone(), http);
        let worker_handle = tokio::spawn(worker.run(queue_rx));

        let app = create_router(state, config.server.enable_cors);

        let listener = TcpListener::bind(config.server.listen_addr).await?;
        tracing::info!("nodebase daemon listening on {}", config.server.listen_addr);
        tracing::info!("profile: {:?}", config.profile);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServiceError::Server(e.to_string()))?;

        tracing::info!("nodebase daemon shutting down");

        // Closing the last dispatcher handle ends the worker's queue; it
        // drains whatever was already enqueued before exiting.
        drop(dispatcher);
        if let Err(error) = worker_handle.await {
            tracing::warn!(%error, "job worker did not stop cleanly");
        }

        Ok(())
    }

    /// Development-only: make the entitled surface drivable out of the box.
    async fn seed_demo_user(&self) -> ServiceResult<()> {
        if self.storage.count_users().await? > 0 {
            return Ok(());
        }

        let hash = hash_password(DEMO_PASSWORD)
            .map_err(|e| ServiceError::Config(format!("seed user: {}", e)))?;
        let mut user = User::new(DEMO_EMAIL, hash);
        user.entitled = true;
        self.storage.insert_user(user).await?;

        tracing::info!(
            email = DEMO_EMAIL,
            password = DEMO_PASSWORD,
            "seeded entitled demo user"
        );
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn development_server_seeds_one_entitled_user() {
        let server = Server::new(ServiceConfig::development()).await.unwrap();
        assert_eq!(server.storage.count_users().await.unwrap(), 1);

        let demo = server
            .storage
            .get_user_by_email(DEMO_EMAIL)
            .await
            .unwrap()
            .unwrap();
        assert!(demo.entitled);
    }

    #[tokio::test]
    async fn seeding_is_skipped_when_users_exist() {
        let server = Server::new(ServiceConfig::development()).await.unwrap();
        // second pass must not duplicate the seed
        server.seed_demo_user().await.unwrap();
        assert_eq!(server.storage.count_users().await.unwrap(), 1);
    }
}
