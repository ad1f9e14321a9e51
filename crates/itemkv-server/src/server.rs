use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use itemkv_repo::ItemRepository;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::auth::ApiKeyAuth;
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::AppState;
use crate::router::{build_router, HttpLimits};

/// itemkv HTTP server.
pub struct ItemServer {
    config: ServerConfig,
    repo: ItemRepository,
}

impl ItemServer {
    pub fn new(config: ServerConfig, repo: ItemRepository) -> Self {
        Self { config, repo }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        let auth = Arc::new(ApiKeyAuth::from_config(&self.config));
        build_router(
            AppState::new(self.repo.clone(), auth),
            HttpLimits::from_config(&self.config),
        )
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `signal` resolves, then drain open connections for at
    /// most `shutdown_grace_secs` before dropping them.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.repo.ping().await?;
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "itemkv server listening");

        let stopping = Arc::new(Notify::new());
        let notify = Arc::clone(&stopping);
        let server = axum::serve(listener, self.router()).with_graceful_shutdown(async move {
            signal.await;
            tracing::info!("server is shutting down");
            notify.notify_one();
        });
        let grace = Duration::from_secs(self.config.shutdown_grace_secs);

        tokio::select! {
            result = server.into_future() => result?,
            _ = async {
                stopping.notified().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "shutdown grace period elapsed, dropping open connections"
                );
            }
        }
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
