//! Web server for LANSHARE.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::{ServerConfig, WebConfig};
use crate::file::{spawn_sweeper, FileStorage, Sweeper};
use crate::{Database, LanshareError, Result};

use super::handlers::AppState;
use super::router::create_app;

/// Web server for the file sharing service.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Web configuration.
    web_config: WebConfig,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(
        server_config: &ServerConfig,
        web_config: &WebConfig,
        db: Arc<Database>,
        storage: FileStorage,
    ) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", server_config.host, server_config.port)
            .parse()
            .map_err(|e| {
                LanshareError::Config(format!(
                    "invalid server address {}:{}: {e}",
                    server_config.host, server_config.port
                ))
            })?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(db, storage)),
            web_config: web_config.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn bind(self) -> std::io::Result<(TcpListener, axum::Router)> {
        let sweeper = Sweeper::new(self.app_state.db.clone(), self.app_state.storage.clone());
        let router = create_app(self.app_state, &self.web_config.cors_origins);

        let listener = TcpListener::bind(self.addr).await?;

        // Start the sweeper only after a successful bind
        spawn_sweeper(sweeper);

        Ok((listener, router))
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// Useful for tests binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
