//! Local content server for Showcase windows.
//!
//! Every session gets its own axum server bound to an ephemeral port on the
//! loopback interface. It serves the render shell, the presentation assets
//! and the `/events` push stream for that session only.

pub mod assets;
mod events;
mod routes;
mod state;
pub mod template;

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use showcase_core::push::PushChannel;
use showcase_core::server::{ContentServer, ServerHandle, ServerStartError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub use assets::{Asset, AssetCache};
pub use routes::router;
pub use state::SharedState;

/// Title of the render shell document.
pub const DEFAULT_SHELL_TITLE: &str = "Showcase MCP";

/// Configuration shared by every session server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind; port 0 lets the OS choose
    pub bind_addr: SocketAddr,
    /// Title of the render shell document
    pub shell_title: String,
    /// Directory holding bundle.js, styles.css and mermaid.min.js
    pub assets_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            shell_title: DEFAULT_SHELL_TITLE.to_string(),
            assets_dir: PathBuf::from("assets"),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }
}

/// Starts one axum server per session, all sharing one asset cache.
pub struct LocalContentServer {
    config: ServerConfig,
    assets: Arc<AssetCache>,
}

impl LocalContentServer {
    pub fn new(config: ServerConfig) -> Self {
        let assets = Arc::new(AssetCache::new(config.assets_dir.clone()));
        Self { config, assets }
    }
}

impl ContentServer for LocalContentServer {
    /// Bind synchronously so the port is known (or the failure reported)
    /// before returning, then serve on the current Tokio runtime.
    fn start(&self, channel: Arc<PushChannel>) -> Result<Box<dyn ServerHandle>, ServerStartError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ServerStartError::NoRuntime)?;

        let addr = self.config.bind_addr;
        let bind_error = |source: std::io::Error| ServerStartError::Bind { addr, source };

        let std_listener = std::net::TcpListener::bind(addr).map_err(bind_error)?;
        std_listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = std_listener.local_addr().map_err(bind_error)?;
        let listener = tokio::net::TcpListener::from_std(std_listener).map_err(bind_error)?;

        let state = Arc::new(SharedState::new(
            channel,
            Arc::clone(&self.assets),
            &self.config.shell_title,
        ));
        let app = router(state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = runtime.spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_rx.await.ok();
                    log::debug!("HTTP server on {} shutting down", local_addr);
                })
                .await;
            if let Err(e) = result {
                log::warn!("HTTP server on {} failed: {}", local_addr, e);
            }
        });

        log::info!("HTTP server listening on http://{}", local_addr);

        Ok(Box::new(HttpServerHandle {
            addr: local_addr,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }))
    }
}

/// Handle to a running session server.
pub struct HttpServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ServerHandle for HttpServerHandle {
    fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop the server gracefully. The listener closes right away; open
    /// connections finish on their own once their streams end.
    fn close(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Detach; the serve task exits after the graceful shutdown completes.
        self.task.take();
    }
}

impl Drop for HttpServerHandle {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use showcase_core::content::ContentPayload;
    use std::time::Duration;

    #[test]
    fn default_config_binds_loopback_ephemeral() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:0".parse().unwrap());
        assert_eq!(config.shell_title, DEFAULT_SHELL_TITLE);
    }

    #[test]
    fn start_without_runtime_fails() {
        let server = LocalContentServer::new(ServerConfig::default());
        let err = server.start(Arc::new(PushChannel::new())).err().unwrap();
        assert!(matches!(err, ServerStartError::NoRuntime));
    }

    #[tokio::test]
    async fn start_reports_ephemeral_port() {
        let server = LocalContentServer::new(ServerConfig::default());
        let mut handle = server
            .start(Arc::new(PushChannel::with_content(ContentPayload::new("T"))))
            .unwrap();

        let addr = handle.local_addr();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
        assert_eq!(handle.url(), format!("http://{}", addr));

        handle.close();
        handle.close();
    }

    #[tokio::test]
    async fn bind_conflict_fails() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();
        let server = LocalContentServer::new(ServerConfig::default().bind_addr(addr));

        let err = server.start(Arc::new(PushChannel::new())).err().unwrap();
        assert!(matches!(err, ServerStartError::Bind { addr: a, .. } if a == addr));
    }

    #[tokio::test]
    async fn close_releases_port() {
        let server = LocalContentServer::new(ServerConfig::default());
        let mut handle = server.start(Arc::new(PushChannel::new())).unwrap();
        let addr = handle.local_addr();

        handle.close();

        // The serve loop drops the listener once it sees the shutdown signal.
        for _ in 0..100 {
            if tokio::net::TcpListener::bind(addr).await.is_ok() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("port {} was never released", addr.port());
    }
}
