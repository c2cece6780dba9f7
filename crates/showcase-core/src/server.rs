//! Seam between the session manager and the HTTP layer that serves a session.
//!
//! The core crate stays framework-agnostic: it only needs something that can
//! bind a local listener for one session's [`PushChannel`] and later close it.
//! `showcase-http` provides the axum implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::push::PushChannel;

#[derive(Error, Debug)]
pub enum ServerStartError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("No async runtime available to run the server")]
    NoRuntime,
}

/// Starts one local content server per session.
pub trait ContentServer: Send + Sync {
    /// Bind a listener and start serving `channel`.
    ///
    /// Binding is atomic: on error no listener is left open.
    fn start(&self, channel: Arc<PushChannel>) -> Result<Box<dyn ServerHandle>, ServerStartError>;
}

/// A running content server.
pub trait ServerHandle: Send {
    /// Address the listener is bound to.
    fn local_addr(&self) -> SocketAddr;

    /// Base URL of the server.
    fn url(&self) -> String {
        format!("http://{}", self.local_addr())
    }

    /// Stop accepting connections. Best effort; repeated calls are no-ops.
    fn close(&mut self);
}
