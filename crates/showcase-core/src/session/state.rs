//! Per-session state.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::content::ContentPayload;
use crate::push::PushChannel;
use crate::render_host::RenderHost;
use crate::server::ServerHandle;

/// Unique identifier for a session (the window id handed to callers).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One display window: its content server, render host and push channel.
pub struct Session {
    /// Unique session identifier
    pub id: SessionId,

    /// Content server bound for this session
    pub(crate) server: Option<Box<dyn ServerHandle>>,

    /// Render host showing the server's URL (absent if launch failed)
    pub(crate) render_host: Option<RenderHost>,

    /// Subscription to the render host's exit event
    pub(crate) exit_hook: Option<AbortHandle>,

    /// Last-delivered content and open subscribers
    pub(crate) channel: Arc<PushChannel>,
}

impl Session {
    pub fn new(id: SessionId, channel: Arc<PushChannel>, server: Box<dyn ServerHandle>) -> Self {
        Self {
            id,
            server: Some(server),
            render_host: None,
            exit_hook: None,
            channel,
        }
    }

    /// Whether the window is still visible: the render host exists and its
    /// process is running.
    pub fn is_alive(&self) -> bool {
        self.render_host
            .as_ref()
            .is_some_and(|host| host.is_running())
    }

    pub fn channel(&self) -> &Arc<PushChannel> {
        &self.channel
    }

    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|server| server.local_addr())
    }

    pub fn render_host_pid(&self) -> Option<u32> {
        self.render_host.as_ref().map(RenderHost::pid)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            server_addr: self.server_addr(),
            render_host_pid: self.render_host_pid(),
            alive: self.is_alive(),
            subscribers: self.channel.subscriber_count(),
            content: self.channel.content(),
        }
    }

    /// Release everything the session owns.
    ///
    /// Subscribers are closed first so no stream outlives the server it is
    /// written on. Every step is best effort.
    pub(crate) fn release(mut self) {
        let closed = self.channel.close();
        if let Some(hook) = self.exit_hook.take() {
            hook.abort();
        }
        if let Some(host) = self.render_host.take() {
            host.release();
        }
        if let Some(mut server) = self.server.take() {
            server.close();
        }
        log::info!("Session {} torn down ({} subscribers closed)", self.id, closed);
    }
}

/// Read-only view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub server_addr: Option<SocketAddr>,
    pub render_host_pid: Option<u32>,
    pub alive: bool,
    pub subscribers: usize,
    pub content: Option<ContentPayload>,
}
