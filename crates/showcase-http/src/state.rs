//! Shared state for one session's HTTP server.

use std::sync::Arc;

use showcase_core::push::PushChannel;

use crate::assets::AssetCache;
use crate::template::render_shell;

/// State available to all handlers of one session's server.
pub struct SharedState {
    /// The session's push channel (content + subscribers).
    pub channel: Arc<PushChannel>,
    /// Process-wide asset cache.
    pub assets: Arc<AssetCache>,
    /// Pre-rendered render shell.
    pub shell: String,
}

impl SharedState {
    pub fn new(channel: Arc<PushChannel>, assets: Arc<AssetCache>, shell_title: &str) -> Self {
        Self {
            channel,
            assets,
            shell: render_shell(shell_title),
        }
    }
}
