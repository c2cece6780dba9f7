//! # showcase-core
//!
//! Window-session lifecycle for Showcase, the local display bridge.
//!
//! This crate is framework-agnostic and is used by:
//! - the HTTP layer (`showcase-http`), which serves each session's window
//! - the daemon (`showcase-daemon`), which exposes the `show` tool
//!
//! ## Key Concepts
//!
//! - **Session**: one display window, addressed by an opaque [`SessionId`]
//! - **Render host**: the external process that shows the window
//! - **Push channel**: per-session fan-out of content updates with
//!   replay-on-connect

pub mod content;
pub mod platform;
pub mod push;
pub mod render_host;
pub mod server;
pub mod session;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::runtime::{Handle, RuntimeFlavor};

// Re-export commonly used types
pub use content::ContentPayload;
pub use push::{PushChannel, PushEvent, Subscription};
pub use render_host::{RenderHostConfig, RenderHostError, RenderHostLauncher};
pub use server::{ContentServer, ServerHandle, ServerStartError};
pub use session::{SessionError, SessionId, SessionManager, SessionSnapshot};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run blocking work (process spawn and teardown, file I/O) without stalling
/// the other tasks of a multi-threaded runtime. Runs inline anywhere else.
pub(crate) fn blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}
