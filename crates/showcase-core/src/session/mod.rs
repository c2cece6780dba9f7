//! Session management for display windows.
//!
//! A session is one window: a local content server, the render host pointed
//! at it, and the push channel that carries content updates.

mod manager;
mod state;

pub use manager::{SessionError, SessionManager};
pub use state::{Session, SessionId, SessionSnapshot};
