//! SessionManager - owns every display window and its resources.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use super::state::{Session, SessionId, SessionSnapshot};
use crate::content::ContentPayload;
use crate::lock;
use crate::push::{PushChannel, Subscription};
use crate::render_host::{HostExit, RenderHostLauncher};
use crate::server::{ContentServer, ServerStartError};

type Registry = Arc<Mutex<HashMap<SessionId, Session>>>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to start content server: {0}")]
    ServerStart(#[from] ServerStartError),
}

/// Maps session ids to live display windows.
///
/// The registry starts empty and is drained by [`SessionManager::shutdown`]
/// (or on drop). Updates to a live session never start a new server or
/// process; everything else creates a fresh session.
pub struct SessionManager {
    sessions: Registry,
    server: Arc<dyn ContentServer>,
    launcher: RenderHostLauncher,
}

impl SessionManager {
    pub fn new(server: Arc<dyn ContentServer>, launcher: RenderHostLauncher) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            server,
            launcher,
        }
    }

    /// Show `payload`, reusing the window for `session_id` when it is alive.
    ///
    /// Returns the id of the window now showing the payload: the given id if
    /// the session was live, otherwise a freshly minted one. Only a server
    /// bind failure is reported as an error; a render host that fails to
    /// launch leaves a server-only session behind and is logged.
    pub fn present(
        &self,
        payload: ContentPayload,
        session_id: Option<&SessionId>,
    ) -> Result<SessionId, SessionError> {
        if let Some(id) = session_id {
            // Liveness check and publish happen under the registry lock so a
            // concurrent teardown cannot slip in between.
            let stale = {
                let mut sessions = lock(&self.sessions);
                if let Some(session) = sessions.get(id) {
                    if session.is_alive() {
                        let delivered = session.channel.publish(payload);
                        log::debug!("Session {} updated ({} subscribers)", id, delivered);
                        return Ok(id.clone());
                    }
                }
                sessions.remove(id)
            };

            if let Some(stale) = stale {
                log::info!("Session {} is no longer live, replacing it", id);
                stale.release();
            }
        }

        self.create(payload)
    }

    fn create(&self, payload: ContentPayload) -> Result<SessionId, SessionError> {
        let id = SessionId::new();
        let title = payload.title.clone();
        let channel = Arc::new(PushChannel::with_content(payload));

        let server = self.server.start(Arc::clone(&channel))?;
        let url = server.url();
        log::info!("Session {} listening on {}", id, url);

        let mut session = Session::new(id.clone(), channel, server);
        let mut exit_rx = None;
        match crate::blocking(|| self.launcher.launch(&url, &title)) {
            Ok(mut host) => {
                exit_rx = host.take_exit_receiver();
                session.render_host = Some(host);
            }
            Err(e) => {
                log::warn!("Failed to launch window for session {}: {}", id, e);
                log::warn!("Please visit manually: {}", url);
            }
        }

        lock(&self.sessions).insert(id.clone(), session);

        // Hook the exit event only once the record is registered, so an
        // early exit still finds something to tear down.
        if let Some(exit_rx) = exit_rx {
            if let Some(hook) = self.hook_exit(id.clone(), exit_rx) {
                match lock(&self.sessions).get_mut(&id) {
                    Some(session) => session.exit_hook = Some(hook),
                    None => hook.abort(),
                }
            }
        }

        Ok(id)
    }

    fn hook_exit(&self, id: SessionId, exit_rx: oneshot::Receiver<HostExit>) -> Option<AbortHandle> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                log::debug!("No async runtime; session {} will not follow its window", id);
                return None;
            }
        };

        let sessions = Arc::clone(&self.sessions);
        let task = handle.spawn(async move {
            if let Ok(exit) = exit_rx.await {
                log::info!("Window for session {} closed (exit code {:?})", id, exit.code);
                teardown(&sessions, &id);
            }
        });
        Some(task.abort_handle())
    }

    /// Tear down one session. Returns `false` if it was not registered.
    pub fn teardown(&self, session_id: &SessionId) -> bool {
        teardown(&self.sessions, session_id)
    }

    /// Tear down every session. Returns how many were torn down.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<Session> = lock(&self.sessions).drain().map(|(_, s)| s).collect();
        let count = drained.len();
        for session in drained {
            session.release();
        }
        if count > 0 {
            log::info!("Shut down {} session(s)", count);
        }
        count
    }

    /// Attach a push-channel subscriber to a registered session.
    pub fn subscribe(&self, session_id: &SessionId) -> Option<Subscription> {
        let channel = lock(&self.sessions)
            .get(session_id)
            .map(|session| Arc::clone(&session.channel))?;
        Some(channel.subscribe())
    }

    /// Whether the session exists and its window is still running.
    pub fn is_alive(&self, session_id: &SessionId) -> bool {
        lock(&self.sessions)
            .get(session_id)
            .is_some_and(Session::is_alive)
    }

    pub fn snapshot(&self, session_id: &SessionId) -> Option<SessionSnapshot> {
        lock(&self.sessions).get(session_id).map(Session::snapshot)
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        lock(&self.sessions).contains_key(session_id)
    }

    /// List all registered session IDs.
    pub fn session_ids(&self) -> Vec<SessionId> {
        lock(&self.sessions).keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.sessions).is_empty()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Remove the record under the lock, then release it outside the lock.
///
/// Removal is the guard: whichever path removes the record runs the release
/// sequence, every later call is a no-op.
fn teardown(sessions: &Mutex<HashMap<SessionId, Session>>, session_id: &SessionId) -> bool {
    let removed = lock(sessions).remove(session_id);
    match removed {
        Some(session) => {
            session.release();
            true
        }
        None => false,
    }
}
