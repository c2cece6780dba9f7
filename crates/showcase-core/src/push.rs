//! Per-session push channel.
//!
//! A [`PushChannel`] fans content updates out to every open subscriber of one
//! session and remembers the last payload so late joiners can be brought up
//! to date (replay-on-connect).
//!
//! # Example
//!
//! ```rust
//! use showcase_core::content::ContentPayload;
//! use showcase_core::push::PushChannel;
//! use std::sync::Arc;
//!
//! let channel = Arc::new(PushChannel::new());
//! channel.publish(ContentPayload::new("Hello"));
//!
//! // A subscriber attached after the publish still sees the content.
//! let mut subscription = channel.subscribe();
//! let event = subscription.try_recv().unwrap();
//! assert_eq!(event.name, "content");
//! ```

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::content::ContentPayload;
use crate::lock;

/// Event name used for content updates.
pub const CONTENT_EVENT: &str = "content";

/// A named event with a pre-serialized string payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    /// Event name (e.g. "content").
    pub name: &'static str,

    /// JSON payload, shared between all subscribers of one broadcast.
    pub data: Arc<str>,
}

/// Token identifying one subscriber within a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ChannelState {
    content: Option<ContentPayload>,
    subscribers: HashMap<SubscriberId, mpsc::UnboundedSender<PushEvent>>,
    closed: bool,
}

/// Fan-out channel for one session.
///
/// All mutation happens under a single lock, so a subscriber's replay event
/// is always queued before any broadcast that follows its registration, and
/// events for one subscriber are never reordered.
pub struct PushChannel {
    state: Mutex<ChannelState>,
    // Monotonic, so ids stay unique even after removals.
    next_subscriber: AtomicU64,
}

impl PushChannel {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChannelState {
                content: None,
                subscribers: HashMap::new(),
                closed: false,
            }),
            next_subscriber: AtomicU64::new(1),
        }
    }

    /// Create a channel that already holds `content`.
    pub fn with_content(content: ContentPayload) -> Self {
        let channel = Self::new();
        lock(&channel.state).content = Some(content);
        channel
    }

    /// Replace the stored content and broadcast it to every subscriber.
    ///
    /// The payload is serialized once. Subscribers whose receiving side is
    /// gone are dropped from the set. Returns the number of subscribers that
    /// received the event.
    pub fn publish(&self, content: ContentPayload) -> usize {
        let mut state = lock(&self.state);
        let data = serialize(&content);
        state.content = Some(content);

        let Some(data) = data else {
            return 0;
        };
        let event = PushEvent {
            name: CONTENT_EVENT,
            data,
        };

        let mut delivered = 0;
        state.subscribers.retain(|id, sender| {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                log::debug!("Dropping subscriber {} after failed send", id);
                false
            }
        });
        delivered
    }

    /// Attach a new subscriber.
    ///
    /// If content has already been published, it is queued to this subscriber
    /// only. Subscribing to a closed channel yields a subscription whose
    /// stream ends immediately.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut state = lock(&self.state);
        if !state.closed {
            if let Some(data) = state.content.as_ref().and_then(serialize) {
                let _ = sender.send(PushEvent {
                    name: CONTENT_EVENT,
                    data,
                });
            }
            state.subscribers.insert(id, sender);
        }

        Subscription {
            id,
            receiver,
            channel: Arc::downgrade(self),
        }
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        lock(&self.state).subscribers.remove(&id).is_some()
    }

    /// Close every subscriber and refuse new ones.
    ///
    /// Dropping the senders ends each subscriber's stream. Returns the number
    /// of subscribers that were closed; a second call returns 0.
    pub fn close(&self) -> usize {
        let mut state = lock(&self.state);
        state.closed = true;
        let closed = state.subscribers.len();
        state.subscribers.clear();
        closed
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// The last published content, if any.
    pub fn content(&self) -> Option<ContentPayload> {
        lock(&self.state).content.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }
}

impl Default for PushChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize(content: &ContentPayload) -> Option<Arc<str>> {
    match serde_json::to_string(content) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            log::warn!("Failed to serialize content payload: {}", e);
            None
        }
    }
}

/// Receiving end of one subscriber.
///
/// Implements [`Stream`] so the HTTP layer can turn it into an SSE response.
/// Dropping it unregisters the subscriber from its channel.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<PushEvent>,
    channel: Weak<PushChannel>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event. Returns `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.receiver.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<PushEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = PushEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.upgrade() {
            channel.unsubscribe(self.id);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
