//! Server-sent events stream for live content updates.
//!
//! Clients connect to `/events` and immediately receive the session's current
//! content (if any) as a `content` event, followed by one event per update.
//! The stream ends when the session is torn down.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use showcase_core::push::PushEvent;

use crate::SharedState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Handler for GET /events
pub async fn events_handler(
    State(state): State<Arc<SharedState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Dropping the subscription (client gone, response dropped) unregisters it.
    let subscription = state.channel.subscribe();
    log::debug!("Push subscriber {} connected", subscription.id());

    let stream = subscription.map(|event| Ok(to_sse_event(&event)));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

fn to_sse_event(event: &PushEvent) -> Event {
    Event::default().event(event.name).data(event.data.as_ref())
}
