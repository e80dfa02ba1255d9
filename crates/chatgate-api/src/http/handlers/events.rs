//! Session event stream.
//!
//! GET /api/events
//!
//! Streams the connection event bus as Server-Sent Events. The first event
//! is always a `status` snapshot so a client can render without a separate
//! status request; session events follow under their own names
//! (`state_changed`, `qr_updated`, `pairing_code_issued`, ...).
//! A slow client that falls behind receives a `lagged` event with the number
//! of skipped events, then the stream continues.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::Stream;

use chatgate_types::event::SessionEvent;

use crate::http::extractors::auth::Authenticated;
use crate::state::AppState;

fn session_event(event: &SessionEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_default();
    Event::default().event(event.name()).data(data)
}

/// GET /api/events
pub async fn stream_events(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let observer = state.session.observer();
    // Subscribe before taking the snapshot so no transition falls in between.
    let mut events = observer.subscribe();
    let status = observer.status();

    let sse_stream = async_stream::stream! {
        let snapshot = serde_json::to_string(&status).unwrap_or_default();
        yield Ok::<_, Infallible>(Event::default().event("status").data(snapshot));

        loop {
            match events.recv().await {
                Ok(event) => yield Ok(session_event(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event stream client lagged");
                    let data = serde_json::json!({ "skipped": skipped });
                    yield Ok(Event::default().event("lagged").data(data.to_string()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
