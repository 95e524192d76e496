use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use carpool_core::events::{EventSink, SinkError};
use carpool_shared::BookingEvent;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::middleware::AuthUser;
use crate::state::AppState;

/// In-process fan-out of booking events to connected SSE clients.
#[derive(Clone)]
pub struct RealtimeHub {
    tx: broadcast::Sender<BookingEvent>,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventSink for RealtimeHub {
    async fn publish(&self, event: &BookingEvent) -> Result<(), SinkError> {
        // No subscribers is not an error; the event is simply dropped.
        if let Ok(receivers) = self.tx.send(event.clone()) {
            debug!(kind = event.kind.as_str(), receivers, "Event broadcast");
        }
        Ok(())
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/events/stream", get(stream_events))
}

async fn stream_events(
    State(state): State<AppState>,
    user: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = user.id;
    let stream = BroadcastStream::new(state.realtime.subscribe()).filter_map(move |msg| match msg {
        Ok(event) if event.user_id == user_id => {
            match Event::default().event(event.kind.as_str()).json_data(&event) {
                Ok(sse) => Some(Ok(sse)),
                Err(e) => {
                    warn!("Failed to encode event for SSE: {}", e);
                    None
                }
            }
        }
        Ok(_) => None,
        Err(e) => {
            warn!(user_id = %user_id, "SSE subscriber lagged: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carpool_shared::BookingEventKind;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_publish_reaches_subscribers_and_tolerates_none() {
        let hub = RealtimeHub::new(8);
        let event = BookingEvent::new(
            BookingEventKind::BookingCreated,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            1,
            "Gurgaon",
            "Noida",
            None,
        );

        hub.publish(&event).await.unwrap();

        let mut rx = hub.subscribe();
        hub.publish(&event).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.booking_id, event.booking_id);
    }
}
