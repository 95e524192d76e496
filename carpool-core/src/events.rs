use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use carpool_shared::BookingEvent;
use tracing::warn;

pub type SinkError = Box<dyn Error + Send + Sync>;

/// Best-effort delivery of booking events to their recipient.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &BookingEvent) -> Result<(), SinkError>;
}

/// Publishes to every sink, even after one fails. Reports the last failure.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl EventSink for FanoutSink {
    async fn publish(&self, event: &BookingEvent) -> Result<(), SinkError> {
        let mut last_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(event).await {
                warn!("Event sink failed for {}: {}", event.kind.as_str(), e);
                last_err = Some(e);
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carpool_shared::BookingEventKind;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct Recording(Mutex<Vec<BookingEvent>>);

    #[async_trait]
    impl EventSink for Recording {
        async fn publish(&self, event: &BookingEvent) -> Result<(), SinkError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl EventSink for Broken {
        async fn publish(&self, _event: &BookingEvent) -> Result<(), SinkError> {
            Err("socket closed".into())
        }
    }

    #[tokio::test]
    async fn test_fanout_reaches_all_sinks_despite_failure() {
        let recording = Arc::new(Recording::default());
        let fanout = FanoutSink::new()
            .with(Arc::new(Broken))
            .with(recording.clone());

        let event = BookingEvent::new(
            BookingEventKind::BookingCreated,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            1,
            "A",
            "B",
            None,
        );

        assert!(fanout.publish(&event).await.is_err());
        assert_eq!(recording.0.lock().unwrap().len(), 1);
    }
}
