use crate::types::{AgentEvent, LoopState};

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events; a failing or absent subscriber
/// never propagates back into the agent loop.
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<AgentEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: AgentEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    /// Shorthand for the status transitions the loop publishes constantly.
    pub fn publish_status(&self, state: LoopState) {
        self.publish(AgentEvent::Status { state });
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AgentEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.publish(AgentEvent::Status {
            state: LoopState::Thinking,
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(AgentEvent::Thought {
            content: "hmm".into(),
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            AgentEvent::Thought {
                content: "hmm".into()
            }
        );
    }

    #[tokio::test]
    async fn test_publish_status_shorthand() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        bus.publish_status(LoopState::Done);
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            AgentEvent::Status {
                state: LoopState::Done
            }
        );
    }
}
