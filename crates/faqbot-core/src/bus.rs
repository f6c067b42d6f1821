//! Event bus for publishing agent activity to the façade.
//!
//! Only the bus knows its subscribers. Components publish through a cloned
//! [`EventBus`] handle; consumers call [`EventBus::subscribe`].

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::{BroadcastOutcome, ContactId, SessionState, UnrecognizedQuery};

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "topic", rename_all = "kebab-case")]
pub enum BotEvent {
    SessionStateChanged {
        from: SessionState,
        to: SessionState,
    },
    PairingCodeIssued {
        code: String,
    },
    MessageReceived {
        from: ContactId,
        name: String,
        message: String,
        timestamp: String,
    },
    MessageSent {
        to: ContactId,
        message: String,
        timestamp: String,
    },
    ReplyFailed {
        to: ContactId,
        error: String,
        timestamp: String,
    },
    UnrecognizedQuery(UnrecognizedQuery),
    UnauthorizedMessage {
        from: String,
    },
    ContactAuthorized {
        contact: ContactId,
    },
    ContactRemoved {
        contact: ContactId,
    },
    WelcomeSent {
        contact: ContactId,
    },
    BroadcastOutcome(BroadcastOutcome),
    FatalError {
        message: String,
    },
}

impl BotEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            BotEvent::SessionStateChanged { .. } => "session-state-changed",
            BotEvent::PairingCodeIssued { .. } => "pairing-code-issued",
            BotEvent::MessageReceived { .. } => "message-received",
            BotEvent::MessageSent { .. } => "message-sent",
            BotEvent::ReplyFailed { .. } => "reply-failed",
            BotEvent::UnrecognizedQuery(_) => "unrecognized-query",
            BotEvent::UnauthorizedMessage { .. } => "unauthorized-message",
            BotEvent::ContactAuthorized { .. } => "contact-authorized",
            BotEvent::ContactRemoved { .. } => "contact-removed",
            BotEvent::WelcomeSent { .. } => "welcome-sent",
            BotEvent::BroadcastOutcome(_) => "broadcast-outcome",
            BotEvent::FatalError { .. } => "fatal-error",
        }
    }
}

/// Broadcast-channel fan-out. Clones share the same channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<BotEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to every current subscriber. Returns how many received it.
    pub fn publish(&self, event: BotEvent) -> usize {
        let topic = event.topic();
        match self.sender.send(Arc::new(event)) {
            Ok(n) => {
                tracing::trace!(topic, receivers = n, "event published");
                n
            }
            // No receivers - this is fine
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<BotEvent>>,
}

impl EventReceiver {
    /// Next event, or `None` once the bus is gone. Lagging drops events with a warning.
    pub async fn recv(&mut self) -> Option<Arc<BotEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(ev) => return Some(ev),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event receiver lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`EventReceiver::recv`].
    pub fn try_recv(&mut self) -> Option<Arc<BotEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(ev) => return Some(ev),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event receiver lagged, events dropped");
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain whatever is buffered right now.
    pub fn drain(&mut self) -> Vec<Arc<BotEvent>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(BotEvent::FatalError { message: "x".into() }), 0);
    }

    #[tokio::test]
    async fn every_subscriber_sees_events_in_order() {
        let bus = EventBus::with_capacity(8);
        let mut a = bus.subscribe();
        let mut b = bus.clone().subscribe();

        assert_eq!(bus.publish(BotEvent::PairingCodeIssued { code: "1".into() }), 2);
        bus.publish(BotEvent::PairingCodeIssued { code: "2".into() });

        for rx in [&mut a, &mut b] {
            let topics: Vec<_> = rx.drain().iter().map(|e| e.topic()).collect();
            assert_eq!(topics, vec!["pairing-code-issued", "pairing-code-issued"]);
        }
    }

    #[test]
    fn lagging_receiver_skips_to_newest() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.publish(BotEvent::PairingCodeIssued { code: i.to_string() });
        }
        let got = rx.drain();
        assert_eq!(got.len(), 2);
        assert_eq!(
            *got[1],
            BotEvent::PairingCodeIssued { code: "4".into() }
        );
    }

    #[test]
    fn events_serialize_with_topic_tag() {
        let ev = BotEvent::ContactRemoved {
            contact: ContactId::normalize("57 1").unwrap(),
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["topic"], ev.topic());
        assert_eq!(v["contact"], "571");

        let ev = BotEvent::BroadcastOutcome(BroadcastOutcome::failure(
            ContactId::normalize("9").unwrap(),
            "boom",
        ));
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["topic"], "broadcast-outcome");
        assert_eq!(v["succeeded"], false);
    }
}
