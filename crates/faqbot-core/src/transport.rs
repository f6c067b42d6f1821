use async_trait::async_trait;

use crate::{
    domain::{Attachment, ContactId, InboundMessage},
    Result,
};

/// Events emitted by the chat transport, consumed by the agent loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    PairingCodeIssued { code: String },
    Authenticated,
    Ready,
    AuthFailure { reason: String },
    Disconnected { reason: String },
    Message(InboundMessage),
}

impl TransportEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportEvent::PairingCodeIssued { .. } => "pairing_code_issued",
            TransportEvent::Authenticated => "authenticated",
            TransportEvent::Ready => "ready",
            TransportEvent::AuthFailure { .. } => "auth_failure",
            TransportEvent::Disconnected { .. } => "disconnected",
            TransportEvent::Message(_) => "inbound_message",
        }
    }
}

/// Hexagonal port for the chat transport (pairing, delivery, media encoding).
///
/// Retry/backoff is the implementation's business; the agent treats every
/// `Err` as a final per-target failure.
#[async_trait]
pub trait TransportPort: Send + Sync {
    async fn send_text(&self, target: &ContactId, text: &str) -> Result<()>;

    async fn send_media(
        &self,
        target: &ContactId,
        attachment: &Attachment,
        caption: &str,
    ) -> Result<()>;

    async fn logout(&self) -> Result<()>;

    /// Tear down and start over; lifecycle events follow on the event channel.
    async fn reinitialize(&self) -> Result<()>;
}
