use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Normalized contact identifier: digits only, country code first, no separators.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(String);

impl ContactId {
    /// Strip every non-digit character. Returns `None` when nothing is left.
    pub fn normalize(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            None
        } else {
            Some(Self(digits))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection lifecycle state. Exactly one instance lives in [`crate::session::SessionLifecycle`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Disconnected,
    PairingRequested,
    Authenticated,
    Connected,
    AuthFailed,
    LoggedOut,
}

impl SessionState {
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::PairingRequested => "pairing_requested",
            SessionState::Authenticated => "authenticated",
            SessionState::Connected => "connected",
            SessionState::AuthFailed => "auth_failed",
            SessionState::LoggedOut => "logged_out",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Media handed to the transport for encoding; the core never reads the bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub path: PathBuf,
}

/// A text message delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: String,
    pub text: String,
    pub display_name: Option<String>,
    /// Set by transports that echo the agent's own messages back.
    pub from_self: bool,
}

/// Inbound text no tier could answer. Kept in memory for statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrecognizedQuery {
    pub timestamp: String,
    pub user: String,
    pub query: String,
}

/// Per-recipient result of a broadcast or welcome send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastOutcome {
    pub target: ContactId,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BroadcastOutcome {
    pub fn success(target: ContactId) -> Self {
        Self {
            target,
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(target: ContactId, error: impl Into<String>) -> Self {
        Self {
            target,
            succeeded: false,
            error: Some(error.into()),
        }
    }
}
