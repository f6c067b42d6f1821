//! Connection lifecycle state machine.
//!
//! Owns the single [`SessionState`] and the transport's lifecycle operations
//! (logout/reinitialize). Every stay in `Connected` gets its own
//! [`CancellationToken`]; leaving `Connected` cancels it, which stops any
//! send loop holding that token.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    bus::{BotEvent, EventBus},
    domain::SessionState,
    errors::Error,
    transport::{TransportEvent, TransportPort},
    Result,
};

/// Inputs to the state machine: transport lifecycle events plus operator requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    PairingCodeIssued { code: String },
    Authenticated,
    Ready,
    AuthFailure { reason: String },
    Disconnected { reason: String },
    LogoutRequested,
    RestartRequested,
}

impl LifecycleEvent {
    /// Lifecycle part of a transport event; inbound messages map to `None`.
    pub fn from_transport(ev: &TransportEvent) -> Option<Self> {
        Some(match ev {
            TransportEvent::PairingCodeIssued { code } => {
                LifecycleEvent::PairingCodeIssued { code: code.clone() }
            }
            TransportEvent::Authenticated => LifecycleEvent::Authenticated,
            TransportEvent::Ready => LifecycleEvent::Ready,
            TransportEvent::AuthFailure { reason } => LifecycleEvent::AuthFailure {
                reason: reason.clone(),
            },
            TransportEvent::Disconnected { reason } => LifecycleEvent::Disconnected {
                reason: reason.clone(),
            },
            TransportEvent::Message(_) => return None,
        })
    }

    fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::PairingCodeIssued { .. } => "pairing_code_issued",
            LifecycleEvent::Authenticated => "authenticated",
            LifecycleEvent::Ready => "ready",
            LifecycleEvent::AuthFailure { .. } => "auth_failure",
            LifecycleEvent::Disconnected { .. } => "disconnected",
            LifecycleEvent::LogoutRequested => "logout_requested",
            LifecycleEvent::RestartRequested => "restart_requested",
        }
    }
}

/// Transition table. `None` means the event is not valid in `current`.
pub fn next_state(current: SessionState, event: &LifecycleEvent) -> Option<SessionState> {
    use SessionState::*;

    match (current, event) {
        (_, LifecycleEvent::AuthFailure { .. }) => Some(AuthFailed),
        (_, LifecycleEvent::Disconnected { .. }) => Some(Disconnected),
        (_, LifecycleEvent::RestartRequested) => Some(Disconnected),

        // Codes rotate while waiting for a scan, so re-issue stays put.
        (
            Disconnected | PairingRequested | AuthFailed | LoggedOut,
            LifecycleEvent::PairingCodeIssued { .. },
        ) => Some(PairingRequested),

        // Restored credentials skip pairing entirely.
        (Disconnected | PairingRequested, LifecycleEvent::Authenticated) => Some(Authenticated),
        (Authenticated, LifecycleEvent::Ready) => Some(Connected),
        (Connected, LifecycleEvent::LogoutRequested) => Some(LoggedOut),

        _ => None,
    }
}

/// Result of an applied event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
}

impl Transition {
    /// True when this transition started a new connection.
    pub fn entered_connected(&self) -> bool {
        self.from != SessionState::Connected && self.to == SessionState::Connected
    }
}

#[derive(Debug, Default)]
struct LifecycleState {
    state: SessionState,
    pairing_code: Option<String>,
    connection: Option<CancellationToken>,
}

pub struct SessionLifecycle {
    transport: Arc<dyn TransportPort>,
    bus: EventBus,
    inner: Mutex<LifecycleState>,
}

impl SessionLifecycle {
    pub fn new(transport: Arc<dyn TransportPort>, bus: EventBus) -> Self {
        Self {
            transport,
            bus,
            inner: Mutex::new(LifecycleState::default()),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == SessionState::Connected
    }

    /// Latest pairing code, kept until authentication succeeds.
    pub async fn pairing_code(&self) -> Option<String> {
        self.inner.lock().await.pairing_code.clone()
    }

    /// Token of the current connection, `None` unless `Connected`.
    pub async fn connection_token(&self) -> Option<CancellationToken> {
        self.inner.lock().await.connection.clone()
    }

    /// Feed one event through the table.
    ///
    /// Events the table rejects are ignored. Self-transitions are applied
    /// silently (no `session-state-changed`).
    pub async fn apply(&self, event: LifecycleEvent) -> Option<Transition> {
        let mut st = self.inner.lock().await;
        let from = st.state;

        let Some(to) = next_state(from, &event) else {
            tracing::debug!(state = %from, event = event.name(), "ignoring lifecycle event");
            return None;
        };

        match &event {
            LifecycleEvent::PairingCodeIssued { code } => {
                st.pairing_code = Some(code.clone());
                self.bus
                    .publish(BotEvent::PairingCodeIssued { code: code.clone() });
            }
            LifecycleEvent::Authenticated | LifecycleEvent::Ready => {
                st.pairing_code = None;
            }
            LifecycleEvent::AuthFailure { reason } => {
                tracing::warn!("transport authentication failed: {reason}");
            }
            LifecycleEvent::Disconnected { reason } => {
                tracing::info!("transport disconnected: {reason}");
            }
            LifecycleEvent::LogoutRequested | LifecycleEvent::RestartRequested => {}
        }

        if from == SessionState::Connected && to != SessionState::Connected {
            if let Some(token) = st.connection.take() {
                token.cancel();
            }
        }
        if from != SessionState::Connected && to == SessionState::Connected {
            st.connection = Some(CancellationToken::new());
        }

        st.state = to;
        if from != to {
            tracing::info!(from = %from, to = %to, "session state changed");
            self.bus.publish(BotEvent::SessionStateChanged { from, to });
        }

        Some(Transition { from, to })
    }

    /// Log the transport out. Only valid while connected.
    pub async fn logout(&self) -> Result<()> {
        if !self.is_connected().await {
            tracing::warn!("logout requested while not connected");
            return Err(Error::NotConnected);
        }

        self.transport.logout().await?;
        self.apply(LifecycleEvent::LogoutRequested).await;
        Ok(())
    }

    /// Force `Disconnected` (aborting in-flight sends) and reinitialize the transport.
    pub async fn restart(&self) -> Result<()> {
        self.apply(LifecycleEvent::RestartRequested).await;

        if let Err(e) = self.transport.reinitialize().await {
            tracing::error!("transport reinitialize failed: {e}");
            self.bus.publish(BotEvent::FatalError {
                message: e.to_string(),
            });
            return Err(e);
        }
        Ok(())
    }
}
