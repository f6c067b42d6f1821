//! Outbound sends: paced broadcasts, welcome sends and single replies.
//!
//! Every outbound message goes through [`BroadcastDispatcher::deliver`], so a
//! failed target never affects any other target. Paced runs (broadcasts and
//! welcomes) hold the in-flight lock for their whole duration; tokio's mutex is
//! fair, so later runs queue FIFO behind the current one.
//!
//! A paced run is bound to the connection token its caller captured. A run
//! whose connection closed while it was queued sends nothing, even if a newer
//! connection is up by the time it gets the lock.

use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    bus::{BotEvent, EventBus},
    clock::Clock,
    domain::{Attachment, BroadcastOutcome, ContactId},
    session::SessionLifecycle,
    transport::TransportPort,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunKind {
    Broadcast,
    Welcome,
}

impl RunKind {
    fn label(self) -> &'static str {
        match self {
            RunKind::Broadcast => "broadcast",
            RunKind::Welcome => "welcome",
        }
    }
}

pub struct BroadcastDispatcher {
    transport: Arc<dyn TransportPort>,
    session: Arc<SessionLifecycle>,
    clock: Arc<dyn Clock>,
    delay: Duration,
    bus: EventBus,
    in_flight: Mutex<()>,
}

impl BroadcastDispatcher {
    pub fn new(
        transport: Arc<dyn TransportPort>,
        session: Arc<SessionLifecycle>,
        clock: Arc<dyn Clock>,
        delay: Duration,
        bus: EventBus,
    ) -> Self {
        Self {
            transport,
            session,
            clock,
            delay,
            bus,
            in_flight: Mutex::new(()),
        }
    }

    /// Send `message` to each target in order, `delay` apart, on `connection`.
    ///
    /// Returns one outcome per target actually attempted. Empty when
    /// `connection` is `None` or already closed; shorter than `targets` when
    /// the connection drops mid-run.
    pub async fn broadcast(
        &self,
        connection: Option<CancellationToken>,
        message: &str,
        attachment: Option<&Attachment>,
        targets: &[ContactId],
    ) -> Vec<BroadcastOutcome> {
        self.paced(RunKind::Broadcast, connection, message, attachment, targets)
            .await
    }

    /// Welcome send: a broadcast that reports `welcome-sent` per delivered target.
    pub async fn welcome(
        &self,
        connection: Option<CancellationToken>,
        message: &str,
        attachment: Option<&Attachment>,
        targets: &[ContactId],
    ) -> Vec<BroadcastOutcome> {
        self.paced(RunKind::Welcome, connection, message, attachment, targets)
            .await
    }

    /// Single unpaced send, e.g. a reply. `None` when not connected.
    pub async fn send_reply(&self, target: &ContactId, text: &str) -> Option<BroadcastOutcome> {
        if !self.session.is_connected().await {
            tracing::warn!(target = %target, "not connected, reply dropped");
            return None;
        }
        Some(self.deliver(target, text, None).await)
    }

    /// Shared send primitive. Transport errors become a failed outcome.
    pub async fn deliver(
        &self,
        target: &ContactId,
        text: &str,
        attachment: Option<&Attachment>,
    ) -> BroadcastOutcome {
        let res = match attachment {
            Some(a) => self.transport.send_media(target, a, text).await,
            None => self.transport.send_text(target, text).await,
        };
        match res {
            Ok(()) => BroadcastOutcome::success(target.clone()),
            Err(e) => {
                tracing::warn!(target = %target, "send failed: {e}");
                BroadcastOutcome::failure(target.clone(), e.to_string())
            }
        }
    }

    async fn paced(
        &self,
        kind: RunKind,
        connection: Option<CancellationToken>,
        message: &str,
        attachment: Option<&Attachment>,
        targets: &[ContactId],
    ) -> Vec<BroadcastOutcome> {
        let Some(connection) = connection else {
            tracing::warn!(kind = kind.label(), "not connected, skipping send run");
            return Vec::new();
        };

        let _running = self.in_flight.lock().await;
        if connection.is_cancelled() {
            tracing::info!(
                kind = kind.label(),
                targets = targets.len(),
                "connection closed while queued, skipping send run"
            );
            return Vec::new();
        }

        let started = self.clock.now();

        tracing::info!(
            kind = kind.label(),
            targets = targets.len(),
            "starting send run"
        );

        let mut outcomes = Vec::with_capacity(targets.len());
        for (idx, target) in targets.iter().enumerate() {
            if idx > 0 && !self.wait_between(&connection).await {
                break;
            }
            if connection.is_cancelled() {
                break;
            }

            let outcome = self.deliver(target, message, attachment).await;
            match kind {
                RunKind::Broadcast => {
                    self.bus.publish(BotEvent::BroadcastOutcome(outcome.clone()));
                }
                RunKind::Welcome if outcome.succeeded => {
                    self.bus.publish(BotEvent::WelcomeSent {
                        contact: target.clone(),
                    });
                }
                RunKind::Welcome => {}
            }
            outcomes.push(outcome);
        }

        if outcomes.len() < targets.len() {
            tracing::info!(
                kind = kind.label(),
                sent = outcomes.len(),
                skipped = targets.len() - outcomes.len(),
                "send run aborted, connection closed"
            );
        } else {
            let failed = outcomes.iter().filter(|o| !o.succeeded).count();
            tracing::info!(
                kind = kind.label(),
                sent = outcomes.len() - failed,
                failed,
                elapsed_ms = (self.clock.now() - started).as_millis() as u64,
                "send run finished"
            );
        }
        outcomes
    }

    /// Pace between sends. False when the connection closed while waiting.
    async fn wait_between(&self, connection: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = connection.cancelled() => false,
            _ = self.clock.sleep(self.delay) => true,
        }
    }
}
