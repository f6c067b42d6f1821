//! In-crate fakes shared by unit tests.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Semaphore, time::Instant};

use crate::{
    clock::Clock,
    config::Config,
    domain::{Attachment, ContactId},
    errors::Error,
    transport::TransportPort,
    Result,
};

pub(crate) fn tmp_path(prefix: &str) -> PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_nanos();
    let pid = std::process::id();
    PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.json"))
}

pub(crate) fn test_config(contacts_file: &Path) -> Config {
    Config {
        telegram_bot_token: "test-token".to_string(),
        operator_ids: vec![1],
        contacts_file: contacts_file.to_path_buf(),
        default_contacts: Vec::new(),
        faq_file: None,
        broadcast_delay: Duration::from_secs(2),
        welcome_message: "welcome".to_string(),
        welcome_image: None,
        event_bus_capacity: 256,
    }
}

// ============== ManualClock ==============

/// Virtual clock: `sleep` advances time instantly.
///
/// A held clock parks every `sleep` until [`ManualClock::release`] hands out a permit.
pub(crate) struct ManualClock {
    start: Instant,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
    gate: Option<Semaphore>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub(crate) fn held() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub(crate) fn release(&self, sleeps: usize) {
        if let Some(g) = &self.gate {
            g.add_permits(sleeps);
        }
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        if let Some(g) = &self.gate {
            if let Ok(permit) = g.acquire().await {
                permit.forget();
            }
        }
        *self.elapsed.lock().unwrap() += duration;
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

// ============== FakeTransport ==============

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SentMessage {
    pub target: ContactId,
    pub text: String,
    pub attachment: Option<Attachment>,
    pub at: Instant,
}

/// Records every send with the virtual time it happened at.
pub(crate) struct FakeTransport {
    clock: Arc<ManualClock>,
    failing: Mutex<HashSet<String>>,
    reinit_error: Mutex<Option<String>>,
    sent: Mutex<Vec<SentMessage>>,
    logouts: AtomicUsize,
    reinits: AtomicUsize,
}

impl FakeTransport {
    pub(crate) fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            failing: Mutex::new(HashSet::new()),
            reinit_error: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            logouts: AtomicUsize::new(0),
            reinits: AtomicUsize::new(0),
        }
    }

    pub(crate) fn fail_on(&self, target: &str) {
        self.failing.lock().unwrap().insert(target.to_string());
    }

    pub(crate) fn fail_reinitialize(&self, msg: &str) {
        *self.reinit_error.lock().unwrap() = Some(msg.to_string());
    }

    pub(crate) fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_to(&self) -> Vec<String> {
        self.sent().iter().map(|m| m.target.to_string()).collect()
    }

    pub(crate) fn logout_calls(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub(crate) fn reinitialize_calls(&self) -> usize {
        self.reinits.load(Ordering::SeqCst)
    }

    fn record(&self, target: &ContactId, text: &str, attachment: Option<&Attachment>) -> Result<()> {
        if self.failing.lock().unwrap().contains(target.as_str()) {
            return Err(Error::Transport(format!("recipient {target} unreachable")));
        }
        self.sent.lock().unwrap().push(SentMessage {
            target: target.clone(),
            text: text.to_string(),
            attachment: attachment.cloned(),
            at: self.clock.now(),
        });
        Ok(())
    }
}

#[async_trait]
impl TransportPort for FakeTransport {
    async fn send_text(&self, target: &ContactId, text: &str) -> Result<()> {
        self.record(target, text, None)
    }

    async fn send_media(
        &self,
        target: &ContactId,
        attachment: &Attachment,
        caption: &str,
    ) -> Result<()> {
        self.record(target, caption, Some(attachment))
    }

    async fn logout(&self) -> Result<()> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reinitialize(&self) -> Result<()> {
        self.reinits.fetch_add(1, Ordering::SeqCst);
        match self.reinit_error.lock().unwrap().clone() {
            Some(msg) => Err(Error::Transport(msg)),
            None => Ok(()),
        }
    }
}
