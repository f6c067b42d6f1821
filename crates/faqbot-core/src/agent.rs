//! The agent: one context object wiring store, classifier, lifecycle and dispatcher.
//!
//! Transport events are processed one at a time by [`Agent::run`]. Operator
//! (façade) operations may be called concurrently from other tasks; they
//! serialize on the contact store and the session lifecycle. Paced sends run on
//! their own tasks so inbound handling continues while a broadcast is going out.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::{
    bus::{BotEvent, EventBus, EventReceiver},
    classifier::{data, Classification, Classifier},
    clock::Clock,
    config::Config,
    contacts::ContactStore,
    dispatcher::BroadcastDispatcher,
    domain::{Attachment, BroadcastOutcome, ContactId, InboundMessage, SessionState, UnrecognizedQuery},
    session::{LifecycleEvent, SessionLifecycle},
    transport::{TransportEvent, TransportPort},
    utils::{iso_timestamp_utc, truncate_text},
    Result,
};

/// Snapshot returned by [`Agent::stats`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentStats {
    pub authorized_contacts: usize,
    pub faq_entries: usize,
    pub unrecognized_queries: usize,
    pub active: bool,
    pub state: String,
}

#[derive(Clone)]
pub struct Agent {
    cfg: Arc<Config>,
    bus: EventBus,
    contacts: Arc<Mutex<ContactStore>>,
    classifier: Arc<Classifier>,
    session: Arc<SessionLifecycle>,
    dispatcher: Arc<BroadcastDispatcher>,
    unrecognized: Arc<Mutex<Vec<UnrecognizedQuery>>>,
}

impl Agent {
    pub fn new(
        cfg: Config,
        transport: Arc<dyn TransportPort>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let bus = EventBus::with_capacity(cfg.event_bus_capacity);
        let contacts = ContactStore::load(&cfg.contacts_file, &cfg.default_contacts);
        let classifier = Classifier::from_config(&cfg)?;
        let session = Arc::new(SessionLifecycle::new(transport.clone(), bus.clone()));
        let dispatcher = Arc::new(BroadcastDispatcher::new(
            transport,
            session.clone(),
            clock,
            cfg.broadcast_delay,
            bus.clone(),
        ));

        Ok(Self {
            cfg: Arc::new(cfg),
            bus,
            contacts: Arc::new(Mutex::new(contacts)),
            classifier: Arc::new(classifier),
            session,
            dispatcher,
            unrecognized: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.bus.subscribe()
    }

    // ============== Event Loop ==============

    /// Process transport events until the channel closes or `shutdown` fires.
    pub async fn run(self, mut events: mpsc::Receiver<TransportEvent>, shutdown: CancellationToken) {
        tracing::info!("agent event loop started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("agent shutting down");
                    break;
                }
                ev = events.recv() => match ev {
                    Some(ev) => self.handle_transport_event(ev).await,
                    None => {
                        tracing::info!("transport event channel closed");
                        break;
                    }
                }
            }
        }
    }

    pub async fn handle_transport_event(&self, ev: TransportEvent) {
        tracing::debug!(kind = ev.kind(), "transport event");

        if let TransportEvent::Message(msg) = ev {
            self.handle_inbound(msg).await;
            return;
        }

        let Some(lifecycle) = LifecycleEvent::from_transport(&ev) else {
            return;
        };
        if let Some(t) = self.session.apply(lifecycle).await {
            if t.entered_connected() {
                let connection = self.session.connection_token().await;
                let targets = self.contacts.lock().await.list();
                self.spawn_welcome(connection, targets);
            }
        }
    }

    async fn handle_inbound(&self, msg: InboundMessage) {
        if msg.from_self {
            return;
        }

        let sender = {
            let contacts = self.contacts.lock().await;
            if contacts.is_authorized(&msg.sender_id) {
                ContactId::normalize(&msg.sender_id)
            } else {
                None
            }
        };
        let Some(sender) = sender else {
            tracing::info!(from = %msg.sender_id, "message from unauthorized sender ignored");
            self.bus.publish(BotEvent::UnauthorizedMessage {
                from: msg.sender_id,
            });
            return;
        };

        let name = msg
            .display_name
            .clone()
            .unwrap_or_else(|| data::DEFAULT_DISPLAY_NAME.to_string());
        tracing::info!(
            from = %sender,
            text = %truncate_text(&msg.text, 80),
            "message received"
        );
        self.bus.publish(BotEvent::MessageReceived {
            from: sender.clone(),
            name: name.clone(),
            message: msg.text.clone(),
            timestamp: iso_timestamp_utc(),
        });

        let reply = match self.classifier.classify(&msg.text) {
            Classification::Matched { reply, .. } => reply,
            Classification::Unmatched => {
                let query = UnrecognizedQuery {
                    timestamp: iso_timestamp_utc(),
                    user: sender.to_string(),
                    query: msg.text.clone(),
                };
                self.unrecognized.lock().await.push(query.clone());
                self.bus.publish(BotEvent::UnrecognizedQuery(query));
                data::fallback_reply(&name)
            }
        };

        let Some(outcome) = self.dispatcher.send_reply(&sender, &reply).await else {
            return;
        };
        if outcome.succeeded {
            self.bus.publish(BotEvent::MessageSent {
                to: sender,
                message: reply,
                timestamp: iso_timestamp_utc(),
            });
        } else {
            self.bus.publish(BotEvent::ReplyFailed {
                to: sender,
                error: outcome.error.unwrap_or_default(),
                timestamp: iso_timestamp_utc(),
            });
        }
    }

    /// Configured welcome image, or `None` (text only) when unset or missing on disk.
    fn welcome_attachment(&self) -> Option<Attachment> {
        let path = self.cfg.welcome_image.as_ref()?;
        if path.exists() {
            Some(Attachment { path: path.clone() })
        } else {
            tracing::warn!(path = %path.display(), "welcome image not found, sending text only");
            None
        }
    }

    /// Welcome `targets` on `connection`; nothing is sent if it closes first.
    fn spawn_welcome(&self, connection: Option<CancellationToken>, targets: Vec<ContactId>) {
        let dispatcher = self.dispatcher.clone();
        let message = self.cfg.welcome_message.clone();
        let attachment = self.welcome_attachment();
        tokio::spawn(async move {
            dispatcher
                .welcome(connection, &message, attachment.as_ref(), &targets)
                .await;
        });
    }

    // ============== Operator Operations ==============

    pub async fn pairing_code(&self) -> Option<String> {
        self.session.pairing_code().await
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.state().await
    }

    pub async fn stats(&self) -> AgentStats {
        let authorized_contacts = self.contacts.lock().await.len();
        let unrecognized_queries = self.unrecognized.lock().await.len();
        let state = self.session.state().await;
        AgentStats {
            authorized_contacts,
            faq_entries: self.classifier.faq_count(),
            unrecognized_queries,
            active: state == SessionState::Connected,
            state: state.label().to_string(),
        }
    }

    pub async fn unrecognized_queries(&self) -> Vec<UnrecognizedQuery> {
        self.unrecognized.lock().await.clone()
    }

    pub async fn list_contacts(&self) -> Vec<ContactId> {
        self.contacts.lock().await.list()
    }

    /// Authorize a contact; welcomes it right away when connected.
    ///
    /// False only when `raw` has no digits.
    pub async fn authorize_contact(&self, raw: &str) -> bool {
        let Some(id) = self.contacts.lock().await.authorize(raw) else {
            tracing::warn!(raw, "cannot authorize contact without digits");
            return false;
        };
        tracing::info!(contact = %id, "contact authorized");
        self.bus.publish(BotEvent::ContactAuthorized {
            contact: id.clone(),
        });

        if let Some(connection) = self.session.connection_token().await {
            self.spawn_welcome(Some(connection), vec![id]);
        }
        true
    }

    pub async fn remove_contact(&self, raw: &str) -> bool {
        let Some(id) = self.contacts.lock().await.remove(raw) else {
            return false;
        };
        tracing::info!(contact = %id, "contact removed");
        self.bus.publish(BotEvent::ContactRemoved { contact: id });
        true
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.logout().await
    }

    pub async fn restart(&self) -> Result<()> {
        self.session.restart().await
    }

    /// Broadcast to every authorized contact. Resolves when the run finishes.
    pub async fn send_broadcast(
        &self,
        message: &str,
        attachment: Option<Attachment>,
    ) -> Vec<BroadcastOutcome> {
        let connection = self.session.connection_token().await;
        let targets = self.contacts.lock().await.list();
        let dispatcher = self.dispatcher.clone();
        let message = message.to_string();

        let run = tokio::spawn(async move {
            dispatcher
                .broadcast(connection, &message, attachment.as_ref(), &targets)
                .await
        });
        match run.await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                tracing::error!("broadcast task failed: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, tmp_path, FakeTransport, ManualClock};
    use std::{sync::Arc, time::Duration};

    struct Fixture {
        clock: Arc<ManualClock>,
        transport: Arc<FakeTransport>,
        agent: Agent,
        path: std::path::PathBuf,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn fixture_with(clock: ManualClock, contacts: &[&str]) -> Fixture {
        let path = tmp_path("faqbot-agent");
        let mut cfg = test_config(&path);
        cfg.default_contacts = contacts.iter().map(|c| c.to_string()).collect();

        let clock = Arc::new(clock);
        let transport = Arc::new(FakeTransport::new(clock.clone()));
        let agent = Agent::new(cfg, transport.clone(), clock.clone()).unwrap();
        Fixture {
            clock,
            transport,
            agent,
            path,
        }
    }

    fn fixture(contacts: &[&str]) -> Fixture {
        fixture_with(ManualClock::new(), contacts)
    }

    fn inbound(sender: &str, text: &str) -> TransportEvent {
        TransportEvent::Message(InboundMessage {
            sender_id: sender.to_string(),
            text: text.to_string(),
            display_name: Some("Ana".to_string()),
            from_self: false,
        })
    }

    async fn connect(agent: &Agent) {
        agent.handle_transport_event(TransportEvent::Authenticated).await;
        agent.handle_transport_event(TransportEvent::Ready).await;
    }

    /// Wait until `n` events with `topic` have been seen.
    async fn wait_for(rx: &mut EventReceiver, topic: &str, n: usize) -> Vec<Arc<BotEvent>> {
        let mut seen = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            while seen.len() < n {
                match rx.recv().await {
                    Some(ev) if ev.topic() == topic => seen.push(ev),
                    Some(_) => {}
                    None => break,
                }
            }
        })
        .await
        .unwrap();
        seen
    }

    #[tokio::test]
    async fn reconnect_re_sends_the_welcome() {
        let f = fixture(&["111", "222"]);
        let mut rx = f.agent.subscribe();

        connect(&f.agent).await;
        wait_for(&mut rx, "welcome-sent", 2).await;

        f.agent
            .handle_transport_event(TransportEvent::Disconnected {
                reason: "network".into(),
            })
            .await;
        connect(&f.agent).await;
        wait_for(&mut rx, "welcome-sent", 2).await;

        assert_eq!(f.transport.sent_to(), vec!["111", "222", "111", "222"]);
        assert!(f.transport.sent().iter().all(|m| m.text == "welcome"));
    }

    #[tokio::test]
    async fn fast_reconnect_welcomes_once_on_the_new_connection() {
        let f = fixture(&["1", "2"]);
        let mut rx = f.agent.subscribe();

        // No yield between events: the first welcome is still queued when
        // its connection drops.
        connect(&f.agent).await;
        f.agent
            .handle_transport_event(TransportEvent::Disconnected {
                reason: "network".into(),
            })
            .await;
        connect(&f.agent).await;

        wait_for(&mut rx, "welcome-sent", 2).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(f.transport.sent_to(), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn failed_reply_is_published() {
        let f = fixture(&["5"]);
        let mut rx = f.agent.subscribe();
        connect(&f.agent).await;
        wait_for(&mut rx, "welcome-sent", 1).await;
        f.transport.fail_on("5");

        f.agent.handle_transport_event(inbound("5", "precio")).await;

        let ev = wait_for(&mut rx, "reply-failed", 1).await;
        match &*ev[0] {
            BotEvent::ReplyFailed { to, error, .. } => {
                assert_eq!(to.as_str(), "5");
                assert!(!error.is_empty());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(rx.drain().iter().all(|e| e.topic() != "message-sent"));
    }

    #[tokio::test]
    async fn authorized_question_gets_the_faq_answer() {
        let f = fixture(&["+57 300 000 0001"]);
        connect(&f.agent).await;
        let mut rx = f.agent.subscribe();

        f.agent
            .handle_transport_event(inbound("573000000001", "¿Cuál es el precio?"))
            .await;

        let sent = wait_for(&mut rx, "message-sent", 1).await;
        let pricing = &data::faq_corpus()[1].answer;
        match &*sent[0] {
            BotEvent::MessageSent { to, message, .. } => {
                assert_eq!(to.as_str(), "573000000001");
                assert_eq!(message, pricing);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn unmatched_text_gets_fallback_and_is_logged() {
        let f = fixture(&["5"]);
        connect(&f.agent).await;

        f.agent
            .handle_transport_event(inbound("5", "asdkjhaskjdh"))
            .await;

        let stats = f.agent.stats().await;
        assert_eq!(stats.unrecognized_queries, 1);
        let q = &f.agent.unrecognized_queries().await[0];
        assert_eq!((q.user.as_str(), q.query.as_str()), ("5", "asdkjhaskjdh"));

        let replies: Vec<String> = f
            .transport
            .sent()
            .into_iter()
            .filter(|m| m.text != "welcome")
            .map(|m| m.text)
            .collect();
        assert_eq!(replies, vec![data::fallback_reply("Ana")]);
    }

    #[tokio::test]
    async fn unauthorized_sender_is_reported_and_ignored() {
        let f = fixture(&["5"]);
        connect(&f.agent).await;
        let mut rx = f.agent.subscribe();

        f.agent.handle_transport_event(inbound("999", "hola")).await;

        let ev = wait_for(&mut rx, "unauthorized-message", 1).await;
        assert_eq!(
            *ev[0],
            BotEvent::UnauthorizedMessage { from: "999".into() }
        );
        assert!(!f.transport.sent_to().contains(&"999".to_string()));
    }

    #[tokio::test]
    async fn own_messages_are_ignored() {
        let f = fixture(&["5"]);
        let mut rx = f.agent.subscribe();
        f.agent
            .handle_transport_event(TransportEvent::Message(InboundMessage {
                sender_id: "5".into(),
                text: "hola".into(),
                display_name: None,
                from_self: true,
            }))
            .await;
        assert!(rx.drain().is_empty());
    }

    #[tokio::test]
    async fn replies_are_not_sent_while_disconnected() {
        let f = fixture(&["5"]);
        f.agent.handle_transport_event(inbound("5", "hola")).await;
        assert!(f.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn authorize_and_remove_publish_events() {
        let f = fixture(&[]);
        let mut rx = f.agent.subscribe();

        assert!(f.agent.authorize_contact("+57 311 222 3344").await);
        assert!(!f.agent.authorize_contact("no digits").await);
        assert!(f.agent.remove_contact("573112223344").await);
        assert!(!f.agent.remove_contact("573112223344").await);

        let topics: Vec<_> = rx.drain().iter().map(|e| e.topic()).collect();
        assert_eq!(topics, vec!["contact-authorized", "contact-removed"]);
        assert!(f.agent.list_contacts().await.is_empty());
        // Not connected: no welcome.
        assert!(f.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn authorize_while_connected_welcomes_that_contact_only() {
        let f = fixture(&["1"]);
        let mut rx = f.agent.subscribe();
        connect(&f.agent).await;
        wait_for(&mut rx, "welcome-sent", 1).await;

        f.agent.authorize_contact("2").await;
        let ev = wait_for(&mut rx, "welcome-sent", 1).await;
        assert_eq!(
            *ev[0],
            BotEvent::WelcomeSent {
                contact: ContactId::normalize("2").unwrap()
            }
        );
        assert_eq!(f.transport.sent_to(), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn inbound_is_answered_while_a_broadcast_is_running() {
        let f = fixture_with(ManualClock::held(), &["1", "2"]);
        // Skip the connect-time welcome so the broadcast is the only paced run.
        f.agent.session.apply(LifecycleEvent::Authenticated).await;
        f.agent.session.apply(LifecycleEvent::Ready).await;

        let agent = f.agent.clone();
        let run = tokio::spawn(async move { agent.send_broadcast("promo", None).await });
        while f.transport.sent().is_empty() {
            tokio::task::yield_now().await;
        }

        f.agent.handle_transport_event(inbound("2", "hola")).await;
        assert_eq!(f.transport.sent_to(), vec!["1", "2"]);

        f.clock.release(1);
        let out = run.await.unwrap();
        assert_eq!(out.len(), 2);
        let texts: Vec<String> = f.transport.sent().into_iter().map(|m| m.text).collect();
        assert_eq!(texts[0], "promo");
        assert_eq!(texts[2], "promo");
    }

    #[tokio::test]
    async fn stats_track_state_and_counts() {
        let f = fixture(&["1", "2"]);
        let stats = f.agent.stats().await;
        assert_eq!(stats.authorized_contacts, 2);
        assert_eq!(stats.faq_entries, data::faq_corpus().len());
        assert!(!stats.active);
        assert_eq!(stats.state, "disconnected");

        f.agent
            .handle_transport_event(TransportEvent::PairingCodeIssued { code: "QR".into() })
            .await;
        assert_eq!(f.agent.pairing_code().await.as_deref(), Some("QR"));
        assert_eq!(f.agent.stats().await.state, "pairing_requested");
    }

    #[tokio::test]
    async fn missing_welcome_image_falls_back_to_text() {
        let path = tmp_path("faqbot-agent-img");
        let mut cfg = test_config(&path);
        cfg.default_contacts = vec!["7".into()];
        cfg.welcome_image = Some("/tmp/faqbot-definitely-missing.png".into());

        let clock = Arc::new(ManualClock::new());
        let transport = Arc::new(FakeTransport::new(clock.clone()));
        let agent = Agent::new(cfg, transport.clone(), clock).unwrap();
        let mut rx = agent.subscribe();

        connect(&agent).await;
        wait_for(&mut rx, "welcome-sent", 1).await;
        assert_eq!(transport.sent()[0].attachment, None);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn run_loop_stops_on_shutdown() {
        let f = fixture(&[]);
        let (tx, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(f.agent.clone().run(rx, shutdown.clone()));

        tx.send(TransportEvent::Authenticated).await.unwrap();
        shutdown.cancel();
        task.await.unwrap();
        drop(tx);
    }
}
