use std::sync::Arc;

use anyhow::Context;
use teloxide::Bot;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use faqbot_core::{
    bus::{BotEvent, EventReceiver},
    clock::TokioClock,
    config::Config,
    Agent,
};
use faqbot_telegram::{
    router::{run_polling, AppState},
    TelegramTransport,
};

const TRANSPORT_EVENT_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    faqbot_core::logging::init("faqbot")?;

    let cfg = Config::load()?;
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let (tx, rx) = mpsc::channel(TRANSPORT_EVENT_BUFFER);
    let transport = Arc::new(TelegramTransport::new(bot.clone(), tx.clone()));
    let agent = Agent::new(cfg.clone(), transport.clone(), Arc::new(TokioClock))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(log_events(agent.subscribe()));
    let actor = tokio::spawn(agent.clone().run(rx, shutdown.clone()));

    transport
        .connect()
        .await
        .context("telegram authentication failed")?;

    let state = Arc::new(AppState {
        cfg: Arc::new(cfg),
        agent,
        events: tx,
    });

    tokio::select! {
        res = run_polling(bot, state) => res?,
        _ = tokio::signal::ctrl_c() => tracing::info!("ctrl-c received, shutting down"),
    }

    shutdown.cancel();
    let _ = actor.await;
    Ok(())
}

/// Mirror bus activity into the log.
async fn log_events(mut rx: EventReceiver) {
    while let Some(ev) = rx.recv().await {
        match &*ev {
            BotEvent::FatalError { message } => tracing::error!(topic = ev.topic(), "{message}"),
            BotEvent::BroadcastOutcome(o) if !o.succeeded => {
                tracing::warn!(topic = ev.topic(), target = %o.target, error = ?o.error, "broadcast send failed")
            }
            BotEvent::ReplyFailed { to, error, .. } => {
                tracing::warn!(topic = ev.topic(), target = %to, "reply failed: {error}")
            }
            other => tracing::debug!(topic = other.topic(), event = ?other, "bus event"),
        }
    }
}
