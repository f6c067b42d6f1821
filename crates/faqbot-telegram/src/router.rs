use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::mpsc;

use faqbot_core::{config::Config, transport::TransportEvent, Agent};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub agent: Agent,
    pub events: mpsc::Sender<TransportEvent>,
}

/// Long-poll Telegram until the dispatcher stops.
pub async fn run_polling(bot: Bot, state: Arc<AppState>) -> anyhow::Result<()> {
    tracing::info!(
        operators = state.cfg.operator_ids.len(),
        contacts = state.agent.list_contacts().await.len(),
        "starting telegram polling"
    );

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
