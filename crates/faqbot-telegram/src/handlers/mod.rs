//! Telegram update handlers.
//!
//! Operator commands are answered here; every other text message is forwarded
//! to the agent as an inbound message. Contact authorization is the agent's job.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod commands;
mod text;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let user_id = msg.from().map(|u| u.id.0 as i64);

    let Some(text) = msg.text() else {
        tracing::debug!(chat = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    if text.starts_with('/') && is_operator(user_id, &state.cfg.operator_ids) {
        return commands::handle_command(bot, msg, state).await;
    }

    text::handle_text(msg, state).await
}

fn is_operator(user_id: Option<i64>, operators: &[i64]) -> bool {
    user_id.map(|id| operators.contains(&id)).unwrap_or(false)
}
