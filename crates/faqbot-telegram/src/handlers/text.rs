use std::sync::Arc;

use teloxide::prelude::*;

use faqbot_core::{domain::InboundMessage, transport::TransportEvent};

use crate::router::AppState;

pub async fn handle_text(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text().map(|s| s.to_string()) else {
        return Ok(());
    };
    if text.trim().is_empty() {
        return Ok(());
    }

    let inbound = InboundMessage {
        // Private chats share the user's id, which is also the contact id.
        sender_id: msg.chat.id.0.to_string(),
        text,
        display_name: msg.from().map(|u| u.full_name()),
        // Telegram never delivers the bot's own messages.
        from_self: false,
    };

    if state
        .events
        .send(TransportEvent::Message(inbound))
        .await
        .is_err()
    {
        tracing::warn!("agent event channel closed, dropping inbound message");
    }
    Ok(())
}
