//! Telegram adapter (teloxide).
//!
//! This crate implements the `faqbot-core` TransportPort over the Telegram Bot API.
//! Contacts are private-chat ids; the bot token stands in for device pairing, so a
//! successful `get_me` is reported as `authenticated` followed by `ready`.

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile};

use tokio::{sync::mpsc, time::sleep};

pub mod handlers;
pub mod router;

use faqbot_core::{
    domain::{Attachment, ContactId},
    errors::Error,
    transport::{TransportEvent, TransportPort},
    Result,
};

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    events: mpsc::Sender<TransportEvent>,
}

impl TelegramTransport {
    pub fn new(bot: Bot, events: mpsc::Sender<TransportEvent>) -> Self {
        Self { bot, events }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    /// Validate the token and report the lifecycle outcome on the event channel.
    pub async fn connect(&self) -> Result<()> {
        match self.with_retry(|| self.bot.get_me()).await {
            Ok(me) => {
                tracing::info!(username = %me.username(), "telegram bot authenticated");
                self.emit(TransportEvent::Authenticated).await;
                self.emit(TransportEvent::Ready).await;
                Ok(())
            }
            Err(e) => {
                self.emit(TransportEvent::AuthFailure {
                    reason: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn emit(&self, ev: TransportEvent) {
        if self.events.send(ev).await.is_err() {
            tracing::warn!("agent event channel closed, dropping transport event");
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

/// Telegram chat for a contact. Only positive (private chat) ids can be expressed.
pub fn chat_for(target: &ContactId) -> Result<ChatId> {
    target
        .as_str()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| Error::Transport(format!("not a telegram chat id: {target}")))
}

#[async_trait]
impl TransportPort for TelegramTransport {
    async fn send_text(&self, target: &ContactId, text: &str) -> Result<()> {
        let chat = chat_for(target)?;
        self.with_retry(|| self.bot.send_message(chat, text.to_string()))
            .await?;
        Ok(())
    }

    async fn send_media(
        &self,
        target: &ContactId,
        attachment: &Attachment,
        caption: &str,
    ) -> Result<()> {
        let chat = chat_for(target)?;
        self.with_retry(|| {
            self.bot
                .send_photo(chat, InputFile::file(attachment.path.clone()))
                .caption(caption.to_string())
        })
        .await?;
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        self.with_retry(|| self.bot.log_out()).await?;
        tracing::info!("telegram bot logged out");
        Ok(())
    }

    async fn reinitialize(&self) -> Result<()> {
        self.connect().await
    }
}
