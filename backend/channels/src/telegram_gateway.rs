//! Outbound Telegram calls used by the scanner and the command layer.

use std::collections::HashSet;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::debug;

use logging::redact_sensitive_data;

use idlewatch_core::{
    AdminResolver, ChannelId, LookupError, MemberId, NotificationDispatcher, NotifyError,
};

use crate::telegram_groups::member_id;

/// Admin lookup and notification delivery over the Bot API.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl AdminResolver for TelegramGateway {
    async fn get_admins(&self, channel_id: ChannelId) -> Result<HashSet<MemberId>, LookupError> {
        let members = self
            .bot
            .get_chat_administrators(ChatId(channel_id.0))
            .await
            .map_err(|e| LookupError {
                channel_id,
                message: redact_sensitive_data(&e.to_string()),
            })?;
        let admins: HashSet<MemberId> = members.iter().map(|m| member_id(&m.user)).collect();
        debug!(channel_id = %channel_id, admins = admins.len(), "Resolved channel administrators");
        Ok(admins)
    }
}

#[async_trait]
impl NotificationDispatcher for TelegramGateway {
    async fn send_private(&self, member_id: MemberId, text: &str) -> Result<(), NotifyError> {
        // A private chat with a user has the user's id as its chat id.
        self.bot
            .send_message(ChatId(member_id.0), text)
            .await
            .map_err(|e| NotifyError {
                target: format!("member {member_id}"),
                message: redact_sensitive_data(&e.to_string()),
            })?;
        Ok(())
    }

    async fn send_to_channel(&self, channel_id: ChannelId, html: &str) -> Result<(), NotifyError> {
        self.bot
            .send_message(ChatId(channel_id.0), html)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| NotifyError {
                target: format!("channel {channel_id}"),
                message: redact_sensitive_data(&e.to_string()),
            })?;
        Ok(())
    }
}
