use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, BotCommand, ChatMemberUpdated, ParseMode};
use teloxide::update_listeners::Polling;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use idlewatch_commands::{CommandContext, CommandDispatcher};
use idlewatch_core::{ChannelId, Message as BusMessage};
use logging::redact_sensitive_data;

use crate::telegram_groups::{activity_event, is_monitored, join_event, member_id};
use crate::ChannelAdapter;

/// Username the bot answers to in `/command@username`.
#[derive(Clone)]
struct BotIdentity(Option<String>);

/// Long-polling Telegram adapter.
///
/// Forwards group activity and membership changes to the event bus and answers
/// operator commands through the command dispatcher.
pub struct TelegramAdapter {
    bot: Bot,
    commands: Arc<CommandDispatcher>,
}

impl TelegramAdapter {
    pub fn new(bot: Bot, commands: Arc<CommandDispatcher>) -> Self {
        Self { bot, commands }
    }

    async fn publish_commands(&self) {
        let menu: Vec<BotCommand> = self
            .commands
            .registry()
            .all()
            .iter()
            .filter_map(|def| {
                def.native_name
                    .as_ref()
                    .map(|name| BotCommand::new(name.clone(), def.description.clone()))
            })
            .collect();
        if let Err(e) = self.bot.set_my_commands(menu).await {
            warn!(error = %redact_sensitive_data(&e.to_string()), "Failed to publish the command menu");
        }
    }
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self, events_tx: mpsc::Sender<BusMessage>) -> anyhow::Result<()> {
        info!("Starting Telegram adapter");

        let identity = match self.bot.get_me().await {
            Ok(me) => {
                info!(username = %me.username(), "Connected to Telegram");
                BotIdentity(Some(me.username().to_string()))
            }
            Err(e) => {
                warn!(error = %redact_sensitive_data(&e.to_string()), "Could not fetch bot identity; addressed commands will be accepted for any bot");
                BotIdentity(None)
            }
        };
        self.publish_commands().await;

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(on_message))
            .branch(Update::filter_chat_member().endpoint(on_chat_member));

        let listener = Polling::builder(self.bot.clone())
            .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::ChatMember])
            .build();

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![events_tx, self.commands.clone(), identity])
            .enable_ctrlc_handler()
            .build()
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("Telegram polling error"),
            )
            .await;

        info!("Telegram adapter stopped");
        Ok(())
    }
}

async fn on_message(
    bot: Bot,
    msg: Message,
    tx: mpsc::Sender<BusMessage>,
    commands: Arc<CommandDispatcher>,
    identity: BotIdentity,
) -> ResponseResult<()> {
    let monitored = is_monitored(&msg.chat);
    if let Some(event) = activity_event(msg.chat.id.0, monitored, msg.from.as_ref(), msg.date) {
        if tx.send(BusMessage::Activity(event)).await.is_err() {
            error!("Event bus closed, dropping activity");
        }
    }

    let (Some(text), Some(from)) = (msg.text(), msg.from.as_ref()) else {
        return Ok(());
    };
    if !monitored {
        return Ok(());
    }

    let ctx = CommandContext {
        channel_id: ChannelId(msg.chat.id.0),
        sender_id: member_id(from),
    };
    if let Some(reply) = commands
        .handle_text(&ctx, text, identity.0.as_deref())
        .await
    {
        bot.send_message(msg.chat.id, reply.text)
            .parse_mode(ParseMode::Html)
            .await?;
    }
    Ok(())
}

async fn on_chat_member(update: ChatMemberUpdated, tx: mpsc::Sender<BusMessage>) -> ResponseResult<()> {
    if let Some(event) = join_event(&update) {
        debug!(
            channel_id = %event.channel_id,
            member_id = %event.member_id,
            from = %event.previous_status,
            to = %event.new_status,
            "Membership update"
        );
        if tx.send(BusMessage::Join(event)).await.is_err() {
            error!("Event bus closed, dropping membership update");
        }
    }
    Ok(())
}
