/// Command dispatch: authorize detected commands and route them to handlers.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use idlewatch_core::{AdminResolver, ChannelId, IdleWatchError, MemberId};

use crate::detection::detect_command;
use crate::registry::CommandRegistry;
use crate::types::CommandInvocation;

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Context passed to every command handler.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    pub channel_id: ChannelId,
    pub sender_id: MemberId,
}

/// Reply to send back, in Telegram HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub text: String,
}

impl CommandResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub const UNAUTHORIZED_REPLY: &str = "⛔ Only group administrators can use this command.";
pub const LOOKUP_FAILED_REPLY: &str =
    "⚠️ Could not verify the group administrators right now. Please try again later.";
pub const SCAN_IN_PROGRESS_REPLY: &str =
    "⏳ A scan of this group is already running. Please try again shortly.";
pub const INTERNAL_ERROR_REPLY: &str = "⚠️ Internal error, please try again later.";

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse, IdleWatchError>;
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    admins: Arc<dyn AdminResolver>,
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>, admins: Arc<dyn AdminResolver>) -> Self {
        Self {
            registry,
            admins,
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Detect and run a command in `text`. `None` when the text is not one of ours.
    pub async fn handle_text(
        &self,
        ctx: &CommandContext,
        text: &str,
        bot_username: Option<&str>,
    ) -> Option<CommandResponse> {
        let inv = detect_command(text, &self.registry, bot_username)?;
        Some(self.dispatch(ctx, &inv).await)
    }

    /// Run an invocation. Failures become user-facing replies; only
    /// configuration and authorization errors are shown verbatim.
    pub async fn dispatch(&self, ctx: &CommandContext, inv: &CommandInvocation) -> CommandResponse {
        match self.try_dispatch(ctx, inv).await {
            Ok(response) => response,
            Err(IdleWatchError::InvalidConfig(msg)) => CommandResponse::ok(format!("❌ {msg}")),
            Err(IdleWatchError::Unauthorized(member_id)) => {
                info!(channel_id = %ctx.channel_id, member_id = %member_id, command = %inv.key, "Rejected non-admin caller");
                CommandResponse::ok(UNAUTHORIZED_REPLY)
            }
            Err(IdleWatchError::Lookup(e)) => {
                warn!(channel_id = %ctx.channel_id, command = %inv.key, error = %e, "Admin check failed");
                CommandResponse::ok(LOOKUP_FAILED_REPLY)
            }
            Err(IdleWatchError::ScanInProgress(_)) => CommandResponse::ok(SCAN_IN_PROGRESS_REPLY),
            Err(e) => {
                error!(channel_id = %ctx.channel_id, command = %inv.key, error = %e, "Command failed");
                CommandResponse::ok(INTERNAL_ERROR_REPLY)
            }
        }
    }

    async fn try_dispatch(
        &self,
        ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse, IdleWatchError> {
        let admin_only = self
            .registry
            .find_by_key(&inv.key)
            .map(|d| d.admin_only)
            .unwrap_or(true);
        if admin_only {
            let admins = self.admins.get_admins(ctx.channel_id).await?;
            if !admins.contains(&ctx.sender_id) {
                return Err(IdleWatchError::Unauthorized(ctx.sender_id));
            }
        }

        match self.handlers.get(&inv.key) {
            Some(handler) => {
                info!(channel_id = %ctx.channel_id, command = %inv.key, "Dispatching command");
                handler.handle(ctx, inv).await
            }
            None => Ok(CommandResponse::ok(format!(
                "❓ No handler registered for command /{}",
                inv.key
            ))),
        }
    }
}
