/// Built-in command handlers.
///
/// Each handler is a concrete struct implementing `CommandHandler`. Authorization
/// has already happened in the dispatcher by the time a handler runs.
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use idlewatch_core::IdleWatchError;
use idlewatch_ledger::ConfigStore;
use idlewatch_scheduler::notice::{escape_html, mention_html};
use idlewatch_scheduler::{InactivityScanner, ScanLog, ScanReport};

use crate::dispatch::{CommandContext, CommandHandler, CommandResponse};
use crate::registry::CommandRegistry;
use crate::types::CommandInvocation;

pub const NO_INACTIVE_REPLY: &str = "✅ No inactive members.";

// ---------------------------------------------------------------------------
// /help
// ---------------------------------------------------------------------------

pub struct HelpHandler {
    pub registry: Arc<CommandRegistry>,
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(
        &self,
        _ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse, IdleWatchError> {
        let mut lines = vec!["<b>Available commands:</b>".to_string()];
        for cmd in self.registry.all() {
            let admin = if cmd.admin_only { " (admins)" } else { "" };
            lines.push(format!(
                "• <code>{}</code> {}{}",
                escape_html(&cmd.usage()),
                escape_html(&cmd.description),
                admin
            ));
        }
        Ok(CommandResponse::ok(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// /inactive
// ---------------------------------------------------------------------------

pub struct ListInactiveHandler {
    pub scanner: Arc<InactivityScanner>,
}

#[async_trait]
impl CommandHandler for ListInactiveHandler {
    async fn handle(
        &self,
        ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse, IdleWatchError> {
        let inactive = self.scanner.list_inactive(ctx.channel_id).await?;
        if inactive.is_empty() {
            return Ok(CommandResponse::ok(NO_INACTIVE_REPLY));
        }
        let mut text = String::from("📋 Inactive members:");
        for record in &inactive {
            text.push_str(&format!("\n• {}", mention_html(record.member_id, "member")));
        }
        Ok(CommandResponse::ok(text))
    }
}

// ---------------------------------------------------------------------------
// /setinactivity, /setgrace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    InactivityThreshold,
    NewMemberGrace,
}

pub struct SetDaysHandler {
    pub configs: Arc<dyn ConfigStore>,
    pub field: ConfigField,
}

#[async_trait]
impl CommandHandler for SetDaysHandler {
    async fn handle(
        &self,
        ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse, IdleWatchError> {
        let usage = match self.field {
            ConfigField::InactivityThreshold => "/setinactivity <days>",
            ConfigField::NewMemberGrace => "/setgrace <days>",
        };
        let days: i64 = inv
            .args
            .first()
            .and_then(|a| a.parse().ok())
            .ok_or_else(|| IdleWatchError::InvalidConfig(format!("Usage: {usage}")))?;

        let effective = match self.field {
            ConfigField::InactivityThreshold => {
                self.configs.set_inactivity_threshold(ctx.channel_id, days).await?
            }
            ConfigField::NewMemberGrace => {
                self.configs.set_new_member_grace(ctx.channel_id, days).await?
            }
        };
        info!(channel_id = %ctx.channel_id, member_id = %ctx.sender_id, field = ?self.field, days, "Channel config changed");

        Ok(CommandResponse::ok(format!(
            "✅ Inactivity threshold: {} days\nNew member grace: {} days",
            effective.inactivity_threshold_days, effective.new_member_grace_days
        )))
    }
}

// ---------------------------------------------------------------------------
// /inactivityconfig
// ---------------------------------------------------------------------------

pub struct ShowConfigHandler {
    pub configs: Arc<dyn ConfigStore>,
    pub scan_log: Option<ScanLog>,
}

#[async_trait]
impl CommandHandler for ShowConfigHandler {
    async fn handle(
        &self,
        ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse, IdleWatchError> {
        let explicit = self.configs.get_explicit(ctx.channel_id).await?;
        let effective = self.configs.get(ctx.channel_id).await?;
        let source = |set: bool| if set { "set for this group" } else { "default" };
        let (threshold_set, grace_set) = explicit
            .map(|c| {
                (
                    c.inactivity_threshold_days.is_some(),
                    c.new_member_grace_days.is_some(),
                )
            })
            .unwrap_or((false, false));

        let mut text = format!(
            "⚙️ Inactivity threshold: {} days ({})\nNew member grace: {} days ({})",
            effective.inactivity_threshold_days,
            source(threshold_set),
            effective.new_member_grace_days,
            source(grace_set),
        );

        if let Some(log) = &self.scan_log {
            let last = log.last(ctx.channel_id).await.map_err(IdleWatchError::Other)?;
            match last {
                Some(entry) => text.push_str(&format!(
                    "\nLast scan: {} ({:?}, {} warned)",
                    entry.started_at.format("%Y-%m-%d %H:%M UTC"),
                    entry.status,
                    entry.warned
                )),
                None => text.push_str("\nLast scan: never"),
            }
        }
        Ok(CommandResponse::ok(text))
    }
}

// ---------------------------------------------------------------------------
// /scannow
// ---------------------------------------------------------------------------

pub struct ScanNowHandler {
    pub scanner: Arc<InactivityScanner>,
}

#[async_trait]
impl CommandHandler for ScanNowHandler {
    async fn handle(
        &self,
        ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse, IdleWatchError> {
        info!(channel_id = %ctx.channel_id, member_id = %ctx.sender_id, "Manual scan requested");
        let report = self.scanner.scan_channel(ctx.channel_id).await?;
        Ok(CommandResponse::ok(scan_summary(&report)))
    }
}

/// Reply text for a finished scan. Members that could not be warned are reported,
/// not folded into "no inactive members".
pub fn scan_summary(report: &ScanReport) -> String {
    if report.warned == 0 && report.undelivered == 0 && report.store_failures == 0 {
        return NO_INACTIVE_REPLY.to_string();
    }
    let mut text = format!("🔎 Scan complete: {} member(s) warned.", report.warned);
    if report.undelivered > 0 {
        text.push_str(&format!(
            "\n⚠️ {} member(s) could not be notified; they will be retried next scan.",
            report.undelivered
        ));
    }
    if report.store_failures > 0 {
        text.push_str(&format!(
            "\n⚠️ {} warning(s) could not be saved; those members will be retried next scan.",
            report.store_failures
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_summary_reports_undelivered_and_unsaved() {
        assert_eq!(scan_summary(&ScanReport::default()), NO_INACTIVE_REPLY);

        let report = ScanReport {
            undelivered: 2,
            ..Default::default()
        };
        let text = scan_summary(&report);
        assert!(text.starts_with("🔎 Scan complete: 0 member(s) warned."));
        assert!(text.contains("2 member(s) could not be notified"));
        assert!(!text.contains("could not be saved"));

        let report = ScanReport {
            warned: 1,
            store_failures: 1,
            ..Default::default()
        };
        let text = scan_summary(&report);
        assert!(text.contains("1 member(s) warned"));
        assert!(text.contains("1 warning(s) could not be saved"));
    }
}
