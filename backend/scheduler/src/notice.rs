//! Warning texts sent for an inactive member.
//!
//! Templates use `{days}`, `{threshold}` and (channel only) `{mention}` placeholders.
//! The channel template is trusted HTML from the operator's config file; everything
//! substituted into it is escaped.

use serde::{Deserialize, Serialize};

use idlewatch_core::MemberId;

pub const DEFAULT_PRIVATE_TEMPLATE: &str =
    "⚠️ Hi, you have not participated in the group for {days} days.";

pub const DEFAULT_CHANNEL_TEMPLATE: &str = "⚠️ Inactive member detected: {mention}";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningTemplates {
    pub private: String,
    pub channel: String,
}

impl Default for WarningTemplates {
    fn default() -> Self {
        Self {
            private: DEFAULT_PRIVATE_TEMPLATE.to_string(),
            channel: DEFAULT_CHANNEL_TEMPLATE.to_string(),
        }
    }
}

impl WarningTemplates {
    pub fn render_private(&self, idle_days: i64, threshold_days: u32) -> String {
        self.private
            .replace("{days}", &idle_days.to_string())
            .replace("{threshold}", &threshold_days.to_string())
    }

    pub fn render_channel(&self, member_id: MemberId, idle_days: i64, threshold_days: u32) -> String {
        self.channel
            .replace("{days}", &idle_days.to_string())
            .replace("{threshold}", &threshold_days.to_string())
            .replace("{mention}", &mention_html(member_id, "member"))
    }
}

/// An HTML link that mentions a Telegram user by id.
pub fn mention_html(member_id: MemberId, label: &str) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        member_id.0,
        escape_html(label)
    )
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
