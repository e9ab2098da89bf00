/// Slash command detection: identify /commands in inbound messages.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::registry::CommandRegistry;
use crate::types::CommandInvocation;

/// `/name`, optionally addressed as `/name@botname`, then the rest of the text.
static COMMAND_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)^(/[A-Za-z0-9_]+)(?:@([A-Za-z0-9_]+))?(?:\s+(.*))?$").ok());

/// Detect a slash command at the start of a message.
///
/// A command addressed to another bot (`/inactive@otherbot`) is not ours and yields
/// `None`, as does any text whose alias is not registered.
pub fn detect_command(
    text: &str,
    registry: &CommandRegistry,
    bot_username: Option<&str>,
) -> Option<CommandInvocation> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let caps = COMMAND_RE.as_ref()?.captures(trimmed)?;
    let alias = caps.get(1)?.as_str();

    if let (Some(target), Some(me)) = (caps.get(2), bot_username) {
        if !target.as_str().eq_ignore_ascii_case(me.trim_start_matches('@')) {
            return None;
        }
    }

    let def = registry.find_by_alias(alias)?;
    let rest = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");

    Some(CommandInvocation {
        key: def.key.clone(),
        raw_alias: alias.to_string(),
        args: rest.split_whitespace().map(str::to_string).collect(),
        raw_args: rest.to_string(),
    })
}
