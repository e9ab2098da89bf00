//! Log Redaction
//!
//! Scrubs Telegram bot tokens from strings prior to logging. Transport errors
//! can echo the request URL, which carries the token.

use regex::Regex;
use std::sync::LazyLock;

static BOT_TOKEN_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d{5,}:[A-Za-z0-9_-]{20,}").ok());

/// Replace anything shaped like a bot token with a marker.
pub fn redact_sensitive_data(input: &str) -> String {
    match BOT_TOKEN_RE.as_ref() {
        Some(re) => re.replace_all(input, "[REDACTED_TOKEN]").into_owned(),
        None => input.to_string(),
    }
}
