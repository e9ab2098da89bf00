//! Structured logging for idlewatch.
//!
//! Console output plus a daily-rotated JSON file, and scrubbing of bot tokens
//! from text that may end up in a log line.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_sensitive_data;
