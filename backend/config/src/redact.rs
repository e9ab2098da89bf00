//! Config redaction: mask secrets before a config is printed or logged.

use serde_json::Value;

static SENSITIVE_KEYS: &[&str] = &["token", "botToken", "secret", "password"];

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Redact a config JSON value, keeping only a short prefix of each secret.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => {
            let hint: String = s.chars().take(4).collect();
            if s.chars().count() > 8 {
                Value::String(format!("{hint}***"))
            } else {
                Value::String("***".to_string())
            }
        }
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_bot_token() {
        let v = json!({ "telegram": { "token": "1234567890:ABCDEFGH" } });
        let token = redact(&v)["telegram"]["token"].as_str().unwrap().to_string();
        assert_eq!(token, "1234***");
        assert!(!token.contains("ABCDEF"));
    }

    #[test]
    fn passthrough_non_sensitive() {
        let v = json!({ "logging": { "level": "debug" }, "scan": { "intervalSecs": 60 } });
        let redacted = redact(&v);
        assert_eq!(redacted["logging"]["level"], "debug");
        assert_eq!(redacted["scan"]["intervalSecs"], 60);
    }
}
