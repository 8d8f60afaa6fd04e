//! JSON bodies exchanged between the widget and the relay.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path the relay listens on and the widget posts to.
pub const CHAT_PATH: &str = "/api/chat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Parse `raw` as JSON, yielding `None` for anything that is not valid JSON.
///
/// A `None` means "treat the body as absent"; callers decide what that implies.
pub fn parse_json(raw: &str) -> Option<Value> {
    serde_json::from_str(raw).ok()
}

/// Look up `key` on `value` and return it only if it is a JSON string.
pub fn str_field<'a>(value: Option<&'a Value>, key: &str) -> Option<&'a str> {
    value?.get(key)?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_swallows_garbage() {
        assert!(parse_json("").is_none());
        assert!(parse_json("{not json").is_none());
        assert_eq!(parse_json("3"), Some(Value::from(3)));
    }

    #[test]
    fn str_field_ignores_non_strings() {
        let v = parse_json(r#"{"error":{"message":"x"},"reply":"ok"}"#);
        assert_eq!(str_field(v.as_ref(), "reply"), Some("ok"));
        assert_eq!(str_field(v.as_ref(), "error"), None);
        assert_eq!(str_field(None, "reply"), None);
    }
}
