use serde::{Deserialize, Serialize};

/// Id of the greeting that opens every fresh transcript.
pub const WELCOME_ID: &str = "welcome";

pub const WELCOME_TEXT: &str = "Hi! I’m your portfolio assistant. How can I help?";

/// Who authored a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One turn in the chat transcript.
///
/// Serialized with the field name `from` so cache records written by earlier
/// builds of the site stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "from")]
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn welcome() -> Self {
        Self {
            id: WELCOME_ID.to_string(),
            sender: Sender::Bot,
            text: WELCOME_TEXT.to_string(),
        }
    }

    pub fn user(now_ms: i64, text: impl Into<String>) -> Self {
        Self {
            id: format!("{now_ms}-user"),
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(now_ms: i64, text: impl Into<String>) -> Self {
        Self {
            id: format!("{now_ms}-bot"),
            sender: Sender::Bot,
            text: text.into(),
        }
    }

    /// Bot turn carrying a failure description instead of a model reply.
    pub fn bot_error(now_ms: i64, text: impl Into<String>) -> Self {
        Self {
            id: format!("{now_ms}-bot-error"),
            sender: Sender::Bot,
            text: text.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}
