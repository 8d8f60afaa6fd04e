//! Chat transcript state and the single-flight send cycle.

use std::cell::RefCell;
use std::rc::Rc;

use crate::message::Message;
use crate::session::SessionStore;
use crate::wire::{parse_json, str_field};

/// Longest slice of a non-JSON error body shown to the user.
const RAW_ERROR_PREVIEW_CHARS: usize = 300;

/// Transcript plus the busy flag of one widget instance.
///
/// `messages` only ever grows, except for [`Conversation::reset`] when the
/// cached session expires. `revision` bumps on every transcript change,
/// including resets; `dirty` tells whether the current transcript holds turns
/// that have not come from the cache or the welcome default.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
    busy: bool,
    revision: u64,
    dirty: bool,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::welcome()],
            busy: false,
            revision: 0,
            dirty: false,
        }
    }

    /// Seed from a cached transcript. An empty cache falls back to the welcome turn.
    pub fn restored(messages: Vec<Message>) -> Self {
        if messages.is_empty() {
            return Self::new();
        }
        Self {
            messages,
            busy: false,
            revision: 0,
            dirty: false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True once a turn has been appended since construction or the last reset.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether `input` would start a send right now.
    pub fn accepts(&self, input: &str) -> bool {
        !self.busy && !input.trim().is_empty()
    }

    /// Append the user's turn and mark the conversation busy.
    ///
    /// Returns the trimmed text to forward, or `None` when the input is blank
    /// or a send is already in flight; in that case nothing changes.
    pub fn begin_send(&mut self, input: &str, now_ms: i64) -> Option<String> {
        if !self.accepts(input) {
            return None;
        }
        let text = input.trim().to_string();
        self.push(Message::user(now_ms, text.clone()));
        self.busy = true;
        Some(text)
    }

    /// Append exactly one bot turn for `outcome` and clear the busy flag.
    pub fn finish_send(&mut self, outcome: RelayOutcome, now_ms: i64) {
        let message = match outcome {
            RelayOutcome::Reply(text) => Message::bot(now_ms, text),
            other => Message::bot_error(now_ms, other.display_text()),
        };
        self.push(message);
        self.busy = false;
    }

    /// Back to the welcome-only transcript. An in-flight send keeps the
    /// conversation busy; its reply lands on the fresh transcript.
    pub fn reset(&mut self) {
        self.messages = vec![Message::welcome()];
        self.dirty = false;
        self.revision += 1;
    }

    /// Whether the transcript should be written to the cache, given the
    /// revision seen at the previous check. Restores and resets never are.
    pub fn persist_due(&self, seen_revision: u64) -> bool {
        self.revision != seen_revision && self.dirty
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.dirty = true;
        self.revision += 1;
    }
}

/// What came back from one relay round trip, already folded into
/// something presentable.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    Reply(String),
    /// Relay answered with a non-2xx status.
    Rejected { status: u16, error: String },
    /// Request never produced a readable response.
    Transport(String),
}

impl RelayOutcome {
    /// Classify a relay HTTP response from its status and raw body text.
    pub fn from_response(status: u16, raw: &str) -> Self {
        let data = if raw.is_empty() { None } else { parse_json(raw) };

        if !(200..300).contains(&status) {
            let error = match str_field(data.as_ref(), "error") {
                Some(e) => e.to_string(),
                None if !raw.is_empty() => raw.chars().take(RAW_ERROR_PREVIEW_CHARS).collect(),
                None => "Request failed".to_string(),
            };
            return Self::Rejected { status, error };
        }

        Self::Reply(str_field(data.as_ref(), "reply").unwrap_or_default().to_string())
    }

    pub fn display_text(&self) -> String {
        match self {
            Self::Reply(text) => text.clone(),
            Self::Rejected { status, error } => format!("Request failed ({status}): {error}"),
            Self::Transport(msg) if msg.is_empty() => "Network error".to_string(),
            Self::Transport(msg) => msg.clone(),
        }
    }
}

/// Transport to the chat relay. Implementations must convert every failure
/// into a [`RelayOutcome`] rather than erroring.
#[allow(async_fn_in_trait)]
pub trait ChatRelay {
    async fn send(&self, message: String) -> RelayOutcome;
}

/// Somewhere a [`Conversation`] lives between awaits (a UI signal, a shared cell).
pub trait ConversationCell {
    fn update<T>(&mut self, f: impl FnOnce(&mut Conversation) -> T) -> T;
}

impl ConversationCell for Rc<RefCell<Conversation>> {
    fn update<T>(&mut self, f: impl FnOnce(&mut Conversation) -> T) -> T {
        f(&mut self.borrow_mut())
    }
}

/// Run one send cycle: append the user turn, await the relay once, append the
/// bot turn.
///
/// Returns `false` without touching the relay when the input is blank or a
/// send is already in flight.
pub async fn send<C, R>(cell: &mut C, relay: &R, input: &str, clock: impl Fn() -> i64) -> bool
where
    C: ConversationCell,
    R: ChatRelay,
{
    let Some(text) = cell.update(|c| c.begin_send(input, clock())) else {
        return false;
    };
    let outcome = relay.send(text).await;
    cell.update(|c| c.finish_send(outcome, clock()));
    true
}

/// Expiry action: drop the cached transcript and start over.
pub fn expire(store: &impl SessionStore, cell: &mut impl ConversationCell) {
    store.clear();
    cell.update(Conversation::reset);
}
