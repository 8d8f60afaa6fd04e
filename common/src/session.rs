//! Short-lived local cache of the chat transcript.
//!
//! The whole transcript is rewritten on every change with a fresh five-minute
//! expiry. Records are decoded defensively: anything that is not an object
//! with a numeric `expiresAt` and a well-formed `messages` array is treated as
//! absent and removed.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;
use crate::wire::parse_json;

/// Local-storage key holding the cached transcript.
pub const STORAGE_KEY: &str = "portfolio_chat_v1";

/// How long a cached transcript survives without activity (5 minutes).
pub const TTL_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCacheEntry {
    /// Absolute expiry as Unix milliseconds.
    pub expires_at: i64,
    pub messages: Vec<Message>,
}

impl SessionCacheEntry {
    pub fn new(messages: Vec<Message>, now_ms: i64) -> Self {
        Self {
            expires_at: now_ms + TTL_MS,
            messages,
        }
    }

    /// Decode a stored record, rejecting anything with the wrong shape.
    pub fn decode(raw: &str) -> Option<Self> {
        let value = parse_json(raw)?;
        let obj = value.as_object()?;
        let expires_at = obj.get("expiresAt").and_then(as_millis)?;
        let messages = obj.get("messages")?;
        if !messages.is_array() {
            return None;
        }
        let messages: Vec<Message> = serde_json::from_value(messages.clone()).ok()?;
        Some(Self {
            expires_at,
            messages,
        })
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn is_live(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at
    }
}

fn as_millis(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

/// Backing store for the cached transcript.
///
/// Implemented over `window.localStorage` in the browser and by [`MemoryStore`]
/// everywhere else.
pub trait SessionStore {
    fn load(&self) -> Option<String>;
    fn save(&self, raw: &str);
    fn clear(&self);
}

/// In-process store used natively and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: RefCell<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> Option<String> {
        self.slot.borrow().clone()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Option<String> {
        self.raw()
    }

    fn save(&self, raw: &str) {
        *self.slot.borrow_mut() = Some(raw.to_string());
    }

    fn clear(&self) {
        self.slot.borrow_mut().take();
    }
}

/// Load the cached transcript if it is present, well-formed and not yet
/// expired. Stale or malformed records are removed from the store.
pub fn restore(store: &impl SessionStore, now_ms: i64) -> Option<SessionCacheEntry> {
    let entry = store.load().and_then(|raw| SessionCacheEntry::decode(&raw));
    match entry {
        Some(entry) if entry.is_live(now_ms) => Some(entry),
        _ => {
            store.clear();
            None
        }
    }
}

/// Overwrite the cache with `messages` and return the new expiry.
pub fn persist(
    store: &impl SessionStore,
    messages: &[Message],
    now_ms: i64,
) -> serde_json::Result<i64> {
    let entry = SessionCacheEntry::new(messages.to_vec(), now_ms);
    store.save(&entry.encode()?);
    Ok(entry.expires_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    const NOW: i64 = 1_700_000_000_000;

    fn transcript() -> Vec<Message> {
        vec![
            Message::welcome(),
            Message::user(NOW, "Hello"),
            Message::bot(NOW + 1, "Hi there"),
        ]
    }

    #[test]
    fn reload_within_ttl_restores_identical_sequence() {
        let store = MemoryStore::new();
        let expires = persist(&store, &transcript(), NOW).unwrap();
        assert_eq!(expires, NOW + TTL_MS);

        let entry = restore(&store, NOW + TTL_MS - 1).expect("entry should still be live");
        assert_eq!(entry.messages, transcript());
        assert!(store.raw().is_some());
    }

    #[test]
    fn reload_after_ttl_discards_entry() {
        let store = MemoryStore::new();
        persist(&store, &transcript(), NOW).unwrap();

        assert!(restore(&store, NOW + TTL_MS).is_none());
        assert!(store.raw().is_none());
    }

    #[test]
    fn malformed_records_are_dropped() {
        for raw in [
            "not json",
            "[]",
            r#"{"expiresAt":"soon","messages":[]}"#,
            r#"{"expiresAt":9999999999999,"messages":{}}"#,
            r#"{"expiresAt":9999999999999,"messages":[{"id":"1","from":"robot","text":"x"}]}"#,
        ] {
            let store = MemoryStore::new();
            store.save(raw);
            assert!(restore(&store, NOW).is_none(), "accepted {raw}");
            assert!(store.raw().is_none());
        }
    }

    #[test]
    fn decodes_records_written_by_the_browser() {
        let raw = r#"{"expiresAt":1700000300000.0,"messages":[{"id":"welcome","from":"bot","text":"Hi"}]}"#;
        let entry = SessionCacheEntry::decode(raw).unwrap();
        assert_eq!(entry.expires_at, 1_700_000_300_000);
        assert_eq!(entry.messages.len(), 1);
        assert!(entry.encode().unwrap().contains("\"expiresAt\":1700000300000"));
    }
}
