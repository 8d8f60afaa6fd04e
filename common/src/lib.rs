pub mod conversation;
pub mod expiry;
pub mod message;
pub mod session;
pub mod wire;

#[cfg(feature = "markdown")]
pub mod markdown;

/// Current wall-clock time as Unix milliseconds.
#[cfg(feature = "std")]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
