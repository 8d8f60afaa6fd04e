use portfolio_common::session::SessionStore;
#[cfg(target_family = "wasm")]
use portfolio_common::session::STORAGE_KEY;

/// `window.localStorage` under the chat cache key.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStore;

#[cfg(target_family = "wasm")]
fn storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

#[cfg(target_family = "wasm")]
impl SessionStore for LocalStore {
    fn load(&self) -> Option<String> {
        storage()?.get_item(STORAGE_KEY).ok().flatten()
    }

    fn save(&self, raw: &str) {
        let Some(storage) = storage() else { return };
        if let Err(e) = storage.set_item(STORAGE_KEY, raw) {
            tracing::warn!("Failed to cache chat transcript: {:?}", e);
        }
    }

    fn clear(&self) {
        if let Some(storage) = storage() {
            let _ = storage.remove_item(STORAGE_KEY);
        }
    }
}

// Non-WASM stub: nothing survives a reload off the web.
#[cfg(not(target_family = "wasm"))]
impl SessionStore for LocalStore {
    fn load(&self) -> Option<String> {
        None
    }

    fn save(&self, _raw: &str) {}

    fn clear(&self) {}
}
