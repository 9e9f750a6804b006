//! Local persistence.
//!
//! Named keys map to JSON documents. [`KeyValueStorage`] is the seam: the
//! browser build uses `window.localStorage`, tests use [`MemoryStorage`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use thiserror::Error;

mod store;

pub use store::StudyStore;

pub(crate) const NOTES_KEY: &str = "studyNotes";
pub(crate) const FOLDERS_KEY: &str = "studyFolders";
pub(crate) const HISTORY_KEY: &str = "focus-ai-history";
pub(crate) const FLOWS_HISTORY_KEY: &str = "flowsHistory";
pub(crate) const USER_KEY: &str = "focus-ai-user";
pub(crate) const ANNOUNCEMENT_KEY: &str = "focus-ai-dismissed-announcement";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("local storage is unavailable")]
    Unavailable,
    #[error("could not write `{key}`: {reason}")]
    Write { key: String, reason: String },
    #[error("could not encode `{key}`: {reason}")]
    Encode { key: String, reason: String },
}

impl StorageError {
    /// Text for the blocking alert shown after a failed write.
    pub fn user_message(&self) -> String {
        match self {
            StorageError::Unavailable => {
                "Your browser storage is unavailable. Changes will be lost when you close this tab."
                    .to_string()
            }
            StorageError::Write { .. } | StorageError::Encode { .. } => {
                "Could not save your changes. Browser storage may be full; your work stays available until you close this tab."
                    .to_string()
            }
        }
    }
}

pub type StoreResult<T = ()> = Result<T, StorageError>;

/// Tracks consecutive failed writes. Only the first failure after a success
/// should interrupt the user; the run ends at the next successful write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FailureEpisode {
    failing: bool,
}

impl FailureEpisode {
    /// Records `result`. `true` when it is a failure that opens a new run.
    pub fn observe<T>(&mut self, result: &StoreResult<T>) -> bool {
        let opens = result.is_err() && !self.failing;
        self.failing = result.is_err();
        opens
    }

    pub fn is_failing(&self) -> bool {
        self.failing
    }
}

pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> StoreResult;
    fn remove_item(&self, key: &str) -> StoreResult;
}

/// `window.localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> StoreResult<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or(StorageError::Unavailable)
    }
}

fn js_reason(e: wasm_bindgen::JsValue) -> String {
    e.as_string()
        .or_else(|| {
            js_sys::Reflect::get(&e, &"name".into())
                .ok()
                .and_then(|n| n.as_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

impl KeyValueStorage for BrowserStorage {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Self::storage()?
            .get_item(key)
            .map_err(|_| StorageError::Unavailable)
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                reason: js_reason(e),
            })
    }

    fn remove_item(&self, key: &str) -> StoreResult {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                reason: js_reason(e),
            })
    }
}

/// In-process map. `fail_writes` simulates a full or disabled storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
    fail_writes: RefCell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(self, key: &str, value: &str) -> Self {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult {
        if *self.fail_writes.borrow() {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: "QuotaExceededError".to_string(),
            });
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult {
        if *self.fail_writes.borrow() {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: "QuotaExceededError".to_string(),
            });
        }
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Reads a JSON array, keeping every entry that decodes as `T`.
///
/// Missing keys, unreadable storage and non-array documents yield `None`;
/// undecodable entries are dropped with a warning.
pub(crate) fn load_list<S: KeyValueStorage, T: DeserializeOwned>(
    storage: &S,
    key: &str,
) -> Option<Vec<T>> {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("event=storage_load module=storage status=error key={key} reason={e}");
            return None;
        }
    };
    let values: Vec<Value> = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("event=storage_load module=storage status=error key={key} reason={e}");
            return None;
        }
    };

    let total = values.len();
    let items: Vec<T> = values
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    if items.len() != total {
        log::warn!(
            "event=storage_load module=storage status=partial key={key} dropped={}",
            total - items.len()
        );
    }
    Some(items)
}

pub(crate) fn load_json<S: KeyValueStorage, T: DeserializeOwned>(storage: &S, key: &str) -> Option<T> {
    let raw = storage.get_item(key).ok().flatten()?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("event=storage_load module=storage status=error key={key} reason={e}");
            None
        }
    }
}

pub(crate) fn save_json<S: KeyValueStorage, T: Serialize + ?Sized>(
    storage: &S,
    key: &str,
    value: &T,
) -> StoreResult {
    let json = serde_json::to_string(value).map_err(|e| StorageError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    storage.set_item(key, &json).inspect_err(|e| {
        log::error!("event=storage_write module=storage status=error key={key} reason={e}");
    })
}
