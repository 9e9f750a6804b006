pub mod account;
mod app;
mod components;
pub mod config;
pub mod features;
pub mod genai;
pub mod library;
pub mod logging;
pub mod models;
pub mod notify;
mod pages;
pub mod prompts;
mod state;
pub mod storage;
pub mod util;
pub mod wizard;

use crate::app::App;
use crate::config::EnvConfig;
use crate::logging::init_logging;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use crate::models::{Folder, Tier, User};
    use crate::storage::{BrowserStorage, KeyValueStorage, StudyStore};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn clear() {
        if let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) {
            let _ = storage.clear();
        }
    }

    #[wasm_bindgen_test]
    fn test_browser_storage_roundtrip() {
        clear();
        let backend = BrowserStorage;
        assert_eq!(backend.get_item("k").expect("read"), None);
        backend.set_item("k", "v").expect("write");
        assert_eq!(backend.get_item("k").expect("read").as_deref(), Some("v"));
        backend.remove_item("k").expect("remove");
        assert_eq!(backend.get_item("k").expect("read"), None);
    }

    #[wasm_bindgen_test]
    fn test_store_survives_reload() {
        clear();
        let mut store = StudyStore::load(BrowserStorage);
        store
            .insert_folder(Folder {
                id: "f1".into(),
                name: "Retina".into(),
            })
            .expect("insert folder");

        let reloaded = StudyStore::load(BrowserStorage);
        let names: Vec<_> = reloaded.folders().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["General", "Retina"]);
    }

    #[wasm_bindgen_test]
    fn test_user_roundtrip() {
        clear();
        let store = StudyStore::load(BrowserStorage);
        let user = User {
            username: "student".into(),
            tier: Tier::Trial,
            trial_start_date: Some(1),
        };
        let (saved, res) = store.save_user(user);
        assert!(res.is_ok());
        assert_eq!(store.load_user(), Some(saved));
        store.clear_user().expect("clear");
        assert_eq!(store.load_user(), None);
    }
}

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    let config = EnvConfig::from_window();
    if let Err(e) = init_logging(&config.log_level) {
        web_sys::console::warn_1(&e.into());
    }
    log::info!(
        "event=config_loaded module=app status=ok model={} accounts={}",
        config.gemini_model,
        config.accounts.len()
    );
    mount_to_body(move || view! { <App config /> });
}
