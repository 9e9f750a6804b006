//! Reactive application state shared through context.
//!
//! # Invariants
//! - Every store mutation goes through [`AppState::persist`]. A failed write
//!   keeps the in-memory change and is logged; the user gets one blocking
//!   alert per run of failures, not one per write.

use crate::config::EnvConfig;
use crate::features::assistant::ChatLog;
use crate::genai::GeminiClient;
use crate::models::{ChatMessage, User};
use crate::storage::{BrowserStorage, FailureEpisode, StorageError, StoreResult, StudyStore};
use crate::util::browser;
use leptos::prelude::*;
use strum::{AsRefStr, Display, EnumIter};

pub(crate) type Store = StudyStore<BrowserStorage>;

/// Workspace tool shown in the main panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, AsRefStr, EnumIter)]
pub enum Tool {
    #[default]
    #[strum(serialize = "AI Assistant")]
    Assistant,
    #[strum(serialize = "Study Notes")]
    Notes,
    #[strum(serialize = "Study Sessions")]
    Sessions,
    #[strum(serialize = "Case Studies")]
    CaseStudies,
    #[strum(serialize = "Quizzes")]
    Quizzes,
    #[strum(serialize = "Flows")]
    Flows,
    #[strum(serialize = "History")]
    History,
}

#[derive(Clone, Copy)]
pub(crate) struct AppState {
    pub config: StoredValue<EnvConfig>,
    pub user: RwSignal<Option<User>>,
    pub store: RwSignal<Store>,

    pub tool: RwSignal<Tool>,
    /// Chat session open in the assistant.
    pub current_chat: RwSignal<Option<String>>,
    /// Folder new study notes are filed under.
    pub active_folder: RwSignal<Option<String>>,
    /// Case study history entry opened from the history list.
    pub opened_case: RwSignal<Option<String>>,
    write_failures: StoredValue<FailureEpisode>,
}

impl AppState {
    pub fn new(config: EnvConfig) -> Self {
        let store = StudyStore::load(BrowserStorage);
        let user = store.load_user();

        Self {
            config: StoredValue::new(config),
            user: RwSignal::new(user),
            store: RwSignal::new(store),
            tool: RwSignal::new(Tool::default()),
            current_chat: RwSignal::new(None),
            active_folder: RwSignal::new(None),
            opened_case: RwSignal::new(None),
            write_failures: StoredValue::new(FailureEpisode::default()),
        }
    }

    pub fn generator(&self) -> GeminiClient {
        self.config.with_value(GeminiClient::from_config)
    }

    /// Applies `change` to the store. `None` means the write failed; the
    /// in-memory change stays either way.
    pub fn persist<T>(&self, change: impl FnOnce(&mut Store) -> StoreResult<T>) -> Option<T> {
        let result = self.store.try_update(change)?;
        self.settle_write(result)
    }

    /// Logs a failed write and alerts only when it opens a run of failures.
    pub fn settle_write<T>(&self, result: StoreResult<T>) -> Option<T> {
        let mut opens = true;
        self.write_failures.update_value(|episode| opens = episode.observe(&result));
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                report_storage_error(&e, opens);
                None
            }
        }
    }

    /// Stores the signed-in user and switches to the workspace.
    pub fn sign_in(&self, user: User) {
        let (user, res) = self.store.with_untracked(|s| s.save_user(user));
        self.settle_write(res);
        self.user.set(Some(user));
    }

    pub fn sign_out(&self) {
        self.settle_write(self.store.with_untracked(|s| s.clear_user()));
        self.current_chat.set(None);
        self.opened_case.set(None);
        self.tool.set(Tool::default());
        self.user.set(None);
        log::info!("event=sign_out module=state status=ok");
    }

    pub fn open_tool(&self, tool: Tool) {
        self.tool.set(tool);
    }
}

/// Logs the failure. With `alert`, blocks on an alert so the user knows their
/// work is only held in this tab.
fn report_storage_error(error: &StorageError, alert: bool) {
    log::error!("event=store_write module=state status=error alerted={alert} reason={error}");
    if alert {
        browser::alert(&error.user_message());
    }
}

impl ChatLog for AppState {
    fn push_message(&self, session_id: &str, message: ChatMessage) {
        self.persist(|s| s.push_chat_message(session_id, message));
    }

    fn update_message(&self, session_id: &str, message_id: &str, update: impl FnOnce(&mut ChatMessage)) {
        self.persist(|s| s.update_chat_message(session_id, message_id, update));
    }

    fn rename_session(&self, session_id: &str, title: &str) {
        self.persist(|s| s.rename_history(session_id, title));
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
