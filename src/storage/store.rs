use super::{
    load_json, load_list, save_json, KeyValueStorage, StoreResult, ANNOUNCEMENT_KEY, FLOWS_HISTORY_KEY,
    FOLDERS_KEY, HISTORY_KEY, NOTES_KEY, USER_KEY,
};
use crate::models::{
    ChatMessage, Flow, FlowSession, Folder, HistoryItem, Note, Tier, User, GENERAL_FOLDER_ID,
};

/// In-memory copy of every persisted collection.
///
/// Mutations change memory first, then rewrite the whole collection. A failed
/// write is returned to the caller but the in-memory state keeps the change,
/// so the current session is not degraded.
#[derive(Debug)]
pub struct StudyStore<S: KeyValueStorage> {
    backend: S,
    notes: Vec<Note>,
    folders: Vec<Folder>,
    history: Vec<HistoryItem>,
    flow_sessions: Vec<FlowSession>,
}

impl<S: KeyValueStorage> StudyStore<S> {
    /// Loads every collection. Missing or unreadable data yields defaults.
    pub fn load(backend: S) -> Self {
        let notes = load_list(&backend, NOTES_KEY).unwrap_or_default();
        let mut folders: Vec<Folder> = load_list(&backend, FOLDERS_KEY).unwrap_or_default();
        if !folders.iter().any(Folder::is_general) {
            folders.insert(0, Folder::general());
        }
        let history = load_list(&backend, HISTORY_KEY).unwrap_or_default();
        let flow_sessions = load_list(&backend, FLOWS_HISTORY_KEY).unwrap_or_default();

        let store = Self {
            backend,
            notes,
            folders,
            history,
            flow_sessions,
        };
        log::info!(
            "event=store_load module=storage status=ok notes={} folders={} history={} flows={}",
            store.notes.len(),
            store.folders.len(),
            store.history.len(),
            store.flow_sessions.len()
        );
        store
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn history(&self) -> &[HistoryItem] {
        &self.history
    }

    pub fn flow_sessions(&self) -> &[FlowSession] {
        &self.flow_sessions
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn history_item(&self, id: &str) -> Option<&HistoryItem> {
        self.history.iter().find(|h| h.id() == id)
    }

    pub fn has_folder(&self, id: &str) -> bool {
        self.folders.iter().any(|f| f.id == id)
    }

    // --- notes ---

    fn save_notes(&self) -> StoreResult {
        save_json(&self.backend, NOTES_KEY, &self.notes)
    }

    /// Adds `note` at the front. Unknown folder ids fall back to `general`.
    pub fn insert_note(&mut self, mut note: Note) -> StoreResult {
        if !self.has_folder(&note.folder_id) {
            note.folder_id = GENERAL_FOLDER_ID.to_string();
        }
        self.notes.insert(0, note);
        self.save_notes()
    }

    pub fn update_note(&mut self, id: &str, title: &str, content: &str, now_ms: i64) -> StoreResult {
        if let Some(note) = self.notes.iter_mut().find(|n| n.id == id) {
            note.title = title.to_string();
            note.content = content.to_string();
            note.last_edited_at = Some(now_ms);
        }
        self.save_notes()
    }

    pub fn add_tag(&mut self, id: &str, tag: &str) -> StoreResult {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(());
        }
        if let Some(note) = self.notes.iter_mut().find(|n| n.id == id) {
            if !note.tags.iter().any(|t| t == tag) {
                note.tags.push(tag.to_string());
            }
        }
        self.save_notes()
    }

    pub fn remove_tag(&mut self, id: &str, tag: &str) -> StoreResult {
        if let Some(note) = self.notes.iter_mut().find(|n| n.id == id) {
            note.tags.retain(|t| t != tag);
        }
        self.save_notes()
    }

    pub fn move_note(&mut self, id: &str, folder_id: &str) -> StoreResult {
        let target = if self.has_folder(folder_id) {
            folder_id.to_string()
        } else {
            GENERAL_FOLDER_ID.to_string()
        };
        if let Some(note) = self.notes.iter_mut().find(|n| n.id == id) {
            note.folder_id = target;
        }
        self.save_notes()
    }

    pub fn delete_note(&mut self, id: &str) -> StoreResult {
        self.notes.retain(|n| n.id != id);
        self.save_notes()
    }

    // --- folders ---

    fn save_folders(&self) -> StoreResult {
        save_json(&self.backend, FOLDERS_KEY, &self.folders)
    }

    pub fn insert_folder(&mut self, folder: Folder) -> StoreResult {
        if self.has_folder(&folder.id) {
            return Ok(());
        }
        self.folders.push(folder);
        self.save_folders()
    }

    pub fn rename_folder(&mut self, id: &str, name: &str) -> StoreResult {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }
        if let Some(folder) = self.folders.iter_mut().find(|f| f.id == id) {
            folder.name = name.to_string();
        }
        self.save_folders()
    }

    /// Removes a folder and moves its notes to `general`.
    ///
    /// Returns `Ok(false)` for `general` itself or an unknown id; nothing changes.
    pub fn delete_folder(&mut self, id: &str) -> StoreResult<bool> {
        if id == GENERAL_FOLDER_ID || !self.has_folder(id) {
            return Ok(false);
        }
        self.folders.retain(|f| f.id != id);
        let mut moved = 0usize;
        for note in self.notes.iter_mut().filter(|n| n.folder_id == id) {
            note.folder_id = GENERAL_FOLDER_ID.to_string();
            moved += 1;
        }
        log::info!("event=folder_delete module=storage status=ok reassigned={moved}");

        let folders = self.save_folders();
        let notes = if moved > 0 { self.save_notes() } else { Ok(()) };
        folders.and(notes).map(|_| true)
    }

    // --- history ---

    fn save_history(&self) -> StoreResult {
        if self.history.is_empty() {
            self.backend.remove_item(HISTORY_KEY)
        } else {
            save_json(&self.backend, HISTORY_KEY, &self.history)
        }
    }

    pub fn insert_history(&mut self, item: HistoryItem) -> StoreResult {
        self.history.retain(|h| h.id() != item.id());
        self.history.insert(0, item);
        self.save_history()
    }

    pub fn rename_history(&mut self, id: &str, title: &str) -> StoreResult {
        if let Some(item) = self.history.iter_mut().find(|h| h.id() == id) {
            item.set_title(title.to_string());
        }
        self.save_history()
    }

    /// Appends to a chat session. Other history variants are left untouched.
    pub fn push_chat_message(&mut self, session_id: &str, message: ChatMessage) -> StoreResult {
        let session = self.history.iter_mut().find_map(|h| match h {
            HistoryItem::Chat(s) if s.id == session_id => Some(s),
            _ => None,
        });
        match session {
            Some(s) => {
                s.messages.push(message);
                self.save_history()
            }
            None => Ok(()),
        }
    }

    pub fn update_chat_message(
        &mut self,
        session_id: &str,
        message_id: &str,
        update: impl FnOnce(&mut ChatMessage),
    ) -> StoreResult {
        let message = self.history.iter_mut().find_map(|h| match h {
            HistoryItem::Chat(s) if s.id == session_id => {
                s.messages.iter_mut().find(|m| m.id == message_id)
            }
            _ => None,
        });
        match message {
            Some(m) => {
                update(m);
                self.save_history()
            }
            None => Ok(()),
        }
    }

    pub fn delete_history(&mut self, id: &str) -> StoreResult {
        self.history.retain(|h| h.id() != id);
        self.save_history()
    }

    // --- flows ---

    fn save_flow_sessions(&self) -> StoreResult {
        save_json(&self.backend, FLOWS_HISTORY_KEY, &self.flow_sessions)
    }

    pub fn insert_flow_session(&mut self, session: FlowSession) -> StoreResult {
        self.flow_sessions.insert(0, session);
        self.save_flow_sessions()
    }

    /// Replaces the cards of a stored run, e.g. after more were fetched.
    pub fn update_flow_session(&mut self, id: &str, flows: Vec<Flow>) -> StoreResult {
        if let Some(session) = self.flow_sessions.iter_mut().find(|s| s.id == id) {
            session.flows = flows;
        }
        self.save_flow_sessions()
    }

    pub fn delete_flow_session(&mut self, id: &str) -> StoreResult {
        self.flow_sessions.retain(|s| s.id != id);
        self.save_flow_sessions()
    }

    // --- user session ---

    pub fn load_user(&self) -> Option<User> {
        load_json(&self.backend, USER_KEY)
    }

    /// Stores the signed-in user. A trial user signing in again under the same
    /// username keeps their original trial start.
    pub fn save_user(&self, mut user: User) -> (User, StoreResult) {
        if user.tier == Tier::Trial {
            if let Some(stored) = self.load_user() {
                if stored.username == user.username && stored.trial_start_date.is_some() {
                    user.trial_start_date = stored.trial_start_date;
                }
            }
        }
        let res = save_json(&self.backend, USER_KEY, &user);
        (user, res)
    }

    pub fn clear_user(&self) -> StoreResult {
        self.backend.remove_item(USER_KEY)
    }

    pub fn announcement_dismissed(&self) -> bool {
        matches!(self.backend.get_item(ANNOUNCEMENT_KEY), Ok(Some(_)))
    }

    pub fn dismiss_announcement(&self) -> StoreResult {
        self.backend.set_item(ANNOUNCEMENT_KEY, "true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseStudy, CaseStudyRecord, ChatSession, MessageAuthor};
    use crate::storage::{MemoryStorage, StorageError};

    fn note(id: &str, folder: &str) -> Note {
        Note {
            id: id.into(),
            title: format!("Note {id}"),
            content: "body".into(),
            created_at: 1,
            last_edited_at: None,
            tags: vec![],
            folder_id: folder.into(),
        }
    }

    fn chat(id: &str, created_at: i64) -> HistoryItem {
        HistoryItem::Chat(ChatSession {
            id: id.into(),
            title: "New Chat".into(),
            created_at,
            messages: vec![],
        })
    }

    #[test]
    fn test_load_empty_storage_yields_defaults() {
        let store = StudyStore::load(MemoryStorage::new());
        assert!(store.notes().is_empty());
        assert_eq!(store.folders(), &[Folder::general()]);
        assert!(store.history().is_empty());
        assert!(store.flow_sessions().is_empty());
    }

    #[test]
    fn test_load_restores_general_folder_if_missing() {
        let backend = MemoryStorage::new().with_item(FOLDERS_KEY, r#"[{"id":"f1","name":"Lens"}]"#);
        let store = StudyStore::load(backend);
        assert!(store.folders()[0].is_general());
        assert!(store.has_folder("f1"));
    }

    #[test]
    fn test_delete_folder_reassigns_notes_to_general() {
        let mut store = StudyStore::load(MemoryStorage::new());
        store
            .insert_folder(Folder { id: "f1".into(), name: "Cornea".into() })
            .expect("folder saved");
        store.insert_note(note("a", "f1")).expect("saved");
        store.insert_note(note("b", "f1")).expect("saved");
        store.insert_note(note("c", GENERAL_FOLDER_ID)).expect("saved");

        assert_eq!(store.delete_folder("f1"), Ok(true));
        assert!(!store.has_folder("f1"));
        assert!(store.notes().iter().all(|n| n.folder_id == GENERAL_FOLDER_ID));

        let reloaded = StudyStore::load(MemoryStorage::new().with_item(
            NOTES_KEY,
            &store.backend().raw(NOTES_KEY).expect("notes persisted"),
        ));
        assert!(reloaded.notes().iter().all(|n| n.folder_id == GENERAL_FOLDER_ID));
    }

    #[test]
    fn test_general_folder_cannot_be_deleted() {
        let mut store = StudyStore::load(MemoryStorage::new());
        assert_eq!(store.delete_folder(GENERAL_FOLDER_ID), Ok(false));
        assert_eq!(store.delete_folder("nope"), Ok(false));
        assert_eq!(store.folders().len(), 1);
    }

    #[test]
    fn test_insert_note_unknown_folder_falls_back() {
        let mut store = StudyStore::load(MemoryStorage::new());
        store.insert_note(note("a", "ghost")).expect("saved");
        assert_eq!(store.notes()[0].folder_id, GENERAL_FOLDER_ID);
    }

    #[test]
    fn test_note_edits_and_tags() {
        let mut store = StudyStore::load(MemoryStorage::new());
        store.insert_note(note("a", GENERAL_FOLDER_ID)).expect("saved");
        store.update_note("a", "Keratoconus", "# KC", 99).expect("saved");
        store.add_tag("a", " cornea ").expect("saved");
        store.add_tag("a", "cornea").expect("saved");
        store.add_tag("a", "exam").expect("saved");
        store.remove_tag("a", "exam").expect("saved");

        let n = store.note("a").expect("note exists");
        assert_eq!(n.title, "Keratoconus");
        assert_eq!(n.last_edited_at, Some(99));
        assert_eq!(n.tags, vec!["cornea".to_string()]);

        store.delete_note("a").expect("saved");
        assert!(store.note("a").is_none());
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let mut store = StudyStore::load(MemoryStorage::new());
        store.backend().set_fail_writes(true);
        let res = store.insert_note(note("a", GENERAL_FOLDER_ID));
        assert!(matches!(res, Err(StorageError::Write { .. })));
        assert_eq!(store.notes().len(), 1);
        assert_eq!(store.backend().raw(NOTES_KEY), None);
    }

    #[test]
    fn test_history_roundtrip_preserves_order_and_timestamps() {
        let mut store = StudyStore::load(MemoryStorage::new());
        store.insert_history(chat("c1", 100)).expect("saved");
        store
            .insert_history(HistoryItem::CaseStudy(CaseStudyRecord {
                id: "k1".into(),
                title: "Red eye".into(),
                created_at: 200,
                case_data: CaseStudy {
                    case_title: "Red eye".into(),
                    patient_summary: String::new(),
                    sections: vec![],
                },
            }))
            .expect("saved");

        let raw = store.backend().raw(HISTORY_KEY).expect("persisted");
        let reloaded = StudyStore::load(MemoryStorage::new().with_item(HISTORY_KEY, &raw));
        let before: Vec<(&str, i64)> = store.history().iter().map(|h| (h.title(), h.created_at())).collect();
        let after: Vec<(&str, i64)> = reloaded.history().iter().map(|h| (h.title(), h.created_at())).collect();
        assert_eq!(before, after);
        assert_eq!(after[0], ("Red eye", 200));
    }

    #[test]
    fn test_chat_messages_only_touch_chat_variant() {
        let mut store = StudyStore::load(MemoryStorage::new());
        store.insert_history(chat("c1", 1)).expect("saved");
        let msg = ChatMessage::new(MessageAuthor::Ai, "");
        let msg_id = msg.id.clone();
        store.push_chat_message("c1", msg).expect("saved");
        store
            .update_chat_message("c1", &msg_id, |m| m.text = "streamed".into())
            .expect("saved");
        store.rename_history("c1", "Optic disc").expect("saved");

        let item = store.history_item("c1").expect("exists");
        assert_eq!(item.title(), "Optic disc");
        let session = item.as_chat().expect("still a chat");
        assert_eq!(session.messages[0].text, "streamed");

        // Unknown session: no-op.
        assert!(store.push_chat_message("k9", ChatMessage::new(MessageAuthor::User, "x")).is_ok());
    }

    #[test]
    fn test_empty_history_removes_key() {
        let mut store = StudyStore::load(MemoryStorage::new());
        store.insert_history(chat("c1", 1)).expect("saved");
        assert!(store.backend().raw(HISTORY_KEY).is_some());
        store.delete_history("c1").expect("saved");
        assert_eq!(store.backend().raw(HISTORY_KEY), None);
    }

    #[test]
    fn test_flow_sessions() {
        let mut store = StudyStore::load(MemoryStorage::new());
        store
            .insert_flow_session(FlowSession {
                id: "s1".into(),
                topic: "Glaucoma".into(),
                created_at: 5,
                flows: vec![],
            })
            .expect("saved");
        let flow = Flow {
            id: "f".into(),
            title: "IOP".into(),
            content: "c".into(),
            sub_topic: "Tonometry".into(),
        };
        store.update_flow_session("s1", vec![flow]).expect("saved");
        assert_eq!(store.flow_sessions()[0].flows.len(), 1);
        store.delete_flow_session("s1").expect("saved");
        assert!(store.flow_sessions().is_empty());
    }

    #[test]
    fn test_save_user_preserves_trial_start_for_same_username() {
        let store = StudyStore::load(MemoryStorage::new());
        let first = User {
            username: "asha".into(),
            tier: Tier::Trial,
            trial_start_date: Some(1_000),
        };
        let (saved, res) = store.save_user(first);
        assert!(res.is_ok());
        assert_eq!(saved.trial_start_date, Some(1_000));

        let again = User {
            trial_start_date: Some(9_000),
            ..saved.clone()
        };
        let (saved, _) = store.save_user(again);
        assert_eq!(saved.trial_start_date, Some(1_000));

        let other = User {
            username: "ravi".into(),
            tier: Tier::Trial,
            trial_start_date: Some(9_000),
        };
        let (saved, _) = store.save_user(other);
        assert_eq!(saved.trial_start_date, Some(9_000));
        assert_eq!(store.load_user(), Some(saved));

        store.clear_user().expect("cleared");
        assert_eq!(store.load_user(), None);
    }

    #[test]
    fn test_announcement_flag() {
        let store = StudyStore::load(MemoryStorage::new());
        assert!(!store.announcement_dismissed());
        store.dismiss_announcement().expect("saved");
        assert!(store.announcement_dismissed());
    }
}
