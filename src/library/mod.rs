//! Browsing and "save to notes" helpers over the stored collections.

use crate::models::{Folder, HistoryItem, HistoryKind, Note, GENERAL_FOLDER_ID};
use crate::util::{contains_ignore_case, new_id};
use std::collections::BTreeSet;

mod export;

pub use export::*;

/// Notes list filter. `None` means "all".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub folder: Option<String>,
    pub tag: Option<String>,
    pub search: String,
}

impl NoteFilter {
    pub fn matches(&self, note: &Note) -> bool {
        let folder_ok = self.folder.as_deref().map_or(true, |f| note.folder_id == f);
        let tag_ok = self
            .tag
            .as_deref()
            .map_or(true, |t| note.tags.iter().any(|x| x == t));
        let query = self.search.trim();
        let search_ok =
            contains_ignore_case(&note.title, query) || contains_ignore_case(&note.content, query);
        folder_ok && tag_ok && search_ok
    }

    /// Matching notes, newest first.
    pub fn apply<'a>(&self, notes: &'a [Note]) -> Vec<&'a Note> {
        let mut out: Vec<&Note> = notes.iter().filter(|n| self.matches(n)).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}

/// Every distinct tag, in first-seen order.
pub fn all_tags(notes: &[Note]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    notes
        .iter()
        .flat_map(|n| n.tags.iter())
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

/// History entries of `kind` (all when `None`) whose title contains `search`,
/// newest first.
pub fn filter_history<'a>(
    history: &'a [HistoryItem],
    kind: Option<HistoryKind>,
    search: &str,
) -> Vec<&'a HistoryItem> {
    let query = search.trim();
    let mut out: Vec<&HistoryItem> = history
        .iter()
        .filter(|h| kind.map_or(true, |k| h.kind() == k))
        .filter(|h| contains_ignore_case(h.title(), query))
        .collect();
    out.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    out
}

/// Where a "save to notes" action puts its note.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveTarget {
    pub folder_id: String,
    /// Folder to create first, when the user typed a new name.
    pub new_folder: Option<Folder>,
}

/// Resolves the save dialog choice. A new folder name wins over a selection;
/// an empty or unknown selection falls back to `general`.
pub fn resolve_save_target(
    folders: &[Folder],
    selected: Option<&str>,
    new_folder_name: Option<&str>,
) -> SaveTarget {
    if let Some(name) = new_folder_name.map(str::trim).filter(|n| !n.is_empty()) {
        let folder = Folder {
            id: new_id(),
            name: name.to_string(),
        };
        return SaveTarget {
            folder_id: folder.id.clone(),
            new_folder: Some(folder),
        };
    }

    let folder_id = selected
        .map(str::trim)
        .filter(|id| !id.is_empty() && folders.iter().any(|f| f.id == *id))
        .unwrap_or(GENERAL_FOLDER_ID)
        .to_string();
    SaveTarget {
        folder_id,
        new_folder: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseStudy, CaseStudyRecord, ChatSession};

    fn note(id: &str, folder: &str, tags: &[&str], created_at: i64) -> Note {
        Note {
            id: id.into(),
            title: format!("Title {id}"),
            content: format!("content about {id}"),
            created_at,
            last_edited_at: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            folder_id: folder.into(),
        }
    }

    #[test]
    fn test_note_filter_combines_criteria_newest_first() {
        let notes = vec![
            note("glaucoma", "f1", &["exam"], 1),
            note("cornea", "f1", &["exam", "anterior"], 3),
            note("retina", "general", &["exam"], 2),
        ];

        let all = NoteFilter::default().apply(&notes);
        let ids: Vec<&str> = all.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["cornea", "retina", "glaucoma"]);

        let filter = NoteFilter {
            folder: Some("f1".into()),
            tag: Some("exam".into()),
            search: "GLAU".into(),
        };
        let hits = filter.apply(&notes);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "glaucoma");
    }

    #[test]
    fn test_all_tags_distinct_in_order() {
        let notes = vec![note("a", "g", &["exam", "lens"], 1), note("b", "g", &["lens", "cornea"], 2)];
        assert_eq!(all_tags(&notes), vec!["exam", "lens", "cornea"]);
    }

    #[test]
    fn test_filter_history_by_kind_and_title() {
        let history = vec![
            HistoryItem::Chat(ChatSession {
                id: "c1".into(),
                title: "Optic nerve".into(),
                created_at: 1,
                messages: vec![],
            }),
            HistoryItem::CaseStudy(CaseStudyRecord {
                id: "k1".into(),
                title: "Optic neuritis case".into(),
                created_at: 5,
                case_data: CaseStudy {
                    case_title: "Optic neuritis case".into(),
                    patient_summary: String::new(),
                    sections: vec![],
                },
            }),
        ];
        let all = filter_history(&history, None, "optic");
        assert_eq!(all[0].id(), "k1");
        assert_eq!(all.len(), 2);

        let chats = filter_history(&history, Some(HistoryKind::Chat), "");
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id(), "c1");
    }

    #[test]
    fn test_save_target_falls_back_to_general() {
        let folders = vec![Folder::general(), Folder { id: "f1".into(), name: "Lens".into() }];
        assert_eq!(resolve_save_target(&folders, None, None).folder_id, GENERAL_FOLDER_ID);
        assert_eq!(resolve_save_target(&folders, Some(""), Some("  ")).folder_id, GENERAL_FOLDER_ID);
        assert_eq!(resolve_save_target(&folders, Some("ghost"), None).folder_id, GENERAL_FOLDER_ID);

        let picked = resolve_save_target(&folders, Some("f1"), None);
        assert_eq!(picked.folder_id, "f1");
        assert!(picked.new_folder.is_none());
    }

    #[test]
    fn test_save_target_new_folder_wins() {
        let folders = vec![Folder::general()];
        let target = resolve_save_target(&folders, Some("general"), Some(" Contact Lenses "));
        let created = target.new_folder.expect("new folder");
        assert_eq!(created.name, "Contact Lenses");
        assert_eq!(target.folder_id, created.id);
        assert!(!target.folder_id.is_empty());
    }
}
