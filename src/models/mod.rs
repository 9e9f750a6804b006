use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

mod artifacts;

pub use artifacts::*;

pub const GENERAL_FOLDER_ID: &str = "general";
pub const GENERAL_FOLDER_NAME: &str = "General";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Older entries may lack a folder; they belong to `general`.
    #[serde(default = "general_folder_id")]
    pub folder_id: String,
}

fn general_folder_id() -> String {
    GENERAL_FOLDER_ID.to_string()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Folder {
    pub id: String,
    pub name: String,
}

impl Folder {
    pub fn general() -> Self {
        Self {
            id: GENERAL_FOLDER_ID.to_string(),
            name: GENERAL_FOLDER_NAME.to_string(),
        }
    }

    pub fn is_general(&self) -> bool {
        self.id == GENERAL_FOLDER_ID
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageAuthor {
    User,
    Ai,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CanvasState {
    #[default]
    Generating,
    Ready,
}

/// Canvas sub-document attached to an assistant message.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CanvasData {
    #[serde(default)]
    pub state: CanvasState,
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub author: MessageAuthor,
    #[serde(default)]
    pub text: String,
    /// `data:<mime>;base64,<payload>` of an attached image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, rename = "canvaData", skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CanvasData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_questions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub generating_suggestions: bool,
}

impl ChatMessage {
    pub fn new(author: MessageAuthor, text: impl Into<String>) -> Self {
        Self {
            id: crate::util::new_id(),
            author,
            text: text.into(),
            image_url: None,
            canvas: None,
            suggested_questions: None,
            generating_suggestions: false,
        }
    }

    pub fn with_image(mut self, data_url: Option<String>) -> Self {
        self.image_url = data_url;
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyRecord {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub case_data: CaseStudy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
pub enum HistoryKind {
    #[strum(serialize = "chat")]
    Chat,
    #[strum(serialize = "case-study")]
    CaseStudy,
}

/// One entry of the history log.
///
/// The `type` tag and the payload always agree: they are the same enum variant.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum HistoryItem {
    #[serde(rename = "chat")]
    Chat(ChatSession),
    #[serde(rename = "case-study")]
    CaseStudy(CaseStudyRecord),
}

impl HistoryItem {
    pub fn id(&self) -> &str {
        match self {
            HistoryItem::Chat(s) => &s.id,
            HistoryItem::CaseStudy(c) => &c.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            HistoryItem::Chat(s) => &s.title,
            HistoryItem::CaseStudy(c) => &c.title,
        }
    }

    pub fn created_at(&self) -> i64 {
        match self {
            HistoryItem::Chat(s) => s.created_at,
            HistoryItem::CaseStudy(c) => c.created_at,
        }
    }

    pub fn kind(&self) -> HistoryKind {
        match self {
            HistoryItem::Chat(_) => HistoryKind::Chat,
            HistoryItem::CaseStudy(_) => HistoryKind::CaseStudy,
        }
    }

    pub(crate) fn set_title(&mut self, title: String) {
        match self {
            HistoryItem::Chat(s) => s.title = title,
            HistoryItem::CaseStudy(c) => c.title = title,
        }
    }

    pub fn as_chat(&self) -> Option<&ChatSession> {
        match self {
            HistoryItem::Chat(s) => Some(s),
            HistoryItem::CaseStudy(_) => None,
        }
    }

    pub fn as_case_study(&self) -> Option<&CaseStudyRecord> {
        match self {
            HistoryItem::CaseStudy(c) => Some(c),
            HistoryItem::Chat(_) => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    Pro,
    Trial,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_start_date: Option<i64>,
}

/// A stored Flows run: the topic plus every card fetched for it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlowSession {
    pub id: String,
    pub topic: String,
    pub created_at: i64,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_item_uses_type_tag() {
        let raw = json!([
            {
                "id": "c1",
                "type": "chat",
                "title": "Retina basics",
                "createdAt": 10,
                "messages": [{"id": "m1", "author": "user", "text": "what is retina?"}]
            },
            {
                "id": "k1",
                "type": "case-study",
                "title": "Red eye",
                "createdAt": 5,
                "caseData": {"caseTitle": "Red eye", "patientSummary": "A 30-year-old.", "sections": []}
            }
        ]);

        let items: Vec<HistoryItem> = serde_json::from_value(raw).expect("history should decode");
        assert_eq!(items[0].kind(), HistoryKind::Chat);
        assert_eq!(items[1].kind(), HistoryKind::CaseStudy);
        assert_eq!(items[0].as_chat().map(|c| c.messages.len()), Some(1));
        assert!(items[1].as_chat().is_none());

        let back = serde_json::to_value(&items[1]).expect("encode");
        assert_eq!(back["type"], "case-study");
        assert_eq!(back["caseData"]["caseTitle"], "Red eye");
    }

    #[test]
    fn test_set_title_keeps_variant() {
        let mut item = HistoryItem::Chat(ChatSession {
            id: "c1".into(),
            title: "New Chat".into(),
            created_at: 1,
            messages: vec![],
        });
        item.set_title("Glaucoma drugs".into());
        assert_eq!(item.kind(), HistoryKind::Chat);
        assert_eq!(item.title(), "Glaucoma drugs");
    }

    #[test]
    fn test_note_without_folder_defaults_to_general() {
        let note: Note = serde_json::from_value(json!({
            "id": "n1",
            "title": "Keratoconus",
            "content": "# Keratoconus",
            "createdAt": 1
        }))
        .expect("note should decode");
        assert_eq!(note.folder_id, GENERAL_FOLDER_ID);
        assert!(note.tags.is_empty());
        assert_eq!(note.last_edited_at, None);
    }

    #[test]
    fn test_chat_message_wire_names() {
        let mut msg = ChatMessage::new(MessageAuthor::Ai, "hello");
        msg.canvas = Some(CanvasData {
            topic: "Uveitis".into(),
            ..CanvasData::default()
        });
        let value = serde_json::to_value(&msg).expect("encode");
        assert_eq!(value["author"], "ai");
        assert_eq!(value["canvaData"]["state"], "generating");
        assert!(value.get("generatingSuggestions").is_none());
        assert!(value.get("imageUrl").is_none());
    }

    #[test]
    fn test_user_tier_wire_format() {
        let user: User =
            serde_json::from_value(json!({"username": "asha", "tier": "trial", "trialStartDate": 42}))
                .expect("user should decode");
        assert_eq!(user.tier, Tier::Trial);
        assert_eq!(user.trial_start_date, Some(42));
        assert_eq!(Tier::Pro.to_string(), "pro");
    }

    #[test]
    fn test_history_kind_display() {
        assert_eq!(HistoryKind::CaseStudy.to_string(), "case-study");
        assert_eq!(HistoryKind::Chat.as_ref(), "chat");
    }
}
