//! AI assistant chat: streamed answers, follow-up suggestions, automatic
//! titles and canvas documents.

use crate::genai::{
    build_chat_request, collect_stream, generate_structured, GenerationError, GenerationResult,
    TextGenerator,
};
use crate::models::{
    CanvasData, CanvasDocument, CanvasState, ChatMessage, ChatSession, HistoryItem, MessageAuthor,
};
use crate::prompts::{
    canvas_edit_request, canvas_request, chat_system_instruction, chat_title_request,
    suggested_questions_request, AiEditAction, CanvasEditAction,
};
use crate::util::new_id;
use std::ops::Range;

pub const NEW_CHAT_TITLE: &str = "New Chat";
pub const REPLY_FAILED_TEXT: &str = "Sorry, I encountered an error. Please try again.";
pub const CANVAS_FAILED_TEXT: &str = "Failed to generate Canvas. Please try again.";
pub const IMAGE_PROMPT: &str = "Analyze this image.";
pub const MAX_SUGGESTIONS: usize = 3;

pub fn new_chat_session(now_ms: i64) -> HistoryItem {
    HistoryItem::Chat(ChatSession {
        id: new_id(),
        title: NEW_CHAT_TITLE.to_string(),
        created_at: now_ms,
        messages: vec![],
    })
}

/// Where a chat turn writes its messages. Implementors persist each change
/// and report write failures themselves.
pub trait ChatLog {
    fn push_message(&self, session_id: &str, message: ChatMessage);
    fn update_message(&self, session_id: &str, message_id: &str, update: impl FnOnce(&mut ChatMessage));
    fn rename_session(&self, session_id: &str, title: &str);
}

/// One thing the user sends: typed text, an image, or a quick action applied
/// to an earlier answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outgoing {
    pub text: String,
    pub image_url: Option<String>,
    pub edit: Option<AiEditAction>,
}

impl Outgoing {
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
            edit: None,
        }
    }

    pub fn image(data_url: impl Into<String>) -> Self {
        Self {
            text: IMAGE_PROMPT.to_string(),
            image_url: Some(data_url.into()),
            edit: None,
        }
    }

    pub fn edit(action: AiEditAction, answer: impl Into<String>) -> Self {
        Self {
            text: answer.into(),
            image_url: None,
            edit: Some(action),
        }
    }

    /// Text sent to the model.
    pub fn prompt(&self) -> String {
        match self.edit {
            Some(action) => action.apply(&self.text),
            None => self.text.clone(),
        }
    }

    /// Quick actions do not appear as a user bubble.
    pub fn shows_user_message(&self) -> bool {
        self.edit.is_none()
    }

    pub fn names_session(&self, current_title: &str) -> bool {
        self.edit.is_none() && current_title == NEW_CHAT_TITLE
    }
}

/// Runs one chat turn against `session` (its state before the turn).
///
/// The empty assistant message is filled after every streamed chunk. A stream
/// failure replaces the answer with [`REPLY_FAILED_TEXT`]; suggestions and the
/// title are only fetched after a complete answer.
pub async fn send_turn<G, L>(
    generator: &G,
    chat_log: &L,
    session: &ChatSession,
    outgoing: &Outgoing,
    custom_instructions: Option<&str>,
) -> GenerationResult<String>
where
    G: TextGenerator,
    L: ChatLog,
{
    let session_id = session.id.as_str();
    if outgoing.shows_user_message() {
        chat_log.push_message(
            session_id,
            ChatMessage::new(MessageAuthor::User, outgoing.text.clone())
                .with_image(outgoing.image_url.clone()),
        );
    }
    let reply = ChatMessage::new(MessageAuthor::Ai, "");
    let reply_id = reply.id.clone();
    chat_log.push_message(session_id, reply);

    let system = chat_system_instruction(custom_instructions);
    let request = build_chat_request(
        &system,
        &session.messages,
        &outgoing.prompt(),
        outgoing.image_url.as_deref(),
    );
    let answer = collect_stream(generator.stream_text(&request), |text| {
        chat_log.update_message(session_id, &reply_id, |m| m.text = text.to_string());
    })
    .await;

    let answer = match answer {
        Ok(answer) if !answer.trim().is_empty() => answer,
        other => {
            let err = other.err().unwrap_or(GenerationError::Empty);
            log::error!("event=chat_reply module=assistant status=error reason={err}");
            chat_log.update_message(session_id, &reply_id, |m| m.text = REPLY_FAILED_TEXT.to_string());
            return Err(err);
        }
    };

    chat_log.update_message(session_id, &reply_id, |m| m.generating_suggestions = true);
    let suggestions = follow_up_questions(generator, &outgoing.text, &answer).await;
    chat_log.update_message(session_id, &reply_id, |m| {
        m.suggested_questions = Some(suggestions);
        m.generating_suggestions = false;
    });

    if outgoing.names_session(&session.title) {
        let title = chat_title(generator, &outgoing.text).await;
        chat_log.rename_session(session_id, &title);
    }
    log::info!(
        "event=chat_reply module=assistant status=ok session={session_id} chars={}",
        answer.len()
    );
    Ok(answer)
}

/// Up to [`MAX_SUGGESTIONS`] follow-up questions. Any failure yields none.
pub async fn follow_up_questions<G: TextGenerator>(generator: &G, query: &str, answer: &str) -> Vec<String> {
    let request = suggested_questions_request(query, answer);
    match generate_structured::<Vec<String>, _>(generator, &request).await {
        Ok(questions) => questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(MAX_SUGGESTIONS)
            .collect(),
        Err(e) => {
            log::warn!("event=chat_suggestions module=assistant status=error reason={e}");
            vec![]
        }
    }
}

/// Short title for a new chat; falls back to [`NEW_CHAT_TITLE`].
pub async fn chat_title<G: TextGenerator>(generator: &G, first_message: &str) -> String {
    match generator.generate_text(&chat_title_request(first_message)).await {
        Ok(raw) => clean_title(&raw),
        Err(e) => {
            log::warn!("event=chat_title module=assistant status=error reason={e}");
            NEW_CHAT_TITLE.to_string()
        }
    }
}

fn clean_title(raw: &str) -> String {
    let title = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if title.is_empty() {
        NEW_CHAT_TITLE.to_string()
    } else {
        title.to_string()
    }
}

/// Assistant message shown while a canvas is being written.
pub fn canvas_placeholder(topic: &str) -> ChatMessage {
    let mut message = ChatMessage::new(MessageAuthor::Ai, format!("Generating a Canvas on \"{topic}\"..."));
    message.canvas = Some(CanvasData {
        state: CanvasState::Generating,
        topic: topic.to_string(),
        ..CanvasData::default()
    });
    message
}

pub async fn generate_canvas<G: TextGenerator>(generator: &G, topic: &str) -> GenerationResult<CanvasDocument> {
    generate_structured(generator, &canvas_request(topic)).await
}

/// Applies the canvas outcome to its placeholder message.
pub fn settle_canvas(message: &mut ChatMessage, outcome: GenerationResult<CanvasDocument>) {
    match outcome {
        Ok(doc) => {
            let topic = message
                .canvas
                .as_ref()
                .map(|c| c.topic.clone())
                .unwrap_or_default();
            message.text = doc.content.clone();
            message.canvas = Some(CanvasData {
                state: CanvasState::Ready,
                topic,
                title: Some(doc.title),
                description: Some(doc.description),
                content: Some(doc.content),
                message_id: Some(message.id.clone()),
            });
        }
        Err(e) => {
            log::error!("event=canvas module=assistant status=error reason={e}");
            message.text = CANVAS_FAILED_TEXT.to_string();
        }
    }
}

/// Stores hand-edited canvas text on its message.
pub fn set_canvas_content(message: &mut ChatMessage, content: &str) {
    message.text = content.to_string();
    if let Some(canvas) = message.canvas.as_mut() {
        canvas.content = Some(content.to_string());
    }
}

/// Converts a UTF-16 offset (as reported by a browser text area) into a byte
/// offset of `text`. `None` when it falls inside a character or past the end.
pub fn utf16_to_byte(text: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for (byte, ch) in text.char_indices() {
        if units == offset {
            return Some(byte);
        }
        units += ch.len_utf16();
        if units > offset {
            return None;
        }
    }
    (units == offset).then_some(text.len())
}

/// Byte range of a non-empty text area selection.
pub fn selection_range(text: &str, start: usize, end: usize) -> Option<Range<usize>> {
    let (start, end) = (start.min(end), start.max(end));
    let range = utf16_to_byte(text, start)?..utf16_to_byte(text, end)?;
    (!text[range.clone()].trim().is_empty()).then_some(range)
}

/// Rewrites the selected passage with `action` and splices the result back.
/// Returns the whole new document.
pub async fn edit_canvas_selection<G: TextGenerator>(
    generator: &G,
    action: CanvasEditAction,
    content: &str,
    selection: Range<usize>,
) -> GenerationResult<String> {
    let selected = content
        .get(selection.clone())
        .ok_or_else(|| GenerationError::Malformed("selection out of range".into()))?;
    let edited = generator
        .generate_text(&canvas_edit_request(action, selected))
        .await?;
    let edited = edited.trim();
    if edited.is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(format!(
        "{}{}{}",
        &content[..selection.start],
        edited,
        &content[selection.end..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::testing::ScriptedGenerator;
    use crate::storage::{FailureEpisode, MemoryStorage, StoreResult, StudyStore};
    use futures::executor::block_on;
    use std::cell::RefCell;

    impl ChatLog for RefCell<StudyStore<MemoryStorage>> {
        fn push_message(&self, session_id: &str, message: ChatMessage) {
            self.borrow_mut()
                .push_chat_message(session_id, message)
                .expect("write");
        }

        fn update_message(&self, session_id: &str, message_id: &str, update: impl FnOnce(&mut ChatMessage)) {
            self.borrow_mut()
                .update_chat_message(session_id, message_id, update)
                .expect("write");
        }

        fn rename_session(&self, session_id: &str, title: &str) {
            self.borrow_mut()
                .rename_history(session_id, title)
                .expect("write");
        }
    }

    /// Chat log that settles writes the way the app does: one alert per run
    /// of failed writes.
    struct AlertingLog {
        store: RefCell<StudyStore<MemoryStorage>>,
        episode: RefCell<FailureEpisode>,
        alerts: RefCell<usize>,
    }

    impl AlertingLog {
        fn settle(&self, result: StoreResult) {
            if self.episode.borrow_mut().observe(&result) {
                *self.alerts.borrow_mut() += 1;
            }
        }
    }

    impl ChatLog for AlertingLog {
        fn push_message(&self, session_id: &str, message: ChatMessage) {
            let result = self.store.borrow_mut().push_chat_message(session_id, message);
            self.settle(result);
        }

        fn update_message(&self, session_id: &str, message_id: &str, update: impl FnOnce(&mut ChatMessage)) {
            let result = self
                .store
                .borrow_mut()
                .update_chat_message(session_id, message_id, update);
            self.settle(result);
        }

        fn rename_session(&self, session_id: &str, title: &str) {
            let result = self.store.borrow_mut().rename_history(session_id, title);
            self.settle(result);
        }
    }

    fn store_with_chat() -> (RefCell<StudyStore<MemoryStorage>>, ChatSession) {
        let mut store = StudyStore::load(MemoryStorage::new());
        let item = new_chat_session(1);
        let session = item.as_chat().cloned().expect("chat");
        store.insert_history(item).expect("write");
        (RefCell::new(store), session)
    }

    fn messages(store: &RefCell<StudyStore<MemoryStorage>>, id: &str) -> Vec<ChatMessage> {
        store
            .borrow()
            .history_item(id)
            .and_then(|h| h.as_chat())
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_send_turn_streams_then_suggests_and_titles() {
        let (store, session) = store_with_chat();
        let gen = ScriptedGenerator::new()
            .stream(vec![Ok("The retina ".into()), Ok("is neural tissue.".into())])
            .reply(r#"["What are its layers?", "What is the macula?", "Blood supply?", "Extra?"]"#)
            .reply("\"Retina Basics\"");

        let answer = block_on(send_turn(&gen, &store, &session, &Outgoing::typed("what is retina?"), None))
            .expect("reply");
        assert_eq!(answer, "The retina is neural tissue.");

        let msgs = messages(&store, &session.id);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].author, MessageAuthor::User);
        assert_eq!(msgs[1].text, "The retina is neural tissue.");
        assert_eq!(msgs[1].suggested_questions.as_ref().map(Vec::len), Some(MAX_SUGGESTIONS));
        assert!(!msgs[1].generating_suggestions);
        assert_eq!(
            store.borrow().history_item(&session.id).map(|h| h.title().to_string()),
            Some("Retina Basics".to_string())
        );
    }

    #[test]
    fn test_full_storage_alerts_once_per_streamed_reply() {
        let (store, session) = store_with_chat();
        store.borrow().backend().set_fail_writes(true);
        let log = AlertingLog {
            store,
            episode: RefCell::new(FailureEpisode::default()),
            alerts: RefCell::new(0),
        };
        let chunks = ["The ", "optic ", "disc ", "is ", "the ", "blind ", "spot."];
        let gen = ScriptedGenerator::new()
            .stream(chunks.iter().map(|c| Ok(c.to_string())).collect())
            .reply(r#"["Why is it blind?"]"#)
            .reply("\"Optic Disc\"");

        let answer = block_on(send_turn(&gen, &log, &session, &Outgoing::typed("optic disc?"), None))
            .expect("reply");
        assert_eq!(answer, "The optic disc is the blind spot.");
        assert_eq!(*log.alerts.borrow(), 1);
        // Memory keeps every change even though nothing reached storage.
        let msgs = messages(&log.store, &session.id);
        assert_eq!(msgs[1].text, answer);

        log.store.borrow().backend().set_fail_writes(false);
        log.push_message(&session.id, ChatMessage::new(MessageAuthor::User, "thanks"));
        assert!(!log.episode.borrow().is_failing());
        log.store.borrow().backend().set_fail_writes(true);
        log.push_message(&session.id, ChatMessage::new(MessageAuthor::User, "again"));
        assert_eq!(*log.alerts.borrow(), 2);
    }

    #[test]
    fn test_send_turn_failure_sets_error_text() {
        let (store, session) = store_with_chat();
        let gen = ScriptedGenerator::new().stream(vec![
            Ok("partial".into()),
            Err(GenerationError::Network("reset".into())),
        ]);
        let result = block_on(send_turn(&gen, &store, &session, &Outgoing::typed("hi"), None));
        assert!(result.is_err());
        let msgs = messages(&store, &session.id);
        assert_eq!(msgs[1].text, REPLY_FAILED_TEXT);
        assert_eq!(msgs[1].suggested_questions, None);
        assert_eq!(
            store.borrow().history_item(&session.id).map(|h| h.title().to_string()),
            Some(NEW_CHAT_TITLE.to_string())
        );
    }

    #[test]
    fn test_edit_action_hides_user_message_and_keeps_title() {
        let (store, session) = store_with_chat();
        let gen = ScriptedGenerator::new()
            .stream(vec![Ok("Simpler.".into())])
            .fail(GenerationError::Empty);
        let outgoing = Outgoing::edit(AiEditAction::Simplify, "Complex answer");
        block_on(send_turn(&gen, &store, &session, &outgoing, None)).expect("reply");

        let msgs = messages(&store, &session.id);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].suggested_questions, Some(vec![]));
        assert_eq!(gen.seen.borrow()[0].instruction(), "Simplify: \"Complex answer\"");
        assert_eq!(gen.seen.borrow().len(), 2);
    }

    #[test]
    fn test_image_turn_attaches_data_url() {
        let (store, session) = store_with_chat();
        let gen = ScriptedGenerator::new().stream(vec![Ok("A fundus photo.".into())]);
        let outgoing = Outgoing::image("data:image/png;base64,AAAA");
        let _ = block_on(send_turn(&gen, &store, &session, &outgoing, None));
        let msgs = messages(&store, &session.id);
        assert_eq!(msgs[0].text, IMAGE_PROMPT);
        assert_eq!(msgs[0].image_url.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("  \"Glaucoma Drugs\"\n"), "Glaucoma Drugs");
        assert_eq!(clean_title("''"), NEW_CHAT_TITLE);
    }

    #[test]
    fn test_canvas_lifecycle() {
        let mut msg = canvas_placeholder("Uveitis");
        assert_eq!(msg.text, "Generating a Canvas on \"Uveitis\"...");
        assert_eq!(msg.canvas.as_ref().map(|c| c.state), Some(CanvasState::Generating));

        let gen = ScriptedGenerator::new()
            .reply(r##"```json
{"title":"Uveitis","description":"Inflammation.","content":"# Uveitis\n\nbody"}
```"##);
        settle_canvas(&mut msg, block_on(generate_canvas(&gen, "Uveitis")));
        let canvas = msg.canvas.clone().expect("canvas");
        assert_eq!(canvas.state, CanvasState::Ready);
        assert_eq!(canvas.topic, "Uveitis");
        assert_eq!(canvas.message_id.as_deref(), Some(msg.id.as_str()));
        assert_eq!(msg.text, "# Uveitis\n\nbody");

        set_canvas_content(&mut msg, "# Uveitis\n\nedited");
        assert_eq!(msg.canvas.and_then(|c| c.content).as_deref(), Some("# Uveitis\n\nedited"));
    }

    #[test]
    fn test_canvas_failure_text() {
        let mut msg = canvas_placeholder("Uveitis");
        settle_canvas(&mut msg, Err(GenerationError::Malformed("bad".into())));
        assert_eq!(msg.text, CANVAS_FAILED_TEXT);
    }

    #[test]
    fn test_utf16_offsets() {
        let text = "a😀b";
        assert_eq!(utf16_to_byte(text, 0), Some(0));
        assert_eq!(utf16_to_byte(text, 1), Some(1));
        assert_eq!(utf16_to_byte(text, 2), None);
        assert_eq!(utf16_to_byte(text, 3), Some(5));
        assert_eq!(utf16_to_byte(text, 4), Some(6));
        assert_eq!(utf16_to_byte(text, 5), None);
        assert_eq!(selection_range(text, 3, 1), Some(1..5));
        assert_eq!(selection_range("a  b", 1, 3), None);
    }

    #[test]
    fn test_edit_canvas_selection_splices() {
        let gen = ScriptedGenerator::new().reply("| A | B |\n");
        let content = "# Lens\n\nA vs B\n\nend";
        let range = selection_range(content, 8, 14).expect("range");
        let out = block_on(edit_canvas_selection(&gen, CanvasEditAction::FormatAsTable, content, range))
            .expect("edit");
        assert_eq!(out, "# Lens\n\n| A | B |\n\nend");
        assert!(gen.last_instruction().contains("Format as Table"));
        assert!(gen.last_instruction().contains("A vs B"));
    }
}
