//! Structured generation client.
//!
//! # Responsibility
//! - Describe a request to the hosted model ([`GenerationRequest`]).
//! - Turn raw model text into typed, validated artifacts.
//! - Fold streamed chunks into a growing answer.
//!
//! # Invariants
//! - Network failures, service errors and malformed payloads all surface as
//!   [`GenerationError`]; callers never see a panic for a bad payload.
//! - Markdown code fences around JSON are stripped before parsing.

use futures::stream::LocalBoxStream;
use futures::StreamExt;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

mod chat;
mod gemini;
mod stream;

pub use chat::{build_chat_request, parse_data_url, InlineImage};
pub use gemini::GeminiClient;
pub use stream::SseDecoder;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("network error: {0}")]
    Network(String),
    #[error("service error ({status}): {body}")]
    Service { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("empty response")]
    Empty,
    #[error("generation is not configured: {0}")]
    NotConfigured(String),
}

impl GenerationError {
    /// Text shown inline next to the triggering form.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::NotConfigured(_) => {
                "The AI service is not configured. Add an API key and reload.".to_string()
            }
            GenerationError::Network(_) | GenerationError::Service { .. } => {
                "Generation failed. The AI may be busy; please try again.".to_string()
            }
            GenerationError::Malformed(_) | GenerationError::Empty => {
                "Generation failed. The AI returned unusable content; try another topic or try again."
                    .to_string()
            }
        }
    }
}

pub type GenerationResult<T> = Result<T, GenerationError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub(crate) fn as_wire(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Image(InlineImage),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResponseFormat {
    Text,
    /// `application/json`, optionally constrained by a schema.
    Json { schema: Option<Value> },
}

/// One prompt-in request: system instruction, turns, and expected output shape.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: Option<String>,
    pub contents: Vec<Turn>,
    pub response_format: ResponseFormat,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: None,
            contents: vec![Turn::user(prompt)],
            response_format: ResponseFormat::Text,
        }
    }

    pub fn json(prompt: impl Into<String>, schema: Option<Value>) -> Self {
        Self {
            system_instruction: None,
            contents: vec![Turn::user(prompt)],
            response_format: ResponseFormat::Json { schema },
        }
    }

    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Text of the last user turn.
    pub fn instruction(&self) -> &str {
        self.contents
            .iter()
            .rev()
            .filter(|t| t.role == Role::User)
            .flat_map(|t| t.parts.iter())
            .find_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Image(_) => None,
            })
            .unwrap_or_default()
    }

    pub fn schema(&self) -> Option<&Value> {
        match &self.response_format {
            ResponseFormat::Json { schema } => schema.as_ref(),
            ResponseFormat::Text => None,
        }
    }
}

/// Minimal shape checks applied after a payload decoded.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Prompt-in, text-out access to a hosted model.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate_text(&self, request: &GenerationRequest) -> GenerationResult<String>;

    /// Streams the answer chunk by chunk, in arrival order.
    fn stream_text(
        &self,
        request: &GenerationRequest,
    ) -> LocalBoxStream<'static, GenerationResult<String>>;
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| {
            // (?s): `.` spans newlines. Language tag is optional.
            Regex::new(r"(?s)^```(\w*)?\s*\n?(.*?)\n?\s*```$").ok()
        })
        .as_ref()
}

/// Removes a surrounding markdown code fence, if any, and trims.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = fence_regex()
        .and_then(|re| re.captures(trimmed))
        .and_then(|c| c.get(2));
    match inner {
        Some(inner) if !inner.as_str().trim().is_empty() => inner.as_str().trim(),
        _ => trimmed,
    }
}

/// Decodes model text into `T` and validates it.
pub fn parse_structured<T>(text: &str) -> GenerationResult<T>
where
    T: DeserializeOwned + Validate,
{
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(GenerationError::Empty);
    }
    let value: T =
        serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    value.validate().map_err(GenerationError::Malformed)?;
    Ok(value)
}

/// Runs `request` and decodes the answer as `T`.
pub async fn generate_structured<T, G>(generator: &G, request: &GenerationRequest) -> GenerationResult<T>
where
    T: DeserializeOwned + Validate,
    G: TextGenerator,
{
    let text = generator.generate_text(request).await?;
    parse_structured(&text).inspect_err(|e| {
        log::warn!("event=generation_parse module=genai status=error reason={e}");
    })
}

/// Appends streamed chunks in order, calling `on_update` with the running text
/// after each one. Returns the full text.
pub async fn collect_stream<F>(
    mut stream: LocalBoxStream<'_, GenerationResult<String>>,
    mut on_update: F,
) -> GenerationResult<String>
where
    F: FnMut(&str),
{
    let mut acc = String::new();
    while let Some(chunk) = stream.next().await {
        acc.push_str(&chunk?);
        on_update(&acc);
    }
    Ok(acc)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned answers and records every request it received.
    #[derive(Default)]
    pub(crate) struct ScriptedGenerator {
        replies: RefCell<VecDeque<GenerationResult<String>>>,
        streams: RefCell<VecDeque<Vec<GenerationResult<String>>>>,
        pub seen: RefCell<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, text: &str) -> Self {
            self.replies.borrow_mut().push_back(Ok(text.to_string()));
            self
        }

        pub fn fail(self, err: GenerationError) -> Self {
            self.replies.borrow_mut().push_back(Err(err));
            self
        }

        pub fn stream(self, chunks: Vec<GenerationResult<String>>) -> Self {
            self.streams.borrow_mut().push_back(chunks);
            self
        }

        pub fn last_instruction(&self) -> String {
            self.seen
                .borrow()
                .last()
                .map(|r| r.instruction().to_string())
                .unwrap_or_default()
        }
    }

    impl TextGenerator for ScriptedGenerator {
        async fn generate_text(&self, request: &GenerationRequest) -> GenerationResult<String> {
            self.seen.borrow_mut().push(request.clone());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(GenerationError::Network("no scripted reply".into())))
        }

        fn stream_text(
            &self,
            request: &GenerationRequest,
        ) -> LocalBoxStream<'static, GenerationResult<String>> {
            self.seen.borrow_mut().push(request.clone());
            let chunks = self.streams.borrow_mut().pop_front().unwrap_or_default();
            futures::stream::iter(chunks).boxed_local()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;
    use crate::models::{CanvasDocument, FlowBatch};
    use futures::executor::block_on;

    const CANVAS: &str = r##"{"title":"Myopia","description":"Short sight.","content":"# Myopia"}"##;

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_fenced_and_bare_payloads_parse_identically() {
        let fenced = format!("```json\n{CANVAS}\n```");
        let a: CanvasDocument = parse_structured(CANVAS).expect("bare parses");
        let b: CanvasDocument = parse_structured(&fenced).expect("fenced parses");
        assert_eq!(a, b);
    }

    #[test]
    fn test_malformed_and_empty_payloads_are_generation_errors() {
        assert_eq!(
            parse_structured::<CanvasDocument>("   "),
            Err(GenerationError::Empty)
        );
        assert!(matches!(
            parse_structured::<CanvasDocument>("{not json"),
            Err(GenerationError::Malformed(_))
        ));
        assert!(matches!(
            parse_structured::<FlowBatch>(r#"{"flows": []}"#),
            Err(GenerationError::Malformed(_))
        ));
        assert!(matches!(
            parse_structured::<CanvasDocument>(r#"{"title":"","content":"x"}"#),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn test_network_and_malformed_share_error_type() {
        let net = ScriptedGenerator::new().fail(GenerationError::Network("offline".into()));
        let bad = ScriptedGenerator::new().reply("nonsense");
        let req = GenerationRequest::json("make a canvas", None);

        let a: GenerationResult<CanvasDocument> = block_on(generate_structured(&net, &req));
        let b: GenerationResult<CanvasDocument> = block_on(generate_structured(&bad, &req));
        assert!(a.is_err());
        assert!(b.is_err());
        assert!(!a.unwrap_err().user_message().is_empty());
    }

    #[test]
    fn test_collect_stream_updates_after_every_chunk() {
        let gen = ScriptedGenerator::new().stream(vec![
            Ok("Glau".into()),
            Ok("coma ".into()),
            Ok("is optic neuropathy.".into()),
        ]);
        let mut seen = Vec::new();
        let full = block_on(collect_stream(
            gen.stream_text(&GenerationRequest::text("q")),
            |acc| seen.push(acc.to_string()),
        ))
        .expect("stream completes");
        assert_eq!(full, "Glaucoma is optic neuropathy.");
        assert_eq!(seen, vec!["Glau", "Glaucoma ", "Glaucoma is optic neuropathy."]);
    }

    #[test]
    fn test_collect_stream_stops_at_first_error() {
        let gen = ScriptedGenerator::new().stream(vec![
            Ok("partial".into()),
            Err(GenerationError::Network("reset".into())),
            Ok("never".into()),
        ]);
        let mut updates = 0;
        let res = block_on(collect_stream(
            gen.stream_text(&GenerationRequest::text("q")),
            |_| updates += 1,
        ));
        assert!(res.is_err());
        assert_eq!(updates, 1);
    }

    #[test]
    fn test_request_instruction_reads_last_user_turn() {
        let mut req = GenerationRequest::text("first");
        req.contents.push(Turn::model("answer"));
        req.contents.push(Turn::user("second"));
        assert_eq!(req.instruction(), "second");
        assert!(req.schema().is_none());
    }
}
