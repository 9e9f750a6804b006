//! Content request builders.
//!
//! Pure functions from user settings to a [`GenerationRequest`]. Every value
//! the user picked is written literally into the instruction or the schema.

use crate::genai::GenerationRequest;
use serde_json::{json, Value};
use strum::{AsRefStr, Display, EnumIter};

mod study;

pub use study::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Display, AsRefStr, EnumIter)]
pub enum NoteStyle {
    #[default]
    Detailed,
    #[strum(serialize = "Clinical Focus")]
    ClinicalFocus,
    #[strum(serialize = "Student Friendly")]
    StudentFriendly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Display, AsRefStr, EnumIter)]
pub enum StudentLevel {
    Beginner,
    #[default]
    #[strum(serialize = "Average (Intermediate)")]
    Intermediate,
    #[strum(serialize = "Advanced (Topper)")]
    Advanced,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteOptions {
    pub style: NoteStyle,
    pub level: StudentLevel,
    pub tables: bool,
    pub mnemonics: bool,
    pub analogies: bool,
    pub case_examples: bool,
}

impl Default for NoteOptions {
    fn default() -> Self {
        Self {
            style: NoteStyle::default(),
            level: StudentLevel::default(),
            tables: true,
            mnemonics: true,
            analogies: false,
            case_examples: false,
        }
    }
}

/// Quick actions offered on an assistant answer. Sent as `<action>: "<text>"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr, EnumIter)]
pub enum AiEditAction {
    Simplify,
    Elaborate,
    #[strum(serialize = "Add Clinical Examples")]
    AddClinicalExamples,
    #[strum(serialize = "Clinical Focus")]
    ClinicalFocus,
    #[strum(serialize = "Student Friendly")]
    StudentFriendly,
}

impl AiEditAction {
    pub fn apply(self, text: &str) -> String {
        format!("{self}: \"{text}\"")
    }
}

/// Rewrites offered inside the canvas editor for a selected passage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr, EnumIter)]
pub enum CanvasEditAction {
    Simplify,
    Elaborate,
    #[strum(serialize = "Add Clinical Examples")]
    AddClinicalExamples,
    #[strum(serialize = "Format as Table")]
    FormatAsTable,
}

const TUTOR_INSTRUCTION: &str = r#"You are Focus.AI, a specialized AI assistant for optometry students. Your responses should be:

1. Accurate and evidence-based, using current optometric knowledge
2. Educational, explaining concepts clearly with clinical relevance
3. Organized with clear sections, bullet points, and tables where appropriate
4. Student-focused, helping with exam preparation and clinical understanding
5. Ethical, noting when certain questions require professional judgment

You can answer questions about eye anatomy, disease pathology, diagnosis techniques, treatment options,
optical principles, contact lenses, and other topics relevant to optometry students.

Always format your responses using markdown for readability. Include tables when comparing conditions or treatments,
and use bullet points for lists of symptoms or procedures.

If the user uploads an image, carefully analyze the image and provide detailed explanations about what you see,
including any relevant clinical findings, measurements, anomalies, or diagnostic features. If the image shows
eye conditions, provide detailed assessment of the visible symptoms, potential diagnoses, and relevant treatment
approaches when appropriate.

IMPORTANT: Tailor your response length to the user's query.
- For simple definition or identification questions (e.g., "what is retina?"), give a concise single paragraph of about 5-6 lines with the most critical information a student should know.
- For explanatory or detailed questions (e.g., "explain retinitis in detail"), give a comprehensive multi-paragraph answer with tables and lists.
- For very specific short-answer questions (e.g., "what is the diameter of the optic disc?"), answer directly and briefly.

For mathematical formulas, use KaTeX-compatible LaTeX: single dollar signs for inline formulas and double dollar signs for block formulas."#;

/// System instruction for the assistant chat. Custom instructions, when given,
/// are appended and take priority over the base persona.
pub fn chat_system_instruction(custom: Option<&str>) -> String {
    match custom.map(str::trim).filter(|c| !c.is_empty()) {
        Some(custom) => format!(
            "{TUTOR_INSTRUCTION}\n\n---\n\nA user has provided the following custom instructions. \
             Adhere to them strictly, prioritizing them over the base instructions if there is a conflict:\n\n{custom}"
        ),
        None => TUTOR_INSTRUCTION.to_string(),
    }
}

const MARKDOWN_RULES: &str = "- Use a main title (e.g., '# Main Topic').
- Use section headings (e.g., '## Section 1', '### Subsection 1.1').
- Use bullet points (`*`) or numbered lists (`1.`) for key information, symptoms, or steps.
- Use bold text (`**...**`) for important keywords and definitions.
- Use blockquotes (`>`) for clinical tips or important asides.
- Use tables to compare and contrast conditions, medications, or techniques.
- Use horizontal rules (`---`) to separate major sections.";

pub fn study_notes_request(keywords: &str, options: &NoteOptions) -> GenerationRequest {
    let mut elements = String::new();
    for (on, line) in [
        (options.tables, "- Tables: To compare and contrast concepts."),
        (options.mnemonics, "- Mnemonics: To aid in memorization."),
        (options.analogies, "- Analogies: To explain complex ideas simply."),
        (options.case_examples, "- Case Examples: To provide clinical context."),
    ] {
        if on {
            elements.push_str(line);
            elements.push('\n');
        }
    }

    let prompt = format!(
        "You are an expert at creating study materials for optometry students. Your task is to generate \
comprehensive, well-structured study notes on the topic of \"{keywords}\".

The output MUST be in markdown format.

**Note Style:** {style}
**Student Level:** {level}

**Required Elements (include where relevant):**
{elements}
**Formatting Rules:**
{MARKDOWN_RULES}

IMPORTANT: Your response MUST contain ONLY the raw markdown content for the notes. Do not include any \
introductory sentences, conversational text, or summaries before or after the markdown content.",
        style = options.style,
        level = options.level,
    );
    GenerationRequest::text(prompt)
}

pub(crate) fn string_field(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

pub(crate) fn string_array(description: &str) -> Value {
    json!({ "type": "ARRAY", "description": description, "items": { "type": "STRING" } })
}

pub fn canvas_request(topic: &str) -> GenerationRequest {
    let schema = json!({
        "type": "OBJECT",
        "properties": {
            "title": string_field("A concise, engaging title for the canvas document based on the topic."),
            "description": string_field("A short, one or two-sentence summary of the document's content."),
            "content": string_field("The full document content in well-structured markdown. Start with a single H1 '#' heading; use lists, bold text, tables and blockquotes."),
        },
        "required": ["title", "description", "content"],
    });

    let prompt = format!(
        "You are an expert at creating study materials for optometry students. Your task is to generate a \
comprehensive, well-structured document on the topic of \"{topic}\".

Your response must be a single JSON object that strictly adheres to the provided schema. The 'content' field \
must be a string containing well-formatted markdown.

**Markdown Formatting Rules for the 'content' field:**
{MARKDOWN_RULES}
The main title is mandatory."
    );
    GenerationRequest::json(prompt, Some(schema))
}

pub fn suggested_questions_request(user_query: &str, ai_response: &str) -> GenerationRequest {
    let prompt = format!(
        "Based on the following user query and AI response, generate 3 short and concise follow-up questions an \
optometry student might ask to learn more. Each question should be no more than 10-12 words. The questions \
should test deeper understanding, clinical relevance, or alternative perspectives, and be directly related \
to the user's last query.

Return ONLY a JSON array of strings, like this: [\"Short question 1?\", \"Short question 2?\", \"Short question 3?\"]

---
USER QUERY: {user_query}
---
AI RESPONSE: {ai_response}
---"
    );
    GenerationRequest::json(prompt, None)
}

pub fn chat_title_request(first_message: &str) -> GenerationRequest {
    GenerationRequest::text(format!(
        "Generate a concise, 3-5 word title for a chat conversation that starts with the following message. \
Respond with ONLY the title text, nothing else.\n\nMESSAGE: \"{first_message}\""
    ))
}

pub fn canvas_edit_request(action: CanvasEditAction, selected_text: &str) -> GenerationRequest {
    GenerationRequest::text(format!(
        "You are an AI text editor. A user has selected a piece of text and wants you to perform an action on it.
Action: \"{action}\"
Text:
---
{selected_text}
---
Return ONLY the modified text, ready to be pasted back in place. Maintain markdown formatting if appropriate."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::ResponseFormat;

    #[test]
    fn test_chat_system_instruction_appends_custom() {
        let base = chat_system_instruction(None);
        assert!(base.starts_with("You are Focus.AI"));
        assert_eq!(chat_system_instruction(Some("   ")), base);

        let custom = chat_system_instruction(Some("Answer in Hindi."));
        assert!(custom.starts_with(&base));
        assert!(custom.ends_with("Answer in Hindi."));
        assert!(custom.contains("prioritizing them over the base instructions"));
    }

    #[test]
    fn test_study_notes_request_embeds_every_option() {
        let options = NoteOptions {
            style: NoteStyle::ClinicalFocus,
            level: StudentLevel::Advanced,
            tables: false,
            mnemonics: true,
            analogies: true,
            case_examples: false,
        };
        let req = study_notes_request("Diabetic Retinopathy", &options);
        let text = req.instruction();
        assert!(text.contains("\"Diabetic Retinopathy\""));
        assert!(text.contains("**Note Style:** Clinical Focus"));
        assert!(text.contains("**Student Level:** Advanced (Topper)"));
        assert!(text.contains("- Mnemonics:"));
        assert!(text.contains("- Analogies:"));
        assert!(!text.contains("- Tables:"));
        assert!(!text.contains("- Case Examples:"));
        assert_eq!(req.response_format, ResponseFormat::Text);
    }

    #[test]
    fn test_canvas_request_schema() {
        let req = canvas_request("Uveitis");
        assert!(req.instruction().contains("\"Uveitis\""));
        let schema = req.schema().expect("canvas has a schema");
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["required"], json!(["title", "description", "content"]));
    }

    #[test]
    fn test_suggestion_and_title_requests_embed_inputs() {
        let req = suggested_questions_request("what is myopia?", "Myopia is short sight.");
        assert!(req.instruction().contains("USER QUERY: what is myopia?"));
        assert!(req.instruction().contains("AI RESPONSE: Myopia is short sight."));
        assert!(matches!(req.response_format, ResponseFormat::Json { schema: None }));

        let title = chat_title_request("Explain keratoconus");
        assert!(title.instruction().contains("MESSAGE: \"Explain keratoconus\""));
    }

    #[test]
    fn test_edit_actions() {
        assert_eq!(
            AiEditAction::AddClinicalExamples.apply("Retina"),
            "Add Clinical Examples: \"Retina\""
        );
        let req = canvas_edit_request(CanvasEditAction::FormatAsTable, "a vs b");
        assert!(req.instruction().contains("Action: \"Format as Table\""));
        assert!(req.instruction().contains("---\na vs b\n---"));
    }

    #[test]
    fn test_difficulty_wire_and_label() {
        assert_eq!(Difficulty::Hard.to_string(), "hard");
        assert_eq!(Difficulty::Hard.label(), "Hard");
        assert_eq!(Difficulty::default(), Difficulty::Medium);
    }
}
