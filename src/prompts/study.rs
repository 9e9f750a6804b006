use super::{string_array, string_field, Difficulty};
use crate::genai::GenerationRequest;
use crate::models::QuizQuestionType;
use serde_json::json;

pub const SESSION_SECTION_CHOICES: [usize; 3] = [3, 5, 7];
pub const QUIZ_COUNT_CHOICES: [usize; 3] = [5, 10, 15];
pub const FINAL_CASE_SECTION: &str = "Final Diagnosis and Management";
pub const CASE_QUIZ_LENGTH: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    pub topic: String,
    pub num_sections: usize,
    pub difficulty: Difficulty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizSettings {
    pub topic: String,
    pub question_count: usize,
    pub difficulty: Difficulty,
    pub question_types: Vec<QuizQuestionType>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FlowSettings {
    pub topic: String,
    pub count: usize,
    /// Sub-topics the user liked.
    pub likes: Vec<String>,
    /// Sub-topics the user disliked.
    pub dislikes: Vec<String>,
}

pub fn study_session_request(settings: &SessionSettings) -> GenerationRequest {
    let SessionSettings {
        topic,
        num_sections,
        difficulty,
    } = settings;

    let question = json!({
        "type": "OBJECT",
        "properties": {
            "type": { "type": "STRING", "enum": ["multiple-choice"] },
            "question": { "type": "STRING" },
            "options": string_array("An array of 4 potential answers."),
            "answer": string_field("The correct answer text. Must exactly match one of the options."),
            "explanation": string_field("A brief explanation for why the answer is correct."),
        },
        "required": ["type", "question", "options", "answer", "explanation"],
    });
    let schema = json!({
        "type": "OBJECT",
        "properties": {
            "title": string_field("A fitting title for the entire study session based on the main topic."),
            "sections": {
                "type": "ARRAY",
                "description": format!("An array of exactly {num_sections} section objects."),
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "subTopicTitle": string_field("A clear title for this section/sub-topic."),
                        "content": string_field("Detailed study notes in markdown format for the sub-topic."),
                        "question": question,
                    },
                    "required": ["subTopicTitle", "content", "question"],
                },
            },
        },
        "required": ["title", "sections"],
    });

    let prompt = format!(
        "You are an expert in optometry education. Your task is to create a study session for an optometry student.

**Session Parameters:**
- **Main Topic:** {topic}
- **Number of Sub-topics/Sections:** {num_sections}
- **Difficulty:** {difficulty}.
  - Easy: Foundational knowledge, definitions.
  - Medium: Clinical application, diagnosis.
  - Hard: Complex cases, differential diagnosis, advanced concepts.

**Instructions:**
1.  Break the main topic into {num_sections} logical sub-topics.
2.  For each sub-topic, provide:
    a.  **subTopicTitle**: A clear and concise title.
    b.  **content**: Detailed study notes in markdown format, with enough information to answer the question that follows.
    c.  **question**: A multiple-choice question testing that content, with 4 string options, an 'answer' that exactly matches one of the options, and a brief 'explanation'.
3.  Your entire response MUST be a single JSON object that strictly adheres to the provided schema. Do NOT include any text or markdown formatting before or after the JSON object."
    );
    GenerationRequest::json(prompt, Some(schema))
}

fn case_question_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "type": { "type": "STRING", "enum": ["multiple-choice", "short-answer"], "description": "The type of question." },
            "questionText": string_field("The question to ask the student."),
            "options": string_array("An array of 4-5 options for multiple-choice questions. Omit for short-answer."),
            "correctAnswer": string_field("The correct answer. For multiple-choice, it must match an option. For short-answer, it's the ideal answer."),
            "explanation": string_field("A detailed explanation of why the answer is correct, providing clinical context."),
        },
        "required": ["type", "questionText", "correctAnswer", "explanation"],
    })
}

pub fn case_study_request(topic: &str) -> GenerationRequest {
    let schema = json!({
        "type": "OBJECT",
        "properties": {
            "caseTitle": string_field("A concise, engaging title for the case study."),
            "patientSummary": string_field("A brief one-sentence summary of the patient."),
            "sections": {
                "type": "ARRAY",
                "description": format!(
                    "An array of 5-7 logical sections that walk through the case from presentation to conclusion. \
                     The final section should be titled '{FINAL_CASE_SECTION}' and should not have a question."
                ),
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "sectionTitle": string_field("Title for the case section (e.g., 'Chief Complaint', 'Slit Lamp Examination')."),
                        "content": string_field("Detailed clinical information for this section in markdown format."),
                        "question": case_question_schema(),
                    },
                    "required": ["sectionTitle", "content"],
                },
            },
        },
        "required": ["caseTitle", "patientSummary", "sections"],
    });

    let prompt = format!(
        "You are a clinical optometry professor. Your task is to create a case study for a student based on the following topic: \"{topic}\".

**Instructions:**
1.  Generate a realistic and educational clinical case study that unfolds logically.
2.  The case must have between 5 and 7 sections.
3.  Typical sections include: 'Patient History', 'Initial Examination', 'Specific Test Results' (e.g., 'OCT Scan'), 'Differential Diagnoses', 'Further Testing', and finally '{FINAL_CASE_SECTION}'.
4.  Each section should contain detailed clinical information in markdown format.
5.  Most sections (except the final one) should end with a challenging question (either multiple-choice or short-answer) testing clinical reasoning on the information provided up to that point.
6.  The very last section must be titled \"{FINAL_CASE_SECTION}\" and summarize the findings, diagnosis, treatment plan, and patient education. It must not contain a question.
7.  Your entire response must be a single JSON object that strictly adheres to the provided schema. Do not include any text before or after the JSON."
    );
    GenerationRequest::json(prompt, Some(schema))
}

/// System instruction that confines the case tutor to `case_content`.
pub fn case_chat_instruction(case_content: &str) -> String {
    format!(
        "You are a clinical tutor AI. Your knowledge is strictly limited to the following case study text. \
Answer the user's questions based ONLY on the information provided in the case study. Do not infer information \
that is not explicitly stated. Do not use any external medical or optometric knowledge. If the answer cannot be \
found in the case study text, state that the information is not available in the case file.

--- CASE STUDY ---
{case_content}
--- END CASE STUDY ---"
    )
}

pub fn case_quiz_request(case_content: &str) -> GenerationRequest {
    let schema = json!({
        "type": "OBJECT",
        "properties": {
            "questions": {
                "type": "ARRAY",
                "description": format!("An array of exactly {CASE_QUIZ_LENGTH} multiple-choice questions."),
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": { "type": "STRING", "enum": ["multiple-choice"] },
                        "questionText": string_field("The quiz question."),
                        "options": string_array("An array of 4 distinct options for the question."),
                        "correctAnswer": string_field("The correct answer, which must exactly match one of the options."),
                        "explanation": string_field("A brief explanation for why the answer is correct."),
                    },
                    "required": ["type", "questionText", "options", "correctAnswer", "explanation"],
                },
            },
        },
        "required": ["questions"],
    });

    let prompt = format!(
        "Based on the following optometry case study, generate a {CASE_QUIZ_LENGTH}-question multiple-choice quiz. \
The quiz should test comprehension of key clinical findings, patient history, and diagnostic reasoning presented \
in the text. Your entire response must be a single JSON object that strictly adheres to the provided schema. Do \
not include any text before or after the JSON.

--- CASE STUDY ---
{case_content}
--- END CASE STUDY ---"
    );
    GenerationRequest::json(prompt, Some(schema))
}

pub fn custom_quiz_request(settings: &QuizSettings) -> GenerationRequest {
    let QuizSettings {
        topic,
        question_count,
        difficulty,
        question_types,
    } = settings;

    let type_names: Vec<String> = question_types.iter().map(|t| t.to_string()).collect();
    let matching_item = json!({
        "type": "OBJECT",
        "properties": {
            "id": string_field("A unique identifier, e.g., 'p1' or 'r1'."),
            "value": string_field("The text content of the item."),
        },
        "required": ["id", "value"],
    });
    let schema = json!({
        "type": "OBJECT",
        "properties": {
            "title": string_field(&format!("A quiz title based on the topic: {topic}.")),
            "questions": {
                "type": "ARRAY",
                "description": format!("An array of exactly {question_count} question objects."),
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": { "type": "STRING", "enum": type_names },
                        "question": { "type": "STRING" },
                        "options": string_array("For multiple-choice: an array of 4-5 string options."),
                        "correctAnswer": string_field("For multiple-choice/short-answer: the correct answer text."),
                        "premises": { "type": "ARRAY", "items": matching_item.clone(), "description": "For matching: the items to be matched." },
                        "responses": { "type": "ARRAY", "items": matching_item, "description": "For matching: the options to match from." },
                        "correctPairs": {
                            "type": "ARRAY",
                            "description": "For matching: an array of correct premise-response ID pairs.",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "premiseId": { "type": "STRING" },
                                    "responseId": { "type": "STRING" },
                                },
                                "required": ["premiseId", "responseId"],
                            },
                        },
                        "explanation": string_field("A brief, clear explanation for the correct answer."),
                    },
                    "required": ["type", "question", "explanation"],
                },
            },
        },
        "required": ["title", "questions"],
    });

    let prompt = format!(
        "You are an expert optometry quiz creator. Generate a custom quiz based on the following specifications.

**Quiz Parameters:**
- **Topic:** {topic}
- **Total Questions:** {question_count}
- **Difficulty:** {difficulty}
- **Requested Question Types:** {types}. Distribute the questions among these types.

**Instructions:**
1.  Create a quiz that strictly adheres to the parameters.
2.  For each question, provide the necessary fields based on its type:
    - **multiple-choice:** requires `options` and `correctAnswer` (which must match an option).
    - **short-answer:** requires `correctAnswer` (the ideal text answer).
    - **matching:** requires `premises`, `responses`, and `correctPairs`. Ensure IDs are unique within the question.
3.  Your entire response MUST be a single JSON object that adheres to the provided schema. Do not include any text before or after the JSON.",
        types = type_names.join(", "),
    );
    GenerationRequest::json(prompt, Some(schema))
}

pub fn flows_request(settings: &FlowSettings) -> GenerationRequest {
    let FlowSettings {
        topic,
        count,
        likes,
        dislikes,
    } = settings;

    let schema = json!({
        "type": "OBJECT",
        "properties": {
            "flows": {
                "type": "ARRAY",
                "description": format!("An array of exactly {count} unique flow objects."),
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": string_field("A unique slug-like identifier for this flow."),
                        "title": string_field("A very short, catchy title for the content (max 5 words)."),
                        "content": string_field("A concise, engaging piece of optometry study material in markdown, digestible in under 30 seconds. Use tables for comparisons."),
                        "subTopic": string_field("A specific sub-topic this content relates to (e.g., 'Angle Closure Glaucoma')."),
                    },
                    "required": ["id", "title", "content", "subTopic"],
                },
            },
        },
        "required": ["flows"],
    });

    let mut personalization = String::new();
    if !likes.is_empty() {
        personalization.push_str(&format!(
            "\n- Prioritize generating content related to these liked sub-topics: {}.",
            likes.join(", ")
        ));
    }
    if !dislikes.is_empty() {
        personalization.push_str(&format!(
            "\n- Avoid generating content related to these disliked sub-topics: {}.",
            dislikes.join(", ")
        ));
    }
    let personalization = if personalization.is_empty() {
        String::new()
    } else {
        format!("\n**Personalization Guidelines:**{personalization}\n")
    };

    let prompt = format!(
        "You are an AI that creates \"Flows\" - short, engaging, vertical-scroll-style educational content for optometry students.

**Main Topic:** {topic}

**Instructions:**
1.  Generate {count} unique \"Flows\" related to the main topic.
2.  Each flow should be extremely concise and easy to understand quickly. Think of them as study flashcards or reels.
3.  The 'content' field must be well-structured markdown. Use headings, bold text, lists, and tables.
4.  When comparing two or more items (e.g., conditions, drugs), ALWAYS use a markdown table for clarity.
5.  Vary the format: quick facts tables, mnemonics, \"Myth vs. Fact\", \"Clinical Pearl\" blockquotes, or a quick case vignette with a \"What's the diagnosis?\" question.
6.  Each flow must have a unique ID, a very short title, the markdown content, and a specific sub-topic.
{personalization}7.  Your entire response must be a single JSON object that strictly adheres to the provided schema. Do not include any text before or after the JSON."
    );
    GenerationRequest::json(prompt, Some(schema))
}
