//! Customisable quizzes.

use crate::genai::{generate_structured, GenerationResult, TextGenerator};
use crate::models::{CustomQuiz, QuizQuestion, QuizQuestionType};
use crate::prompts::{custom_quiz_request, Difficulty, QuizSettings};
use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumIter};

pub const DEFAULT_QUESTION_COUNT: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, AsRefStr, EnumIter)]
pub enum OutputFormat {
    #[default]
    #[strum(serialize = "Questions & Answers")]
    QuestionsAndAnswers,
    #[strum(serialize = "Questions Only")]
    QuestionsOnly,
}

impl OutputFormat {
    pub fn shows_answers(self) -> bool {
        self == OutputFormat::QuestionsAndAnswers
    }
}

/// Quiz settings form. At least one question type is always selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizForm {
    pub topic: String,
    pub question_count: usize,
    pub difficulty: Difficulty,
    question_types: Vec<QuizQuestionType>,
    pub output_format: OutputFormat,
}

impl Default for QuizForm {
    fn default() -> Self {
        Self {
            topic: String::new(),
            question_count: DEFAULT_QUESTION_COUNT,
            difficulty: Difficulty::default(),
            question_types: vec![QuizQuestionType::MultipleChoice],
            output_format: OutputFormat::default(),
        }
    }
}

impl QuizForm {
    pub fn question_types(&self) -> &[QuizQuestionType] {
        &self.question_types
    }

    pub fn is_selected(&self, kind: QuizQuestionType) -> bool {
        self.question_types.contains(&kind)
    }

    /// Adds or removes `kind`. Removing the last selected type is refused.
    pub fn toggle_type(&mut self, kind: QuizQuestionType) -> bool {
        if self.is_selected(kind) {
            if self.question_types.len() == 1 {
                return false;
            }
            self.question_types.retain(|k| *k != kind);
        } else {
            self.question_types.push(kind);
        }
        true
    }

    pub fn can_submit(&self) -> bool {
        !self.topic.trim().is_empty() && !self.question_types.is_empty()
    }

    pub fn settings(&self) -> QuizSettings {
        QuizSettings {
            topic: self.topic.trim().to_string(),
            question_count: self.question_count,
            difficulty: self.difficulty,
            question_types: self.question_types.clone(),
        }
    }
}

pub async fn generate_quiz<G: TextGenerator>(generator: &G, settings: &QuizSettings) -> GenerationResult<CustomQuiz> {
    generate_structured(generator, &custom_quiz_request(settings)).await
}

/// A learner's answer to one quiz question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuizAnswer {
    Choice(String),
    Text(String),
    /// premise id → chosen response id
    Matches(HashMap<String, String>),
}

/// `Some(true|false)` for gradable pairs; `None` when the answer does not fit
/// the question's type. Options are compared exactly, short answers ignoring
/// case and surrounding whitespace.
pub fn grade(question: &QuizQuestion, answer: &QuizAnswer) -> Option<bool> {
    match (question, answer) {
        (QuizQuestion::MultipleChoice(q), QuizAnswer::Choice(c)) => Some(q.correct_answer == *c),
        (QuizQuestion::ShortAnswer(q), QuizAnswer::Text(t)) => {
            Some(q.correct_answer.trim().to_lowercase() == t.trim().to_lowercase())
        }
        (QuizQuestion::Matching(q), QuizAnswer::Matches(m)) => Some(
            q.premises.iter().all(|p| {
                q.correct_response_for(&p.id).map(str::to_string).as_ref() == m.get(&p.id)
            }),
        ),
        _ => None,
    }
}

/// Human-readable answer lines shown under a question.
pub fn answer_key(question: &QuizQuestion) -> Vec<String> {
    match question {
        QuizQuestion::MultipleChoice(q) => vec![format!("Correct Answer: {}", q.correct_answer)],
        QuizQuestion::ShortAnswer(q) => vec![format!("Ideal Answer: {}", q.correct_answer)],
        QuizQuestion::Matching(q) => q
            .premises
            .iter()
            .map(|p| {
                let response = q
                    .correct_response_for(&p.id)
                    .and_then(|id| q.response_value(id))
                    .unwrap_or("N/A");
                format!("{} → {}", p.value, response)
            })
            .collect(),
    }
}
