//! Read-only content trees returned by the generation step.
//!
//! Field names follow the JSON shape the model is asked to produce. Every type
//! implements [`Validate`] so a well-formed but unusable payload is rejected
//! the same way as an unparsable one.

use crate::genai::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{AsRefStr, Display, EnumIter};

fn require_text(value: &str, what: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{what} is empty"))
    } else {
        Ok(())
    }
}

fn require_option(options: &[String], answer: &str, what: &str) -> Result<(), String> {
    if options.is_empty() {
        return Err(format!("{what} has no options"));
    }
    require_text(answer, what)?;
    // Exact match: grading compares the chosen option to the answer verbatim.
    if options.iter().any(|o| o == answer) {
        Ok(())
    } else {
        Err(format!("{what} answer is not one of its options"))
    }
}

// --- Guided study session ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MultipleChoiceQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl MultipleChoiceQuestion {
    pub fn is_correct(&self, chosen: &str) -> bool {
        self.answer == chosen
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSection {
    pub sub_topic_title: String,
    #[serde(default)]
    pub content: String,
    pub question: MultipleChoiceQuestion,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GuidedStudySession {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<SessionSection>,
}

impl Validate for GuidedStudySession {
    fn validate(&self) -> Result<(), String> {
        require_text(&self.title, "session title")?;
        if self.sections.is_empty() {
            return Err("session has no sections".into());
        }
        for (i, section) in self.sections.iter().enumerate() {
            let what = format!("section {}", i + 1);
            require_text(&section.sub_topic_title, &format!("{what} title"))?;
            require_text(&section.content, &format!("{what} content"))?;
            require_text(&section.question.question, &format!("{what} question"))?;
            require_option(
                &section.question.options,
                &section.question.answer,
                &format!("{what} question"),
            )?;
        }
        Ok(())
    }
}

// --- Case study ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CaseQuestionKind {
    MultipleChoice,
    ShortAnswer,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyQuestion {
    #[serde(rename = "type")]
    pub kind: CaseQuestionKind,
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl CaseStudyQuestion {
    fn check(&self, what: &str) -> Result<(), String> {
        require_text(&self.question_text, what)?;
        match self.kind {
            CaseQuestionKind::MultipleChoice => {
                require_option(&self.options, &self.correct_answer, what)
            }
            CaseQuestionKind::ShortAnswer => {
                require_text(&self.correct_answer, &format!("{what} answer"))
            }
        }
    }

    /// Options must match exactly. Short answers ignore case and surrounding
    /// whitespace.
    pub fn is_correct(&self, given: &str) -> bool {
        match self.kind {
            CaseQuestionKind::MultipleChoice => given == self.correct_answer,
            CaseQuestionKind::ShortAnswer => {
                given.trim().to_lowercase() == self.correct_answer.trim().to_lowercase()
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudySection {
    pub section_title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<CaseStudyQuestion>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudy {
    pub case_title: String,
    #[serde(default)]
    pub patient_summary: String,
    #[serde(default)]
    pub sections: Vec<CaseStudySection>,
}

impl Validate for CaseStudy {
    fn validate(&self) -> Result<(), String> {
        require_text(&self.case_title, "case title")?;
        if self.sections.is_empty() {
            return Err("case has no sections".into());
        }
        for (i, section) in self.sections.iter().enumerate() {
            let what = format!("case section {}", i + 1);
            require_text(&section.section_title, &format!("{what} title"))?;
            require_text(&section.content, &format!("{what} content"))?;
            if let Some(q) = &section.question {
                q.check(&format!("{what} question"))?;
            }
        }
        Ok(())
    }
}

/// Multiple-choice quiz generated from a case text.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CaseQuiz {
    #[serde(default)]
    pub questions: Vec<CaseStudyQuestion>,
}

impl Validate for CaseQuiz {
    fn validate(&self) -> Result<(), String> {
        if self.questions.is_empty() {
            return Err("case quiz has no questions".into());
        }
        for (i, q) in self.questions.iter().enumerate() {
            q.check(&format!("quiz question {}", i + 1))?;
        }
        Ok(())
    }
}

// --- Custom quiz ---

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum QuizQuestionType {
    MultipleChoice,
    ShortAnswer,
    Matching,
}

impl QuizQuestionType {
    pub fn label(self) -> &'static str {
        match self {
            QuizQuestionType::MultipleChoice => "Multiple Choice",
            QuizQuestionType::ShortAnswer => "Short Answer",
            QuizQuestionType::Matching => "Matching",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoiceQuizQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShortAnswerQuizQuestion {
    pub question: String,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MatchingItem {
    pub id: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchingPair {
    pub premise_id: String,
    pub response_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchingQuizQuestion {
    pub question: String,
    #[serde(default)]
    pub premises: Vec<MatchingItem>,
    #[serde(default)]
    pub responses: Vec<MatchingItem>,
    #[serde(default)]
    pub correct_pairs: Vec<MatchingPair>,
    #[serde(default)]
    pub explanation: String,
}

impl MatchingQuizQuestion {
    pub fn correct_response_for(&self, premise_id: &str) -> Option<&str> {
        self.correct_pairs
            .iter()
            .find(|p| p.premise_id == premise_id)
            .map(|p| p.response_id.as_str())
    }

    pub fn response_value(&self, response_id: &str) -> Option<&str> {
        self.responses
            .iter()
            .find(|r| r.id == response_id)
            .map(|r| r.value.as_str())
    }

    fn check(&self, what: &str) -> Result<(), String> {
        if self.premises.is_empty() || self.responses.is_empty() {
            return Err(format!("{what} has no items to match"));
        }
        if self.correct_pairs.is_empty() {
            return Err(format!("{what} has no correct pairs"));
        }
        let premises: HashSet<&str> = self.premises.iter().map(|p| p.id.as_str()).collect();
        let responses: HashSet<&str> = self.responses.iter().map(|r| r.id.as_str()).collect();
        if premises.len() != self.premises.len() || responses.len() != self.responses.len() {
            return Err(format!("{what} repeats an item id"));
        }
        for pair in &self.correct_pairs {
            if !premises.contains(pair.premise_id.as_str())
                || !responses.contains(pair.response_id.as_str())
            {
                return Err(format!("{what} pairs reference an unknown id"));
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum QuizQuestion {
    #[serde(rename = "multiple-choice")]
    MultipleChoice(MultipleChoiceQuizQuestion),
    #[serde(rename = "short-answer")]
    ShortAnswer(ShortAnswerQuizQuestion),
    #[serde(rename = "matching")]
    Matching(MatchingQuizQuestion),
}

impl QuizQuestion {
    pub fn question_type(&self) -> QuizQuestionType {
        match self {
            QuizQuestion::MultipleChoice(_) => QuizQuestionType::MultipleChoice,
            QuizQuestion::ShortAnswer(_) => QuizQuestionType::ShortAnswer,
            QuizQuestion::Matching(_) => QuizQuestionType::Matching,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            QuizQuestion::MultipleChoice(q) => &q.question,
            QuizQuestion::ShortAnswer(q) => &q.question,
            QuizQuestion::Matching(q) => &q.question,
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            QuizQuestion::MultipleChoice(q) => &q.explanation,
            QuizQuestion::ShortAnswer(q) => &q.explanation,
            QuizQuestion::Matching(q) => &q.explanation,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CustomQuiz {
    pub title: String,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

impl Validate for CustomQuiz {
    fn validate(&self) -> Result<(), String> {
        require_text(&self.title, "quiz title")?;
        if self.questions.is_empty() {
            return Err("quiz has no questions".into());
        }
        for (i, question) in self.questions.iter().enumerate() {
            let what = format!("quiz question {}", i + 1);
            require_text(question.prompt(), &what)?;
            match question {
                QuizQuestion::MultipleChoice(q) => {
                    require_option(&q.options, &q.correct_answer, &what)?
                }
                QuizQuestion::ShortAnswer(q) => {
                    require_text(&q.correct_answer, &format!("{what} answer"))?
                }
                QuizQuestion::Matching(q) => q.check(&what)?,
            }
        }
        Ok(())
    }
}

// --- Flows ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sub_topic: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FlowBatch {
    #[serde(default)]
    pub flows: Vec<Flow>,
}

impl Validate for FlowBatch {
    fn validate(&self) -> Result<(), String> {
        if self.flows.is_empty() {
            return Err("no flows were generated".into());
        }
        for (i, flow) in self.flows.iter().enumerate() {
            let what = format!("flow {}", i + 1);
            require_text(&flow.id, &format!("{what} id"))?;
            require_text(&flow.content, &format!("{what} content"))?;
        }
        Ok(())
    }
}

// --- Canvas ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CanvasDocument {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
}

impl Validate for CanvasDocument {
    fn validate(&self) -> Result<(), String> {
        require_text(&self.title, "canvas title")?;
        require_text(&self.content, "canvas content")
    }
}

/// Follow-up suggestions are a bare JSON array of strings.
impl Validate for Vec<String> {
    fn validate(&self) -> Result<(), String> {
        if self.iter().all(|s| s.trim().is_empty()) {
            Err("no suggestions".into())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mcq(answer: &str) -> MultipleChoiceQuestion {
        MultipleChoiceQuestion {
            question: "Which drug lowers IOP?".into(),
            options: vec!["Timolol".into(), "Atropine".into()],
            answer: answer.into(),
            explanation: String::new(),
        }
    }

    fn session_with(question: MultipleChoiceQuestion) -> GuidedStudySession {
        GuidedStudySession {
            title: "Glaucoma".into(),
            sections: vec![SessionSection {
                sub_topic_title: "Medication".into(),
                content: "Beta blockers reduce aqueous production.".into(),
                question,
            }],
        }
    }

    #[test]
    fn test_session_answer_must_be_an_option() {
        assert!(session_with(mcq("Timolol")).validate().is_ok());
        let err = session_with(mcq("Pilocarpine")).validate().unwrap_err();
        assert!(err.contains("not one of its options"));
    }

    #[test]
    fn test_padded_option_must_match_answer_exactly() {
        let mut q = mcq("Timolol");
        q.options[0] = "Timolol ".into();
        assert!(session_with(q.clone()).validate().is_err());

        q.answer = "Timolol ".into();
        assert!(session_with(q.clone()).validate().is_ok());
        assert!(q.is_correct("Timolol "));
    }

    #[test]
    fn test_session_rejects_empty_sections_and_content() {
        let mut s = session_with(mcq("Timolol"));
        s.sections[0].content = "  ".into();
        assert!(s.validate().is_err());
        s.sections.clear();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_case_question_grading_is_case_insensitive() {
        let q = CaseStudyQuestion {
            kind: CaseQuestionKind::ShortAnswer,
            question_text: "Diagnosis?".into(),
            options: vec![],
            correct_answer: "Acute Angle Closure".into(),
            explanation: String::new(),
        };
        assert!(q.is_correct("  acute angle closure "));
        assert!(!q.is_correct("open angle"));
    }

    #[test]
    fn test_case_study_final_section_without_question_is_valid() {
        let case: CaseStudy = serde_json::from_value(json!({
            "caseTitle": "Sudden vision loss",
            "patientSummary": "A 65-year-old male.",
            "sections": [
                {"sectionTitle": "History", "content": "Painless loss.",
                 "question": {"type": "multiple-choice", "questionText": "Next step?",
                              "options": ["Dilate", "Refract"], "correctAnswer": "Dilate",
                              "explanation": "Fundus view needed."}},
                {"sectionTitle": "Final Diagnosis and Management", "content": "CRAO."}
            ]
        }))
        .expect("case decodes");
        assert!(case.validate().is_ok());
        assert!(case.sections[1].question.is_none());
    }

    #[test]
    fn test_quiz_question_variants_decode_by_type() {
        let quiz: CustomQuiz = serde_json::from_value(json!({
            "title": "Cornea",
            "questions": [
                {"type": "multiple-choice", "question": "Layer count?", "options": ["5", "6"],
                 "correctAnswer": "6", "explanation": "Dua's layer."},
                {"type": "short-answer", "question": "Define keratoconus.",
                 "correctAnswer": "Progressive corneal thinning.", "explanation": ""},
                {"type": "matching", "question": "Match.",
                 "premises": [{"id": "p1", "value": "Keratoconus"}],
                 "responses": [{"id": "r1", "value": "Munson sign"}],
                 "correctPairs": [{"premiseId": "p1", "responseId": "r1"}],
                 "explanation": ""}
            ]
        }))
        .expect("quiz decodes");
        assert!(quiz.validate().is_ok());
        assert_eq!(quiz.questions[2].question_type(), QuizQuestionType::Matching);
        if let QuizQuestion::Matching(m) = &quiz.questions[2] {
            assert_eq!(m.correct_response_for("p1"), Some("r1"));
            assert_eq!(m.response_value("r1"), Some("Munson sign"));
        }
    }

    #[test]
    fn test_matching_pairs_must_reference_known_ids() {
        let quiz = CustomQuiz {
            title: "Signs".into(),
            questions: vec![QuizQuestion::Matching(MatchingQuizQuestion {
                question: "Match.".into(),
                premises: vec![MatchingItem { id: "p1".into(), value: "A".into() }],
                responses: vec![MatchingItem { id: "r1".into(), value: "B".into() }],
                correct_pairs: vec![MatchingPair {
                    premise_id: "p1".into(),
                    response_id: "r9".into(),
                }],
                explanation: String::new(),
            })],
        };
        assert!(quiz.validate().unwrap_err().contains("unknown id"));
    }

    #[test]
    fn test_flow_batch_rejects_empty() {
        assert!(FlowBatch { flows: vec![] }.validate().is_err());
    }

    #[test]
    fn test_quiz_question_type_names() {
        assert_eq!(QuizQuestionType::ShortAnswer.to_string(), "short-answer");
        assert_eq!(QuizQuestionType::Matching.label(), "Matching");
    }
}
