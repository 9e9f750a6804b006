//! Clinical case studies: generation, the interactive walk-through, the case
//! tutor chat and the per-case quiz.

use crate::genai::{
    build_chat_request, collect_stream, generate_structured, GenerationError, GenerationResult,
    TextGenerator,
};
use crate::library::case_content;
use crate::models::{
    CaseQuestionKind, CaseQuiz, CaseStudy, CaseStudyQuestion, CaseStudyRecord, ChatMessage,
    HistoryItem,
};
use crate::prompts::{case_chat_instruction, case_quiz_request, case_study_request, CASE_QUIZ_LENGTH};
use crate::util::new_id;
use crate::wizard::{Advance, StepWalk, WizardError};
use strum::{AsRefStr, Display, EnumIter};

pub const CASE_CHAT_FAILED_TEXT: &str = "Sorry, I encountered an error.";
pub const NOT_ANSWERED: &str = "Not answered";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, AsRefStr, EnumIter)]
pub enum CaseMode {
    /// Whole case on one page.
    #[default]
    Full,
    /// One section at a time, ending in a graded review.
    Interactive,
}

pub async fn generate_case<G: TextGenerator>(generator: &G, topic: &str) -> GenerationResult<CaseStudy> {
    generate_structured(generator, &case_study_request(topic)).await
}

/// History entry for a freshly generated case, titled by the case.
pub fn case_record(case: &CaseStudy, now_ms: i64) -> HistoryItem {
    HistoryItem::CaseStudy(CaseStudyRecord {
        id: new_id(),
        title: case.case_title.clone(),
        created_at: now_ms,
        case_data: case.clone(),
    })
}

/// Interactive walk through a case. Sections with a question need an answer
/// before moving on; narrative sections do not.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseRun {
    case: CaseStudy,
    walk: StepWalk,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewRow<'a> {
    pub section_title: &'a str,
    pub question: &'a CaseStudyQuestion,
    pub given: Option<&'a str>,
    pub is_correct: bool,
}

impl CaseRun {
    pub fn new(case: CaseStudy) -> Self {
        let walk = StepWalk::new(case.sections.iter().map(|s| s.question.is_some()).collect());
        Self { case, walk }
    }

    pub fn case(&self) -> &CaseStudy {
        &self.case
    }

    pub fn walk(&self) -> &StepWalk {
        &self.walk
    }

    pub fn answer(&mut self, text: &str) {
        let current = self.walk.current();
        self.walk.answer(current, text);
    }

    pub fn next(&mut self) -> Result<Advance, WizardError> {
        self.walk.advance()
    }

    pub fn is_reviewing(&self) -> bool {
        self.walk.is_reviewing()
    }

    /// One row per question, graded by [`CaseStudyQuestion::is_correct`].
    pub fn review(&self) -> Vec<ReviewRow<'_>> {
        self.case
            .sections
            .iter()
            .enumerate()
            .filter_map(|(i, section)| {
                let question = section.question.as_ref()?;
                let given = self.walk.answer_at(i);
                Some(ReviewRow {
                    section_title: &section.section_title,
                    question,
                    given,
                    is_correct: given.is_some_and(|g| question.is_correct(g)),
                })
            })
            .collect()
    }
}

/// Streams a tutor answer grounded only in the case text.
pub async fn ask_about_case<G, F>(
    generator: &G,
    case: &CaseStudy,
    history: &[ChatMessage],
    question: &str,
    on_update: F,
) -> GenerationResult<String>
where
    G: TextGenerator,
    F: FnMut(&str),
{
    let system = case_chat_instruction(&case_content(case));
    let request = build_chat_request(&system, history, question, None);
    collect_stream(generator.stream_text(&request), on_update)
        .await
        .inspect_err(|e| log::error!("event=case_chat module=case_study status=error reason={e}"))
}

/// Exactly [`CASE_QUIZ_LENGTH`] multiple-choice questions, or a malformed reply.
pub async fn generate_case_quiz<G: TextGenerator>(
    generator: &G,
    case: &CaseStudy,
) -> GenerationResult<Vec<CaseStudyQuestion>> {
    let quiz: CaseQuiz = generate_structured(generator, &case_quiz_request(&case_content(case))).await?;
    if quiz.questions.len() != CASE_QUIZ_LENGTH {
        return Err(GenerationError::Malformed(format!(
            "expected {CASE_QUIZ_LENGTH} quiz questions, got {}",
            quiz.questions.len()
        )));
    }
    if quiz.questions.iter().any(|q| q.kind != CaseQuestionKind::MultipleChoice) {
        return Err(GenerationError::Malformed("case quiz question is not multiple-choice".into()));
    }
    Ok(quiz.questions)
}

/// Answers to a case quiz, locked once submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseQuizRun {
    questions: Vec<CaseStudyQuestion>,
    answers: Vec<Option<String>>,
    submitted: bool,
}

impl CaseQuizRun {
    pub fn new(questions: Vec<CaseStudyQuestion>) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            questions,
            answers,
            submitted: false,
        }
    }

    pub fn questions(&self) -> &[CaseStudyQuestion] {
        &self.questions
    }

    pub fn answer_at(&self, index: usize) -> Option<&str> {
        self.answers.get(index).and_then(|a| a.as_deref())
    }

    pub fn choose(&mut self, index: usize, option: &str) {
        if self.submitted {
            return;
        }
        if let Some(slot) = self.answers.get_mut(index) {
            *slot = Some(option.to_string());
        }
    }

    pub fn submit(&mut self) {
        self.submitted = true;
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn correct_count(&self) -> usize {
        self.questions
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| a.as_deref().is_some_and(|a| q.is_correct(a)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::testing::ScriptedGenerator;
    use crate::genai::GenerationError;
    use crate::models::HistoryKind;
    use crate::prompts::FINAL_CASE_SECTION;
    use futures::executor::block_on;
    use serde_json::json;

    fn case_json() -> String {
        json!({
            "caseTitle": "Sudden painless vision loss",
            "patientSummary": "A 68-year-old man with hypertension.",
            "sections": [
                {
                    "sectionTitle": "History",
                    "content": "Vision dropped this morning.",
                    "question": {
                        "type": "short-answer",
                        "questionText": "Most likely diagnosis?",
                        "correctAnswer": "CRAO",
                        "explanation": "Cherry-red spot."
                    }
                },
                {
                    "sectionTitle": "Examination",
                    "content": "Cherry-red spot at the macula.",
                    "question": {
                        "type": "multiple-choice",
                        "questionText": "Which sign?",
                        "options": ["Cherry-red spot", "Drusen"],
                        "correctAnswer": "Cherry-red spot",
                        "explanation": "Classic."
                    }
                },
                {
                    "sectionTitle": FINAL_CASE_SECTION,
                    "content": "Refer urgently."
                }
            ]
        })
        .to_string()
    }

    fn case() -> CaseStudy {
        let gen = ScriptedGenerator::new().reply(&case_json());
        block_on(generate_case(&gen, "CRAO")).expect("case")
    }

    #[test]
    fn test_generate_case_and_record() {
        let case = case();
        assert_eq!(case.sections.len(), 3);
        let record = case_record(&case, 9);
        assert_eq!(record.kind(), HistoryKind::CaseStudy);
        assert_eq!(record.title(), "Sudden painless vision loss");
        assert_eq!(record.created_at(), 9);
    }

    #[test]
    fn test_interactive_walk_and_review() {
        let mut run = CaseRun::new(case());
        assert_eq!(run.next(), Err(WizardError::StepIncomplete));
        run.answer(" crao ");
        assert_eq!(run.next(), Ok(Advance::Next(1)));
        run.answer("Drusen");
        assert_eq!(run.next(), Ok(Advance::Next(2)));
        // Final section has no question.
        assert_eq!(run.next(), Ok(Advance::Review));
        assert!(run.is_reviewing());

        let rows = run.review();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_correct);
        assert_eq!(rows[0].given, Some(" crao "));
        assert!(!rows[1].is_correct);
        assert_eq!(rows[1].section_title, "Examination");
    }

    #[test]
    fn test_case_chat_is_grounded_in_case_text() {
        let gen = ScriptedGenerator::new().stream(vec![Ok("Not in ".into()), Ok("the case file.".into())]);
        let mut updates = vec![];
        let answer = block_on(ask_about_case(&gen, &case(), &[], "What is his IOP?", |t| {
            updates.push(t.to_string())
        }))
        .expect("answer");
        assert_eq!(answer, "Not in the case file.");
        assert_eq!(updates, vec!["Not in ", "Not in the case file."]);

        let seen = gen.seen.borrow();
        let system = seen[0].system_instruction.clone().unwrap_or_default();
        assert!(system.contains("## History\nVision dropped this morning."));
        assert_eq!(seen[0].instruction(), "What is his IOP?");
    }

    fn quiz_json(count: usize) -> String {
        let questions: Vec<_> = (0..count)
            .map(|i| {
                json!({
                    "type": "multiple-choice",
                    "questionText": format!("Q{i}?"),
                    "options": ["68", "40", "55", "72"],
                    "correctAnswer": "68",
                    "explanation": "Stated."
                })
            })
            .collect();
        json!({ "questions": questions }).to_string()
    }

    #[test]
    fn test_case_quiz_generation_and_grading() {
        let gen = ScriptedGenerator::new().reply(&quiz_json(CASE_QUIZ_LENGTH));
        let questions = block_on(generate_case_quiz(&gen, &case())).expect("quiz");
        assert!(gen.last_instruction().contains("Cherry-red spot at the macula."));
        assert_eq!(questions.len(), 5);
        for q in &questions {
            assert_eq!(q.kind, CaseQuestionKind::MultipleChoice);
            assert!(q.options.contains(&q.correct_answer));
        }

        let mut run = CaseQuizRun::new(questions);
        run.choose(0, "68");
        run.choose(1, "40");
        run.submit();
        run.choose(0, "40");
        assert_eq!(run.answer_at(0), Some("68"));
        assert_eq!(run.correct_count(), 1);
    }

    #[test]
    fn test_case_quiz_with_wrong_count_is_rejected() {
        for count in [1, 4, 6] {
            let gen = ScriptedGenerator::new().reply(&quiz_json(count));
            assert!(matches!(
                block_on(generate_case_quiz(&gen, &case())),
                Err(GenerationError::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_case_quiz_with_short_answer_is_rejected() {
        let mut quiz: serde_json::Value = serde_json::from_str(&quiz_json(CASE_QUIZ_LENGTH)).expect("json");
        quiz["questions"][2] = json!({
            "type": "short-answer",
            "questionText": "Age?",
            "correctAnswer": "68",
            "explanation": "Stated."
        });
        let gen = ScriptedGenerator::new().reply(&quiz.to_string());
        assert!(matches!(
            block_on(generate_case_quiz(&gen, &case())),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn test_blank_short_answer_step_cannot_advance() {
        let mut run = CaseRun::new(case());
        assert_eq!(run.walk().current(), 0);
        run.answer("   ");
        assert_eq!(run.next(), Err(WizardError::StepIncomplete));
        assert_eq!(run.walk().current(), 0);
        assert!(!run.is_reviewing());
        run.answer("CRAO");
        assert_eq!(run.next(), Ok(Advance::Next(1)));
    }

    #[test]
    fn test_case_without_sections_is_rejected() {
        let gen = ScriptedGenerator::new().reply(r#"{"caseTitle":"x","patientSummary":"y","sections":[]}"#);
        assert!(matches!(block_on(generate_case(&gen, "x")), Err(GenerationError::Malformed(_))));
    }
}
