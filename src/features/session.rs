//! Guided study sessions: one section at a time, each gated by a question.

use crate::genai::{generate_structured, GenerationError, GenerationResult, TextGenerator};
use crate::library::{session_note, NoteDraft};
use crate::models::GuidedStudySession;
use crate::prompts::{study_session_request, SessionSettings};
use crate::util::{file_stem, format_long_day};
use crate::wizard::{Advance, StepWalk, WizardError};

pub const CERTIFICATE_FAILED_TEXT: &str = "Could not generate certificate. Please try again.";

/// A session with exactly `settings.num_sections` sections.
pub async fn generate_session<G: TextGenerator>(
    generator: &G,
    settings: &SessionSettings,
) -> GenerationResult<GuidedStudySession> {
    let session: GuidedStudySession = generate_structured(generator, &study_session_request(settings)).await?;
    if session.sections.len() != settings.num_sections {
        return Err(GenerationError::Malformed(format!(
            "expected {} sections, got {}",
            settings.num_sections,
            session.sections.len()
        )));
    }
    Ok(session)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    /// Whole percent, rounded. Zero for an empty session.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.correct as f64 / self.total as f64) * 100.0).round() as u32
    }
}

/// A session being studied. Every section requires an answer before moving on.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionRun {
    session: GuidedStudySession,
    walk: StepWalk,
}

impl SessionRun {
    pub fn new(session: GuidedStudySession) -> Self {
        let walk = StepWalk::new(vec![true; session.sections.len()]);
        Self { session, walk }
    }

    pub fn session(&self) -> &GuidedStudySession {
        &self.session
    }

    pub fn walk(&self) -> &StepWalk {
        &self.walk
    }

    pub fn choose(&mut self, option: &str) {
        let current = self.walk.current();
        self.walk.answer(current, option);
    }

    pub fn next(&mut self) -> Result<Advance, WizardError> {
        self.walk.advance()
    }

    pub fn back(&mut self) {
        self.walk.back();
    }

    pub fn is_finished(&self) -> bool {
        self.walk.is_reviewing()
    }

    pub fn is_correct(&self, index: usize) -> Option<bool> {
        let section = self.session.sections.get(index)?;
        self.walk
            .answer_at(index)
            .map(|given| section.question.is_correct(given))
    }

    pub fn score(&self) -> Score {
        Score {
            correct: (0..self.session.sections.len())
                .filter(|i| self.is_correct(*i) == Some(true))
                .count(),
            total: self.session.sections.len(),
        }
    }

    pub fn to_note(&self) -> NoteDraft {
        session_note(&self.session, self.walk.answers())
    }

    /// Completion certificate for `name`. `None` before the session is
    /// finished or when the name is blank.
    pub fn certificate(&self, name: &str, now_ms: i64) -> Option<Certificate> {
        let recipient = name.trim();
        if !self.is_finished() || recipient.is_empty() {
            return None;
        }
        Some(Certificate {
            recipient: recipient.to_string(),
            session_title: self.session.title.clone(),
            percent: self.score().percent(),
            date: format_long_day(now_ms),
        })
    }
}

/// What gets printed on a completion certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    pub recipient: String,
    pub session_title: String,
    pub percent: u32,
    /// `March 4, 2025`
    pub date: String,
}

impl Certificate {
    pub fn file_name(&self) -> String {
        format!("FocusAI_Certificate_{}.png", file_stem(&self.session_title))
    }

    pub fn score_line(&self) -> String {
        format!("with a score of {}% on {}.", self.percent, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::testing::ScriptedGenerator;
    use crate::genai::GenerationError;
    use crate::prompts::Difficulty;
    use futures::executor::block_on;
    use serde_json::json;

    fn payload(sections: usize) -> String {
        let sections: Vec<_> = (0..sections)
            .map(|i| {
                json!({
                    "subTopicTitle": format!("Part {i}"),
                    "content": format!("Content {i}"),
                    "question": {
                        "question": format!("Q{i}?"),
                        "options": ["A", "B", "C", "D"],
                        "answer": "B",
                        "explanation": "B is right."
                    }
                })
            })
            .collect();
        json!({ "title": "Glaucoma", "sections": sections }).to_string()
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            topic: "Glaucoma".into(),
            num_sections: 3,
            difficulty: Difficulty::Easy,
        }
    }

    #[test]
    fn test_generate_glaucoma_session() {
        let gen = ScriptedGenerator::new().reply(&format!("```json\n{}\n```", payload(3)));
        let session = block_on(generate_session(&gen, &settings())).expect("session");
        assert_eq!(session.sections.len(), 3);
        for section in &session.sections {
            assert!(!section.content.is_empty());
            assert!(section.question.options.contains(&section.question.answer));
        }
        let instruction = gen.last_instruction();
        assert!(instruction.contains("Glaucoma"));
        assert!(instruction.contains('3'));
        assert!(instruction.contains("easy"));
    }

    #[test]
    fn test_short_session_is_rejected() {
        let gen = ScriptedGenerator::new().reply(&payload(2));
        assert!(matches!(
            block_on(generate_session(&gen, &settings())),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn test_padded_option_is_rejected_not_misgraded() {
        let padded = payload(3).replacen(r#"["A","B","#, r#"["A","B ","#, 1);
        assert_ne!(padded, payload(3));
        let gen = ScriptedGenerator::new().reply(&padded);
        assert!(matches!(
            block_on(generate_session(&gen, &settings())),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn test_answer_outside_options_is_rejected() {
        let bad = payload(3).replace("\"answer\":\"B\"", "\"answer\":\"Z\"");
        let gen = ScriptedGenerator::new().reply(&bad);
        assert!(matches!(
            block_on(generate_session(&gen, &settings())),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn test_run_gates_and_scores() {
        let gen = ScriptedGenerator::new().reply(&payload(3));
        let mut run = SessionRun::new(block_on(generate_session(&gen, &settings())).expect("session"));

        assert_eq!(run.next(), Err(WizardError::StepIncomplete));
        run.choose("B");
        assert_eq!(run.next(), Ok(Advance::Next(1)));
        run.choose("A");
        assert_eq!(run.next(), Ok(Advance::Next(2)));
        run.choose("B");
        assert_eq!(run.next(), Ok(Advance::Review));
        assert!(run.is_finished());

        let score = run.score();
        assert_eq!(score, Score { correct: 2, total: 3 });
        assert_eq!(score.percent(), 67);
        assert_eq!(run.is_correct(1), Some(false));

        let note = run.to_note();
        assert!(note.content.contains("**Your Answer:** A"));
    }

    #[test]
    fn test_certificate_after_finish_only() {
        let gen = ScriptedGenerator::new().reply(&payload(3));
        let mut run = SessionRun::new(block_on(generate_session(&gen, &settings())).expect("session"));
        let march_4 = 1_741_046_400_000;
        assert_eq!(run.certificate("Asha Rao", march_4), None);

        for choice in ["B", "B", "C"] {
            run.choose(choice);
            run.next().expect("answered");
        }
        assert_eq!(run.certificate("   ", march_4), None);

        let cert = run.certificate("  Asha Rao ", march_4).expect("certificate");
        assert_eq!(cert.recipient, "Asha Rao");
        assert_eq!(cert.session_title, "Glaucoma");
        assert_eq!(cert.percent, 67);
        assert_eq!(cert.score_line(), "with a score of 67% on March 4, 2025.");
        assert_eq!(cert.file_name(), "FocusAI_Certificate_Glaucoma.png");
    }

    #[test]
    fn test_empty_score_percent() {
        assert_eq!(Score { correct: 0, total: 0 }.percent(), 0);
    }
}
