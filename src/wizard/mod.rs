//! Settings → loading → result state machine shared by every generator page,
//! plus a step walker for the multi-step flows.

use crate::genai::GenerationError;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WizardError {
    #[error("a generation request is already in flight")]
    AlreadyLoading,
    #[error("no result is ready")]
    NotReady,
    #[error("the current step needs an answer first")]
    StepIncomplete,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Phase<T> {
    Settings { error: Option<String> },
    Loading,
    Ready(T),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Wizard<T> {
    phase: Phase<T>,
}

impl<T> Default for Wizard<T> {
    fn default() -> Self {
        Self {
            phase: Phase::Settings { error: None },
        }
    }
}

impl<T> Wizard<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &Phase<T> {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Settings { error } => error.as_deref(),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&T> {
        match &self.phase {
            Phase::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn result_mut(&mut self) -> Option<&mut T> {
        match &mut self.phase {
            Phase::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Enters `Loading`. A second request while one is in flight is refused.
    pub fn begin(&mut self) -> Result<(), WizardError> {
        if self.is_loading() {
            return Err(WizardError::AlreadyLoading);
        }
        self.phase = Phase::Loading;
        Ok(())
    }

    /// Settles the in-flight request: `Ready` on success, back to `Settings`
    /// with a user-facing message on failure.
    pub fn finish(&mut self, outcome: Result<T, GenerationError>) {
        if !self.is_loading() {
            log::warn!("event=wizard_finish module=wizard status=error reason=not_loading");
        }
        self.phase = match outcome {
            Ok(value) => Phase::Ready(value),
            Err(e) => {
                log::error!("event=generation module=wizard status=error reason={e}");
                Phase::Settings {
                    error: Some(e.user_message()),
                }
            }
        };
    }

    pub fn start_over(&mut self) {
        self.phase = Phase::Settings { error: None };
    }

    pub fn take_result(&mut self) -> Result<T, WizardError> {
        match std::mem::replace(&mut self.phase, Phase::Settings { error: None }) {
            Phase::Ready(value) => Ok(value),
            other => {
                self.phase = other;
                Err(WizardError::NotReady)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    Next(usize),
    Review,
}

/// Walks an ordered list of steps, collecting one answer per step.
///
/// Steps flagged as requiring input block forward movement until answered.
/// Review opens only after every step has been visited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepWalk {
    requires_input: Vec<bool>,
    answers: Vec<Option<String>>,
    visited: Vec<bool>,
    current: usize,
    reviewing: bool,
}

impl StepWalk {
    pub fn new(requires_input: Vec<bool>) -> Self {
        let len = requires_input.len();
        let mut visited = vec![false; len];
        if let Some(first) = visited.first_mut() {
            *first = true;
        }
        Self {
            requires_input,
            answers: vec![None; len],
            visited,
            current: 0,
            reviewing: false,
        }
    }

    pub fn len(&self) -> usize {
        self.requires_input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requires_input.is_empty()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.len()
    }

    pub fn is_reviewing(&self) -> bool {
        self.reviewing
    }

    pub fn answer(&mut self, index: usize, text: impl Into<String>) {
        if let Some(slot) = self.answers.get_mut(index) {
            let text = text.into();
            *slot = if text.trim().is_empty() { None } else { Some(text) };
        }
    }

    pub fn answer_at(&self, index: usize) -> Option<&str> {
        self.answers.get(index).and_then(|a| a.as_deref())
    }

    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    pub fn can_advance(&self) -> bool {
        !self.is_empty()
            && !self.reviewing
            && (!self.requires_input[self.current] || self.answers[self.current].is_some())
    }

    pub fn advance(&mut self) -> Result<Advance, WizardError> {
        if !self.can_advance() {
            return Err(WizardError::StepIncomplete);
        }
        if self.is_last() {
            if self.visited.iter().all(|v| *v) {
                self.reviewing = true;
                return Ok(Advance::Review);
            }
            return Err(WizardError::StepIncomplete);
        }
        self.current += 1;
        self.visited[self.current] = true;
        Ok(Advance::Next(self.current))
    }

    pub fn back(&mut self) {
        if self.reviewing {
            self.reviewing = false;
        } else if self.current > 0 {
            self.current -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wizard_happy_path() {
        let mut w: Wizard<u32> = Wizard::new();
        assert_eq!(w.error(), None);
        w.begin().expect("begin from settings");
        assert!(w.is_loading());
        assert_eq!(w.begin(), Err(WizardError::AlreadyLoading));
        w.finish(Ok(7));
        assert_eq!(w.result(), Some(&7));
        w.start_over();
        assert_eq!(w.phase(), &Phase::Settings { error: None });
    }

    #[test]
    fn test_wizard_failure_returns_to_settings_with_message() {
        let mut w: Wizard<u32> = Wizard::new();
        w.begin().expect("begin");
        w.finish(Err(GenerationError::Empty));
        assert!(!w.is_loading());
        assert!(w.result().is_none());
        assert!(w.error().is_some());
        // A failed run can be retried.
        assert!(w.begin().is_ok());
    }

    #[test]
    fn test_take_result() {
        let mut w: Wizard<&str> = Wizard::new();
        assert_eq!(w.take_result(), Err(WizardError::NotReady));
        w.begin().expect("begin");
        w.finish(Ok("case"));
        assert_eq!(w.take_result(), Ok("case"));
        assert!(w.result().is_none());
    }

    #[test]
    fn test_step_walk_blocks_until_answered() {
        let mut walk = StepWalk::new(vec![true, false, true]);
        assert!(!walk.can_advance());
        assert_eq!(walk.advance(), Err(WizardError::StepIncomplete));

        walk.answer(0, "  ");
        assert!(!walk.can_advance());
        walk.answer(0, "Timolol");
        assert_eq!(walk.advance(), Ok(Advance::Next(1)));

        // Step without required input moves on freely.
        assert_eq!(walk.advance(), Ok(Advance::Next(2)));
        assert_eq!(walk.advance(), Err(WizardError::StepIncomplete));
        walk.answer(2, "Gonioscopy");
        assert_eq!(walk.advance(), Ok(Advance::Review));
        assert!(walk.is_reviewing());
        assert_eq!(walk.answer_at(0), Some("Timolol"));
        assert_eq!(walk.answer_at(1), None);
    }

    #[test]
    fn test_step_walk_back_leaves_review() {
        let mut walk = StepWalk::new(vec![false]);
        assert_eq!(walk.advance(), Ok(Advance::Review));
        walk.back();
        assert!(!walk.is_reviewing());
        assert_eq!(walk.current(), 0);
    }

    #[test]
    fn test_empty_walk_never_advances() {
        let mut walk = StepWalk::new(vec![]);
        assert!(walk.is_empty());
        assert_eq!(walk.advance(), Err(WizardError::StepIncomplete));
    }
}
