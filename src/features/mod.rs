//! Per-tool workflows on top of [`crate::genai`] and [`crate::storage`].
//!
//! # Responsibility
//! - Run each tool's generation step against any [`crate::genai::TextGenerator`].
//! - Hold the per-run state a page renders (answers, votes, position).
//!
//! # Invariants
//! - Nothing here touches the DOM; pages own the signals and call in.
//! - Generated artifacts are never mutated after they arrive; user input is
//!   tracked next to them, indexed by position.

pub mod assistant;
pub mod case_study;
pub mod flows;
pub mod quiz;
pub mod session;
pub mod study_notes;
