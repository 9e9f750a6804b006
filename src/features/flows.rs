//! Flows: a swipeable feed of short study cards that learns from votes.

use crate::genai::{generate_structured, GenerationError, GenerationResult, TextGenerator};
use crate::models::{Flow, FlowBatch, FlowSession};
use crate::prompts::{flows_request, FlowSettings};
use crate::util::new_id;
use std::collections::{HashMap, HashSet};

pub const INITIAL_BATCH: usize = 15;
pub const MORE_BATCH: usize = 10;
/// Prefetch starts once the viewer is this close to the end.
pub const PREFETCH_DISTANCE: usize = 5;
pub const NO_FLOWS_TEXT: &str = "No flows were generated. Please try a broader topic.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vote {
    Like,
    Dislike,
}

pub async fn generate_flows<G: TextGenerator>(generator: &G, settings: &FlowSettings) -> GenerationResult<Vec<Flow>> {
    let batch: FlowBatch = generate_structured(generator, &flows_request(settings)).await?;
    Ok(batch.flows)
}

/// Starts a new run: the first [`INITIAL_BATCH`] cards on `topic`.
pub async fn start_session<G: TextGenerator>(
    generator: &G,
    topic: &str,
    now_ms: i64,
) -> GenerationResult<FlowSession> {
    let settings = FlowSettings {
        topic: topic.trim().to_string(),
        count: INITIAL_BATCH,
        ..FlowSettings::default()
    };
    let flows = generate_flows(generator, &settings).await.map_err(|e| match e {
        GenerationError::Malformed(_) | GenerationError::Empty => GenerationError::Malformed(NO_FLOWS_TEXT.into()),
        other => other,
    })?;
    log::info!("event=flows_start module=flows status=ok count={}", flows.len());
    Ok(FlowSession {
        id: new_id(),
        topic: settings.topic,
        created_at: now_ms,
        flows,
    })
}

/// Viewer state over one [`FlowSession`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowFeed {
    session: FlowSession,
    index: usize,
    votes: HashMap<String, Vote>,
    likes: Vec<String>,
    dislikes: Vec<String>,
    fetching: bool,
}

impl FlowFeed {
    pub fn new(session: FlowSession) -> Self {
        Self {
            session,
            index: 0,
            votes: HashMap::new(),
            likes: vec![],
            dislikes: vec![],
            fetching: false,
        }
    }

    pub fn session(&self) -> &FlowSession {
        &self.session
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.session.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session.flows.is_empty()
    }

    /// `None` while the viewer waits past the end for more cards.
    pub fn current(&self) -> Option<&Flow> {
        self.session.flows.get(self.index)
    }

    /// Completed fraction in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        ((self.index + 1) as f64 / self.len() as f64).min(1.0)
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn vote_for(&self, flow_id: &str) -> Option<Vote> {
        self.votes.get(flow_id).copied()
    }

    /// Records one vote per card; later votes on the same card are ignored.
    pub fn vote(&mut self, flow_id: &str, vote: Vote) -> bool {
        if self.votes.contains_key(flow_id) {
            return false;
        }
        let Some(sub_topic) = self
            .session
            .flows
            .iter()
            .find(|f| f.id == flow_id)
            .map(|f| f.sub_topic.clone())
        else {
            return false;
        };
        self.votes.insert(flow_id.to_string(), vote);
        match vote {
            Vote::Like => self.likes.push(sub_topic),
            Vote::Dislike => self.dislikes.push(sub_topic),
        }
        true
    }

    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.index + 1 < self.len() || self.fetching
    }

    /// Moves by `step`. Returns false when the move is out of bounds; moving
    /// past the last card is only allowed while more are being fetched.
    pub fn paginate(&mut self, step: isize) -> bool {
        let Some(next) = self.index.checked_add_signed(step) else {
            return false;
        };
        if next >= self.len() && !self.fetching {
            return false;
        }
        self.index = next.min(self.len());
        true
    }

    /// True when the viewer is near the end and no fetch is running.
    pub fn needs_more(&self) -> bool {
        !self.fetching && !self.is_empty() && self.index + PREFETCH_DISTANCE > self.len()
    }

    /// Marks a prefetch as running and returns its settings, or `None` when
    /// one is not needed.
    pub fn begin_fetch(&mut self) -> Option<FlowSettings> {
        if !self.needs_more() {
            return None;
        }
        self.fetching = true;
        Some(FlowSettings {
            topic: self.session.topic.clone(),
            count: MORE_BATCH,
            likes: self.likes.clone(),
            dislikes: self.dislikes.clone(),
        })
    }

    /// Appends fetched cards whose id is new. A failed fetch only clears the
    /// running flag. Returns how many cards were added.
    pub fn finish_fetch(&mut self, outcome: GenerationResult<Vec<Flow>>) -> usize {
        self.fetching = false;
        let fresh = match outcome {
            Ok(fresh) => fresh,
            Err(e) => {
                log::warn!("event=flows_more module=flows status=error reason={e}");
                return 0;
            }
        };
        let mut known: HashSet<String> = self.session.flows.iter().map(|f| f.id.clone()).collect();
        let before = self.len();
        self.session
            .flows
            .extend(fresh.into_iter().filter(|f| known.insert(f.id.clone())));
        let added = self.len() - before;
        log::info!("event=flows_more module=flows status=ok added={added}");
        added
    }

    pub async fn fetch_more<G: TextGenerator>(&mut self, generator: &G) -> usize {
        match self.begin_fetch() {
            Some(settings) => {
                let outcome = generate_flows(generator, &settings).await;
                self.finish_fetch(outcome)
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::testing::ScriptedGenerator;
    use futures::executor::block_on;
    use serde_json::json;

    fn batch(ids: &[&str]) -> String {
        let flows: Vec<_> = ids
            .iter()
            .map(|id| json!({"id": id, "title": id, "content": "**fact**", "subTopic": format!("sub-{id}")}))
            .collect();
        json!({ "flows": flows }).to_string()
    }

    fn feed(n: usize) -> FlowFeed {
        let ids: Vec<String> = (0..n).map(|i| format!("f{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let gen = ScriptedGenerator::new().reply(&batch(&refs));
        FlowFeed::new(block_on(start_session(&gen, "Glaucoma", 3)).expect("session"))
    }

    #[test]
    fn test_start_requests_initial_batch() {
        let gen = ScriptedGenerator::new().reply(&batch(&["a"]));
        let session = block_on(start_session(&gen, " Glaucoma ", 3)).expect("session");
        assert_eq!(session.topic, "Glaucoma");
        assert_eq!(session.created_at, 3);
        assert!(gen.last_instruction().contains("Generate 15 unique"));
        assert!(!gen.last_instruction().contains("Personalization"));
    }

    #[test]
    fn test_start_with_no_flows_reports_hint() {
        let gen = ScriptedGenerator::new().reply(r#"{"flows": []}"#);
        let err = block_on(start_session(&gen, "x", 0)).unwrap_err();
        assert_eq!(err, GenerationError::Malformed(NO_FLOWS_TEXT.into()));
    }

    #[test]
    fn test_one_vote_per_flow_feeds_preferences() {
        let mut feed = feed(6);
        assert!(feed.vote("f0", Vote::Like));
        assert!(!feed.vote("f0", Vote::Dislike));
        assert!(feed.vote("f1", Vote::Dislike));
        assert!(!feed.vote("missing", Vote::Like));
        assert_eq!(feed.vote_for("f0"), Some(Vote::Like));

        for _ in 0..3 {
            assert!(feed.paginate(1));
        }
        let settings = feed.begin_fetch().expect("near the end");
        assert_eq!(settings.count, MORE_BATCH);
        assert_eq!(settings.likes, vec!["sub-f0"]);
        assert_eq!(settings.dislikes, vec!["sub-f1"]);
        assert!(feed.is_fetching());
        assert_eq!(feed.begin_fetch(), None);
    }

    #[test]
    fn test_pagination_bounds() {
        let mut feed = feed(2);
        assert!(!feed.paginate(-1));
        assert!(feed.paginate(1));
        assert!(!feed.paginate(1));
        assert_eq!(feed.index(), 1);

        feed.begin_fetch().expect("fetch");
        assert!(feed.can_go_forward());
        assert!(feed.paginate(1));
        assert_eq!(feed.current(), None);
        assert!(feed.paginate(-1));
        assert_eq!(feed.current().map(|f| f.id.as_str()), Some("f1"));
    }

    #[test]
    fn test_prefetch_threshold() {
        let mut feed = feed(10);
        assert!(!feed.needs_more());
        for _ in 0..5 {
            feed.paginate(1);
        }
        assert!(!feed.needs_more());
        feed.paginate(1);
        assert!(feed.needs_more());
    }

    #[test]
    fn test_fetch_more_dedupes_by_id() {
        let mut feed = feed(5);
        assert!(feed.paginate(1));
        let gen = ScriptedGenerator::new().reply(&batch(&["f3", "f4", "n1", "n2"]));
        assert_eq!(block_on(feed.fetch_more(&gen)), 2);
        assert_eq!(feed.len(), 7);
        assert!(!feed.is_fetching());
        assert!(gen.last_instruction().contains("Generate 10 unique"));

        assert!(feed.paginate(1));
        assert!(feed.paginate(1));
        assert!(feed.needs_more());
        let failing = ScriptedGenerator::new().fail(GenerationError::Network("offline".into()));
        assert_eq!(block_on(feed.fetch_more(&failing)), 0);
        assert_eq!(failing.seen.borrow().len(), 1);
        assert!(!feed.is_fetching());
        assert_eq!(feed.len(), 7);
    }
}
