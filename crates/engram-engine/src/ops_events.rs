//! Event intake with salience scoring.

use tracing::debug;

use engram_attention::{score_salience, SalienceInputs};
use engram_core::deadline::Deadline;
use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::MemoryKind;
use engram_core::models::{Component, EpisodicEvent, EventContext, SalienceScore};
use engram_core::traits::IVectorIndex;
use engram_storage::queries::{event_ops, memory_crud, project_ops};

use crate::Engine;

/// Salience above which an incoming event is admitted straight into
/// working memory.
const ATTENTION_ADMISSION_THRESHOLD: f64 = 0.6;

/// Nearest-neighbor count for novelty scoring.
const NOVELTY_TOP_K: usize = 5;

impl Engine {
    /// Record an episodic event. The attention engine scores salience
    /// against the project's semantic neighborhood; high-salience events
    /// are admitted into working memory.
    pub fn remember_event(
        &self,
        project_id: &str,
        session: &str,
        mut event: EpisodicEvent,
        deadline: Deadline,
    ) -> EngramResult<(String, SalienceScore)> {
        deadline.check("remember_event")?;
        self.check_event_quota(project_id)?;

        event.project_id = project_id.to_string();
        event.session = session.to_string();

        let salience = self.score_event(project_id, &event)?;
        deadline.check("remember_event")?;

        // Surprise feeds consolidation scoring; keep the larger of the
        // caller's value and the computed one.
        event.surprise = event.surprise.max(salience.surprise);
        event.learning_delta = event.learning_delta.max(salience.composite * 0.5);

        self.storage.with_writer(|conn| event_ops::insert_event(conn, &event))?;
        self.storage.with_writer(|conn| {
            project_ops::bump_counter(conn, project_id, project_ops::Counter::Events, 1).or(Ok(()))
        })?;
        self.router.cache().invalidate_for("remember_event");

        if salience.composite >= ATTENTION_ADMISSION_THRESHOLD {
            debug!(event_id = %event.id, salience = salience.composite, "salient event admitted to working memory");
            self.working.admit(
                project_id,
                &event.content,
                Component::EpisodicBuffer,
                salience.composite,
            )?;
        }

        Ok((event.id, salience))
    }

    /// Convenience constructor + intake.
    pub fn remember_event_text(
        &self,
        project_id: &str,
        session: &str,
        event_type: &str,
        content: &str,
        context: EventContext,
        deadline: Deadline,
    ) -> EngramResult<String> {
        let mut event = EpisodicEvent::new(project_id, session, event_type, content);
        event.context = context;
        let (id, _) = self.remember_event(project_id, session, event, deadline)?;
        Ok(id)
    }

    /// Salience against the semantic neighborhood: novelty from the
    /// vector index, surprise from outcome prediction gaps, contradiction
    /// from stance-flipped near-duplicates.
    fn score_event(&self, project_id: &str, event: &EpisodicEvent) -> EngramResult<SalienceScore> {
        let embedding = self.embedder.embed(&event.content)?;

        let neighbor_ids = self
            .index
            .search(project_id, &embedding, NOVELTY_TOP_K)
            .unwrap_or_default();
        let mut neighbors: Vec<(Vec<f32>, f64)> = Vec::with_capacity(neighbor_ids.len());
        for (id, _) in &neighbor_ids {
            let memory = self
                .storage
                .with_reader(|conn| memory_crud::get_memory(conn, id))?;
            if let Some(memory) = memory {
                if memory.kind == MemoryKind::Semantic {
                    let neighbor_embedding = self.embedder.embed(memory.searchable_text())?;
                    neighbors.push((neighbor_embedding, memory.stance));
                }
            }
        }

        let outcome = event
            .outcome
            .as_deref()
            .and_then(parse_outcome_pair);

        Ok(score_salience(
            &SalienceInputs {
                embedding: &embedding,
                stance: 0.0,
                neighbors: &neighbors,
                outcome,
            },
            &self.config.attention,
        ))
    }

    fn check_event_quota(&self, project_id: &str) -> EngramResult<()> {
        let used = self
            .storage
            .with_reader(|conn| event_ops::count_events(conn, project_id))?;
        let limit = self.config.quota.max_events;
        if used >= limit {
            self.storage
                .with_writer(|conn| project_ops::flag_quota(conn, project_id))
                .ok();
            return Err(EngramError::QuotaExceeded {
                project_id: project_id.to_string(),
                resource: "events",
                used,
                limit,
            });
        }
        Ok(())
    }
}

/// Outcomes of the form "observed=0.9 predicted=0.2" carry a prediction
/// gap; anything else contributes no surprise.
fn parse_outcome_pair(outcome: &str) -> Option<(f64, f64)> {
    let mut observed = None;
    let mut predicted = None;
    for token in outcome.split_whitespace() {
        if let Some(value) = token.strip_prefix("observed=") {
            observed = value.parse().ok();
        } else if let Some(value) = token.strip_prefix("predicted=") {
            predicted = value.parse().ok();
        }
    }
    Some((observed?, predicted?))
}
