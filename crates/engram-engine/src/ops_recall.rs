//! Recall and attention operations: routing, retrieval side effects,
//! working memory, focus, inhibition, priming, graph queries.

use chrono::Utc;
use serde::Serialize;

use engram_core::deadline::Deadline;
use engram_core::errors::EngramResult;
use engram_core::models::{
    Component, FocusState, FocusTransition, InhibitionType, LinkType, MemoryLayer, RecallHit,
    RecallOptions, RelationType, TaskSwitch, WorkingItem,
};
use engram_retrieval::strategies::graph::{self, Subgraph};
use engram_storage::queries::{memory_crud, switch_ops};

use crate::Engine;

/// Working-memory view returned by `working_memory_current`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkingMemorySnapshot {
    pub items: Vec<WorkingItem>,
    pub load: f64,
    pub capacity: usize,
}

impl Engine {
    /// Recall memories for a query.
    ///
    /// Side effects on the returned hits: access counts refresh, the top
    /// hits are Hebbian-linked as co-accessed, and with
    /// `reconsolidate=true` each hit is marked labile and carries its
    /// lock token.
    pub fn recall(
        &self,
        project_id: &str,
        query: &str,
        options: RecallOptions,
        deadline: Deadline,
    ) -> EngramResult<Vec<RecallHit>> {
        let mut hits = self.router.recall(project_id, query, &options, deadline)?;

        // Access refresh.
        let now_ms = Utc::now().timestamp_millis();
        self.storage.with_writer(|conn| {
            for hit in &hits {
                memory_crud::touch_memory(conn, &hit.id, now_ms)?;
            }
            Ok(())
        })?;

        // Co-access strengthens associations among the top hits.
        let co_accessed: Vec<(String, MemoryLayer)> = hits
            .iter()
            .take(3)
            .map(|hit| (hit.id.clone(), layer_of(hit)))
            .collect();
        self.network.co_access(&co_accessed, LinkType::Semantic)?;

        // Reconsolidation marking happens after retrieval so the token in
        // the hit reflects the labile version.
        if options.reconsolidate {
            for hit in &mut hits {
                let token = self.recon.mark_labile(&hit.id)?;
                hit.lock_token = Some(token);
            }
        }

        Ok(hits)
    }

    /// Current working-memory buffer for a project.
    pub fn working_memory_current(&self, project_id: &str) -> EngramResult<WorkingMemorySnapshot> {
        let view = self.working.current(project_id)?;
        Ok(WorkingMemorySnapshot {
            load: view.load(),
            capacity: view.capacity,
            items: view.items.into_iter().map(|(item, _)| item).collect(),
        })
    }

    /// Admit content into the working buffer.
    pub fn working_admit(
        &self,
        project_id: &str,
        content: &str,
        component: Component,
        importance: f64,
    ) -> EngramResult<WorkingItem> {
        self.working.admit(project_id, content, component, importance)
    }

    /// Read one working item (refreshes activation).
    pub fn working_access(&self, item_id: &str) -> EngramResult<WorkingItem> {
        self.working.access(item_id)
    }

    /// Current focus state.
    pub fn attention_focus(&self, project_id: &str) -> FocusState {
        self.focus.current(project_id)
    }

    /// Switch the primary focus, persisting the task-switch record with
    /// the pinned working-item snapshot.
    pub fn switch_focus(
        &self,
        project_id: &str,
        target_id: &str,
        label: &str,
        transition: FocusTransition,
    ) -> EngramResult<TaskSwitch> {
        let pinned = self.working.pinned_ids(project_id)?;
        let switch = self
            .focus
            .switch_primary(project_id, target_id, label, transition, pinned)?;
        self.storage
            .with_writer(|conn| switch_ops::insert_switch(conn, &switch))?;
        Ok(switch)
    }

    /// Suppress a memory from retrieval for a TTL.
    pub fn inhibit(
        &self,
        memory_id: &str,
        ttl_ms: u64,
        inhibition_type: InhibitionType,
    ) -> EngramResult<()> {
        self.network.inhibit(memory_id, inhibition_type, ttl_ms)?;
        self.router.cache().invalidate_for("inhibit");
        Ok(())
    }

    /// Prime a memory with a retrieval boost for a TTL.
    pub fn prime(&self, memory_id: &str, strength: f64, ttl_ms: u64) -> EngramResult<()> {
        self.network.prime(memory_id, strength, ttl_ms)
    }

    /// N-hop entity walk from seed entity names.
    pub fn graph_query(
        &self,
        project_id: &str,
        seed_names: &[String],
        depth: usize,
        relation_types: Option<&[RelationType]>,
    ) -> EngramResult<Subgraph> {
        graph::walk(&self.storage, project_id, seed_names, depth, relation_types)
    }
}

fn layer_of(hit: &RecallHit) -> MemoryLayer {
    match hit.kind {
        engram_core::memory::MemoryKind::Episodic => MemoryLayer::Episodic,
        engram_core::memory::MemoryKind::Semantic => MemoryLayer::Semantic,
        engram_core::memory::MemoryKind::Procedural => MemoryLayer::Procedural,
        engram_core::memory::MemoryKind::Code => MemoryLayer::Semantic,
        engram_core::memory::MemoryKind::Task => MemoryLayer::Prospective,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::{MemoryKind, TypedContent};

    fn engine() -> Engine {
        Engine::builder().build().unwrap()
    }

    #[test]
    fn remember_then_recall_top_hit() {
        let engine = engine();
        let id = engine
            .store_text(
                "p1",
                "Docker containers provide process isolation",
                MemoryKind::Semantic,
                vec!["docker".into()],
                Deadline::none(),
            )
            .unwrap();
        engine
            .store_text(
                "p1",
                "Unrelated quarterly finance report",
                MemoryKind::Semantic,
                vec![],
                Deadline::none(),
            )
            .unwrap();

        let hits = engine
            .recall("p1", "container isolation", RecallOptions::top_k(3), Deadline::none())
            .unwrap();
        assert_eq!(hits[0].id, id);

        // Access side effect: count bumped.
        let memory = engine.get_memory(&id).unwrap().unwrap();
        assert!(memory.access_count >= 1);
    }

    #[test]
    fn recall_after_inhibit_hides_until_expiry() {
        let engine = engine();
        let id = engine
            .store_text(
                "p1",
                "a suppressible fact about kafka",
                MemoryKind::Semantic,
                vec![],
                Deadline::none(),
            )
            .unwrap();

        engine
            .inhibit(&id, 60_000, InhibitionType::Selective)
            .unwrap();
        let hits = engine
            .recall("p1", "kafka fact", RecallOptions::top_k(5), Deadline::none())
            .unwrap();
        assert!(hits.iter().all(|h| h.id != id));
    }

    #[test]
    fn reconsolidate_recall_then_update_scenario() {
        let engine = engine();
        let id = engine
            .store_text(
                "p1",
                "the service listens on port 8080",
                MemoryKind::Semantic,
                vec![],
                Deadline::none(),
            )
            .unwrap();

        let options = RecallOptions {
            k: 1,
            reconsolidate: true,
            ..Default::default()
        };
        let hits = engine
            .recall("p1", "service port", options, Deadline::none())
            .unwrap();
        assert_eq!(hits[0].id, id);
        let token = hits[0].lock_token.unwrap();
        assert_eq!(token, 1);

        let v2 = engine
            .update(
                &id,
                TypedContent::from_text(MemoryKind::Semantic, "the service listens on port 9090"),
                token,
                Deadline::none(),
            )
            .unwrap();
        assert_eq!(v2, 2);

        // Second update with the stale token conflicts.
        let err = engine
            .update(
                &id,
                TypedContent::from_text(MemoryKind::Semantic, "port 7070"),
                token,
                Deadline::none(),
            )
            .unwrap_err();
        assert_eq!(
            err.kind(),
            engram_core::errors::ErrorKind::VersionConflict
        );
    }

    #[test]
    fn focus_switch_is_persisted() {
        let engine = engine();
        engine
            .switch_focus("p1", "g1", "main goal", FocusTransition::Voluntary)
            .unwrap();
        let switches = engine
            .storage
            .with_reader(|conn| switch_ops::recent_switches(conn, "p1", 10))
            .unwrap();
        assert_eq!(switches.len(), 1);
        assert_eq!(switches[0].to_goal, "g1");
    }

    #[test]
    fn working_snapshot_reports_load() {
        let engine = engine();
        engine
            .working_admit("p1", "active thought", Component::CentralExecutive, 0.5)
            .unwrap();
        let snapshot = engine.working_memory_current("p1").unwrap();
        assert_eq!(snapshot.items.len(), 1);
        assert!(snapshot.load > 0.0);
        assert_eq!(snapshot.capacity, 7);
    }
}
