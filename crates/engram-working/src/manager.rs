//! Working-memory manager: applies buffer policy against storage.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use engram_core::config::WorkingMemoryConfig;
use engram_core::constants::ACCESS_REFRESH_FACTOR;
use engram_core::errors::{AttentionError, EngramResult};
use engram_core::memory::Activation;
use engram_core::models::{Component, WorkingItem};
use engram_storage::queries::working_ops;
use engram_storage::StorageEngine;

use crate::buffer::{admission_eviction, decayed_snapshot, BufferView};

pub struct WorkingMemoryManager {
    storage: Arc<StorageEngine>,
    config: WorkingMemoryConfig,
}

impl WorkingMemoryManager {
    pub fn new(storage: Arc<StorageEngine>, config: WorkingMemoryConfig) -> Self {
        Self { storage, config }
    }

    pub fn capacity(&self) -> usize {
        self.config.effective_capacity()
    }

    /// Admit a new item. Applies decay first, then evicts the weakest item
    /// if the buffer would exceed capacity. Exactly one item is evicted per
    /// over-capacity admission.
    pub fn admit(
        &self,
        project_id: &str,
        content: &str,
        component: Component,
        importance: f64,
    ) -> EngramResult<WorkingItem> {
        let now = Utc::now();
        let capacity = self.capacity();
        let item = WorkingItem::new(
            project_id,
            content,
            component,
            importance,
            self.config.decay_rate,
        );

        self.storage.with_writer(|conn| {
            let existing = working_ops::list_items(conn, project_id)?;
            let (survivors, decayed_out) =
                decayed_snapshot(existing, now, self.config.admission_threshold);

            for id in &decayed_out {
                working_ops::delete_item(conn, id)?;
            }

            if let Some(evict_id) = admission_eviction(&survivors, capacity) {
                working_ops::delete_item(conn, &evict_id)?;
                debug!(item_id = %evict_id, "evicted working item on admission");
            }

            working_ops::insert_item(conn, &item)?;
            Ok(())
        })?;

        Ok(item)
    }

    /// Current buffer view. Persists decay-driven evictions as a side
    /// effect so the stored buffer never exceeds capacity.
    pub fn current(&self, project_id: &str) -> EngramResult<BufferView> {
        let now = Utc::now();
        let capacity = self.capacity();

        self.storage.with_writer(|conn| {
            let existing = working_ops::list_items(conn, project_id)?;
            let (survivors, decayed_out) =
                decayed_snapshot(existing, now, self.config.admission_threshold);
            for id in &decayed_out {
                working_ops::delete_item(conn, id)?;
            }
            Ok(BufferView {
                items: survivors,
                capacity,
            })
        })
    }

    /// Read one item: refreshes `last_accessed` and multiplies activation
    /// by 1.1 (clamped).
    pub fn access(&self, item_id: &str) -> EngramResult<WorkingItem> {
        let now = Utc::now();
        self.storage.with_writer(|conn| {
            let Some(item) = working_ops::get_item(conn, item_id)? else {
                return Err(AttentionError::ItemNotFound {
                    item_id: item_id.to_string(),
                }
                .into());
            };

            let current = item.activation_at(now);
            let refreshed = Activation::new(current * ACCESS_REFRESH_FACTOR);
            working_ops::update_activation(
                conn,
                item_id,
                refreshed.value(),
                now.timestamp_millis(),
            )?;

            let mut updated = item;
            updated.activation = refreshed;
            updated.last_accessed = now;
            Ok(updated)
        })
    }

    /// Pin or unpin an item for focus-switch context preservation.
    pub fn set_pinned(&self, item_id: &str, pinned: bool) -> EngramResult<()> {
        self.storage
            .with_writer(|conn| working_ops::set_pinned(conn, item_id, pinned))
    }

    /// Ids of currently pinned items, captured into task-switch records.
    pub fn pinned_ids(&self, project_id: &str) -> EngramResult<Vec<String>> {
        let view = self.current(project_id)?;
        Ok(view
            .items
            .into_iter()
            .filter(|(item, _)| item.pinned)
            .map(|(item, _)| item.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::config::defaults;

    fn manager() -> WorkingMemoryManager {
        let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
        WorkingMemoryManager::new(storage, WorkingMemoryConfig::default())
    }

    #[test]
    fn buffer_never_exceeds_capacity() {
        let manager = manager();
        for i in 0..12 {
            manager
                .admit("p1", &format!("item {i}"), Component::EpisodicBuffer, 0.5)
                .unwrap();
        }
        let view = manager.current("p1").unwrap();
        assert!(view.items.len() <= defaults::WORKING_CAPACITY);
    }

    #[test]
    fn admission_at_capacity_evicts_exactly_one() {
        let manager = manager();
        for i in 0..7 {
            manager
                .admit("p1", &format!("item {i}"), Component::EpisodicBuffer, 0.5)
                .unwrap();
        }
        assert_eq!(manager.current("p1").unwrap().items.len(), 7);

        manager
            .admit("p1", "the eighth", Component::EpisodicBuffer, 0.5)
            .unwrap();
        assert_eq!(manager.current("p1").unwrap().items.len(), 7);
    }

    #[test]
    fn access_refreshes_activation() {
        let manager = manager();
        let item = manager
            .admit("p1", "boost me", Component::CentralExecutive, 0.5)
            .unwrap();

        let refreshed = manager.access(&item.id).unwrap();
        // Fresh item at activation 1.0 stays clamped at 1.0.
        assert!(refreshed.activation.value() <= 1.0);
        assert!(refreshed.last_accessed >= item.last_accessed);
    }

    #[test]
    fn access_missing_item_errors() {
        let manager = manager();
        assert!(manager.access("ghost").is_err());
    }

    #[test]
    fn component_filter_separates_items() {
        let manager = manager();
        manager
            .admit("p1", "verbal", Component::Phonological, 0.5)
            .unwrap();
        manager
            .admit("p1", "spatial", Component::VisuoSpatial, 0.5)
            .unwrap();

        let view = manager.current("p1").unwrap();
        assert_eq!(view.filter_component(Component::Phonological).len(), 1);
        assert_eq!(view.filter_component(Component::VisuoSpatial).len(), 1);
        assert_eq!(view.filter_component(Component::EpisodicBuffer).len(), 0);
    }

    #[test]
    fn projects_have_isolated_buffers() {
        let manager = manager();
        manager
            .admit("p1", "one", Component::EpisodicBuffer, 0.5)
            .unwrap();
        manager
            .admit("p2", "two", Component::EpisodicBuffer, 0.5)
            .unwrap();

        assert_eq!(manager.current("p1").unwrap().items.len(), 1);
        assert_eq!(manager.current("p2").unwrap().items.len(), 1);
    }
}
