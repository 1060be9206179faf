//! Pure buffer policy: decay evaluation, eviction choice, load accounting.
//! The manager applies these decisions to storage.

use chrono::{DateTime, Utc};

use engram_core::models::{Component, WorkingItem};

/// A point-in-time view of a project's buffer.
#[derive(Debug, Clone)]
pub struct BufferView {
    pub items: Vec<(WorkingItem, f64)>,
    pub capacity: usize,
}

impl BufferView {
    /// Load factor in [0, 1].
    pub fn load(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.items.len() as f64 / self.capacity as f64
    }

    pub fn filter_component(&self, component: Component) -> Vec<&(WorkingItem, f64)> {
        self.items
            .iter()
            .filter(|(item, _)| item.component == component)
            .collect()
    }
}

/// Evaluate current activation for every item, dropping those that have
/// decayed below the eviction floor. Returns (survivors with activation,
/// evicted ids).
pub fn decayed_snapshot(
    items: Vec<WorkingItem>,
    now: DateTime<Utc>,
    eviction_floor: f64,
) -> (Vec<(WorkingItem, f64)>, Vec<String>) {
    let mut survivors = Vec::with_capacity(items.len());
    let mut evicted = Vec::new();

    for item in items {
        let activation = item.activation_at(now);
        if activation < eviction_floor {
            evicted.push(item.id.clone());
        } else {
            survivors.push((item, activation));
        }
    }
    (survivors, evicted)
}

/// Choose the item to evict when admission would exceed capacity: lowest
/// current activation, ties broken by oldest `last_accessed`.
pub fn admission_eviction(
    items: &[(WorkingItem, f64)],
    capacity: usize,
) -> Option<String> {
    if items.len() < capacity {
        return None;
    }
    items
        .iter()
        .min_by(|(a, a_act), (b, b_act)| {
            a_act
                .partial_cmp(b_act)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.last_accessed.cmp(&b.last_accessed))
        })
        .map(|(item, _)| item.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(content: &str, activation: f64, accessed_secs_ago: i64) -> (WorkingItem, f64) {
        let mut item = WorkingItem::new("p1", content, Component::EpisodicBuffer, 0.5, 0.1);
        item.last_accessed = Utc::now() - Duration::seconds(accessed_secs_ago);
        (item, activation)
    }

    #[test]
    fn eviction_picks_lowest_activation() {
        let items = vec![item("a", 0.9, 0), item("b", 0.2, 0), item("c", 0.5, 0)];
        let evict = admission_eviction(&items, 3).unwrap();
        assert_eq!(evict, items[1].0.id);
    }

    #[test]
    fn equal_activation_evicts_oldest_access() {
        let items = vec![item("a", 0.5, 10), item("b", 0.5, 100), item("c", 0.5, 1)];
        let evict = admission_eviction(&items, 3).unwrap();
        assert_eq!(evict, items[1].0.id);
    }

    #[test]
    fn under_capacity_evicts_nothing() {
        let items = vec![item("a", 0.1, 0)];
        assert!(admission_eviction(&items, 7).is_none());
    }

    #[test]
    fn decayed_items_below_floor_are_dropped() {
        let mut stale = WorkingItem::new("p1", "stale", Component::Phonological, 0.0, 0.1);
        // At k=0.1 and importance 0, activation after 60s is e^-6 ≈ 0.0025.
        stale.last_accessed = Utc::now() - Duration::seconds(60);
        let fresh = WorkingItem::new("p1", "fresh", Component::Phonological, 0.0, 0.1);

        let (survivors, evicted) = decayed_snapshot(vec![stale.clone(), fresh], Utc::now(), 0.05);
        assert_eq!(survivors.len(), 1);
        assert_eq!(evicted, vec![stale.id]);
    }

    #[test]
    fn load_factor_reflects_occupancy() {
        let view = BufferView {
            items: vec![item("a", 1.0, 0), item("b", 1.0, 0)],
            capacity: 7,
        };
        assert!((view.load() - 2.0 / 7.0).abs() < 1e-9);
    }
}
