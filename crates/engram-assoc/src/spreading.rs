//! Spreading activation: bounded BFS over the link table.
//!
//! Propagation: a_next = a_cur · strength · α. Traversal stops at the
//! depth bound, when a_next falls below τ, or when the node budget is
//! exhausted. Cycles are cut by a visited set; the walk yields between
//! frontiers (deadline check per frontier).

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use engram_core::constants::{SPREAD_ALPHA, SPREAD_CUTOFF, SPREAD_DEPTH, SPREAD_NODE_BUDGET};
use engram_core::deadline::Deadline;
use engram_core::errors::EngramResult;
use engram_core::models::{ActivationState, AssociationLink};

/// Tuning knobs for one spread.
#[derive(Debug, Clone, Copy)]
pub struct SpreadParams {
    pub depth: usize,
    pub alpha: f64,
    pub cutoff: f64,
    pub node_budget: usize,
}

impl Default for SpreadParams {
    fn default() -> Self {
        Self {
            depth: SPREAD_DEPTH,
            alpha: SPREAD_ALPHA,
            cutoff: SPREAD_CUTOFF,
            node_budget: SPREAD_NODE_BUDGET,
        }
    }
}

/// Run spreading activation from seed items.
///
/// `load_links` supplies outgoing links for one node; the walk calls it
/// once per expanded node. Returns activated items ordered by level
/// descending, ties broken by recency of `last_strengthened`.
pub fn spread<F>(
    seeds: &[(String, f64)],
    params: SpreadParams,
    deadline: Deadline,
    mut load_links: F,
) -> EngramResult<Vec<ActivationState>>
where
    F: FnMut(&str) -> EngramResult<Vec<AssociationLink>>,
{
    let now = Utc::now();
    let mut visited: HashSet<String> = HashSet::new();
    let mut result: HashMap<String, ActivationState> = HashMap::new();
    let mut recency: HashMap<String, i64> = HashMap::new();

    let mut frontier: Vec<(String, f64)> = seeds
        .iter()
        .filter(|(_, level)| *level >= params.cutoff)
        .map(|(id, level)| (id.clone(), level.clamp(0.0, 1.0)))
        .collect();

    for (id, level) in &frontier {
        visited.insert(id.clone());
        result.insert(
            id.clone(),
            ActivationState {
                item_id: id.clone(),
                level: *level,
                hop_distance: 0,
                activated_at: now,
            },
        );
    }

    for depth in 1..=params.depth {
        deadline.check("spreading_activation")?;
        if frontier.is_empty() || result.len() >= params.node_budget {
            break;
        }

        let mut next_frontier: Vec<(String, f64)> = Vec::new();
        for (node_id, level) in frontier.drain(..) {
            for link in load_links(&node_id)? {
                if result.len() >= params.node_budget {
                    break;
                }
                let a_next = level * link.strength.value() * params.alpha;
                if a_next < params.cutoff {
                    continue;
                }
                if !visited.insert(link.to_id.clone()) {
                    continue;
                }
                recency.insert(link.to_id.clone(), link.last_strengthened.timestamp_millis());
                result.insert(
                    link.to_id.clone(),
                    ActivationState {
                        item_id: link.to_id.clone(),
                        level: a_next,
                        hop_distance: depth,
                        activated_at: now,
                    },
                );
                next_frontier.push((link.to_id, a_next));
            }
        }
        frontier = next_frontier;
    }

    let mut out: Vec<ActivationState> = result.into_values().collect();
    out.sort_by(|a, b| {
        b.level
            .partial_cmp(&a.level)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let ra = recency.get(&a.item_id).copied().unwrap_or(0);
                let rb = recency.get(&b.item_id).copied().unwrap_or(0);
                rb.cmp(&ra)
            })
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::Strength;
    use engram_core::models::{LinkType, MemoryLayer};

    fn link(from: &str, to: &str, strength: f64, strengthened_ms: i64) -> AssociationLink {
        AssociationLink {
            from_id: from.into(),
            from_layer: MemoryLayer::Semantic,
            to_id: to.into(),
            to_layer: MemoryLayer::Semantic,
            link_type: LinkType::Similarity,
            strength: Strength::new(strength),
            co_occurrence_count: 1,
            last_strengthened: engram_storage::ms_to_datetime(strengthened_ms),
        }
    }

    fn graph(edges: Vec<AssociationLink>) -> impl FnMut(&str) -> EngramResult<Vec<AssociationLink>> {
        move |id: &str| {
            Ok(edges
                .iter()
                .filter(|l| l.from_id == id)
                .cloned()
                .collect())
        }
    }

    #[test]
    fn one_hop_propagation_applies_alpha_and_strength() {
        let edges = vec![link("a", "b", 0.5, 0)];
        let states = spread(
            &[("a".into(), 1.0)],
            SpreadParams::default(),
            Deadline::none(),
            graph(edges),
        )
        .unwrap();

        assert_eq!(states[0].item_id, "a");
        let b = states.iter().find(|s| s.item_id == "b").unwrap();
        assert!((b.level - 0.5 * SPREAD_ALPHA).abs() < 1e-9);
        assert_eq!(b.hop_distance, 1);
    }

    #[test]
    fn weak_links_fall_below_cutoff() {
        let edges = vec![link("a", "b", 0.05, 0)];
        let states = spread(
            &[("a".into(), 1.0)],
            SpreadParams::default(),
            Deadline::none(),
            graph(edges),
        )
        .unwrap();
        assert!(states.iter().all(|s| s.item_id != "b"));
    }

    #[test]
    fn depth_bound_stops_the_walk() {
        let edges = vec![
            link("a", "b", 1.0, 0),
            link("b", "c", 1.0, 0),
            link("c", "d", 1.0, 0),
        ];
        let params = SpreadParams {
            depth: 2,
            ..Default::default()
        };
        let states = spread(&[("a".into(), 1.0)], params, Deadline::none(), graph(edges)).unwrap();
        assert!(states.iter().any(|s| s.item_id == "c"));
        assert!(states.iter().all(|s| s.item_id != "d"));
    }

    #[test]
    fn cycles_do_not_loop() {
        let edges = vec![link("a", "b", 1.0, 0), link("b", "a", 1.0, 0)];
        let states = spread(
            &[("a".into(), 1.0)],
            SpreadParams::default(),
            Deadline::none(),
            graph(edges),
        )
        .unwrap();
        assert_eq!(states.len(), 2);
    }

    #[test]
    fn node_budget_caps_expansion() {
        let mut edges = Vec::new();
        for i in 0..50 {
            edges.push(link("a", &format!("n{i}"), 1.0, 0));
        }
        let params = SpreadParams {
            node_budget: 10,
            ..Default::default()
        };
        let states = spread(&[("a".into(), 1.0)], params, Deadline::none(), graph(edges)).unwrap();
        assert!(states.len() <= 10);
    }

    #[test]
    fn equal_levels_order_by_link_recency() {
        let edges = vec![link("a", "old", 0.8, 1_000), link("a", "new", 0.8, 2_000)];
        let states = spread(
            &[("a".into(), 1.0)],
            SpreadParams::default(),
            Deadline::none(),
            graph(edges),
        )
        .unwrap();
        let old_pos = states.iter().position(|s| s.item_id == "old").unwrap();
        let new_pos = states.iter().position(|s| s.item_id == "new").unwrap();
        assert!(new_pos < old_pos);
    }
}
