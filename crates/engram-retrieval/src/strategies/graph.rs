//! Graph strategy: N-hop walk from seed entities with strength-weighted
//! aggregation, then memory lookup by the reached entity names.
//!
//! Entity relations may contain cycles; the walk carries a visited set
//! and a hop budget.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::Undirected;

use engram_core::errors::EngramResult;
use engram_core::memory::MemoryRecord;
use engram_core::models::{Relation, RelationType};
use engram_core::traits::IMemoryStore;
use engram_storage::queries::entity_ops;
use engram_storage::StorageEngine;

use super::StrategyContext;

/// Default hop budget for the walk.
const WALK_DEPTH: usize = 2;

/// Node budget: walks stop expanding past this many entities.
const WALK_NODE_BUDGET: usize = 64;

/// One reached entity with its aggregated path strength.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachedEntity {
    pub name: String,
    pub strength: f64,
    pub depth: usize,
}

/// A subgraph answer for `graph_query`.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    pub entities: Vec<ReachedEntity>,
    pub relations: Vec<Relation>,
}

pub fn search(ctx: &StrategyContext<'_>) -> EngramResult<Vec<(MemoryRecord, f64)>> {
    ctx.deadline.check("graph_search")?;

    let known = ctx
        .storage
        .with_reader(|conn| entity_ops::all_entity_names(conn, ctx.project_id))?;
    let lowered_query = ctx.query.to_lowercase();
    let seeds: Vec<String> = known
        .into_iter()
        .filter(|name| {
            let n = name.to_lowercase();
            lowered_query
                .split(|c: char| !c.is_alphanumeric())
                .any(|w| w == n)
        })
        .collect();
    if seeds.is_empty() {
        return Ok(vec![]);
    }

    let subgraph = walk(ctx.storage, ctx.project_id, &seeds, WALK_DEPTH, None)?;
    ctx.deadline.check("graph_search")?;

    // Memories mentioning the reached entities, weighted by path strength.
    let mut scored: HashMap<String, (MemoryRecord, f64)> = HashMap::new();
    for entity in subgraph.entities.iter().take(8) {
        let hits = ctx
            .storage
            .search_keyword(ctx.project_id, &entity.name, ctx.k)?;
        for (memory, keyword_score) in hits {
            let combined = entity.strength * keyword_score.min(1.0);
            scored
                .entry(memory.id.clone())
                .and_modify(|(_, s)| *s = (*s + combined).min(1.0))
                .or_insert((memory, combined));
        }
    }

    let mut results: Vec<(MemoryRecord, f64)> = scored.into_values().collect();
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
    results.truncate(ctx.k);
    Ok(results)
}

/// Bounded walk over the relation graph. Used by the strategy and by the
/// public `graph_query` operation.
pub fn walk(
    storage: &StorageEngine,
    project_id: &str,
    seed_names: &[String],
    depth: usize,
    relation_filter: Option<&[RelationType]>,
) -> EngramResult<Subgraph> {
    let now_ms = Utc::now().timestamp_millis();

    let mut graph: Graph<String, f64, Undirected> = Graph::new_undirected();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
    let mut reached: HashMap<String, ReachedEntity> = HashMap::new();
    let mut collected_relations: Vec<Relation> = Vec::new();
    let mut seen_relations: HashSet<String> = HashSet::new();

    let mut node_of = |graph: &mut Graph<String, f64, Undirected>,
                       nodes: &mut HashMap<String, NodeIndex>,
                       name: &str| {
        *nodes
            .entry(name.to_string())
            .or_insert_with(|| graph.add_node(name.to_string()))
    };

    let mut frontier: Vec<(String, f64)> = seed_names
        .iter()
        .map(|name| (name.clone(), 1.0))
        .collect();
    for (name, strength) in &frontier {
        node_of(&mut graph, &mut nodes, name);
        reached.insert(
            name.clone(),
            ReachedEntity {
                name: name.clone(),
                strength: *strength,
                depth: 0,
            },
        );
    }

    for hop in 1..=depth {
        if frontier.is_empty() || reached.len() >= WALK_NODE_BUDGET {
            break;
        }
        let mut next: Vec<(String, f64)> = Vec::new();

        for (name, strength) in frontier.drain(..) {
            let entity = storage
                .with_reader(|conn| entity_ops::get_entity_by_name(conn, project_id, &name))?;
            let Some(entity) = entity else { continue };

            let relations = storage
                .with_reader(|conn| entity_ops::relations_touching(conn, &entity.id, now_ms))?;
            for relation in relations {
                if let Some(filter) = relation_filter {
                    if !filter.contains(&relation.relation_type) {
                        continue;
                    }
                }
                if seen_relations.insert(relation.id.clone()) {
                    collected_relations.push(relation.clone());
                }

                let neighbor_id = if relation.from_entity == entity.id {
                    &relation.to_entity
                } else {
                    &relation.from_entity
                };
                let neighbor = storage.with_reader(|conn| {
                    engram_storage::queries::entity_ops::get_entity_by_id(conn, neighbor_id)
                })?;
                let Some(neighbor) = neighbor else { continue };

                let path_strength = strength * relation.strength.value();
                let reached_len = reached.len();
                let entry = reached.entry(neighbor.name.clone());
                match entry {
                    std::collections::hash_map::Entry::Occupied(mut existing) => {
                        // Strongest path wins.
                        if path_strength > existing.get().strength {
                            existing.get_mut().strength = path_strength;
                        }
                    }
                    std::collections::hash_map::Entry::Vacant(vacant) => {
                        if reached_len < WALK_NODE_BUDGET {
                            vacant.insert(ReachedEntity {
                                name: neighbor.name.clone(),
                                strength: path_strength,
                                depth: hop,
                            });
                            next.push((neighbor.name.clone(), path_strength));
                        }
                    }
                }

                let a = node_of(&mut graph, &mut nodes, &entity.name);
                let b = node_of(&mut graph, &mut nodes, &neighbor.name);
                if graph.find_edge(a, b).is_none() {
                    graph.add_edge(a, b, relation.strength.value());
                }
            }
        }
        frontier = next;
    }

    let mut entities: Vec<ReachedEntity> = reached.into_values().collect();
    entities.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(Subgraph {
        entities,
        relations: collected_relations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::{Confidence, Strength};
    use engram_core::models::Entity;
    use std::sync::Arc;

    fn seed_graph(storage: &StorageEngine) -> (Entity, Entity, Entity) {
        let api = Entity::new("p1", "api", "service");
        let redis = Entity::new("p1", "redis", "service");
        let disk = Entity::new("p1", "disk", "resource");
        storage
            .with_writer(|conn| {
                entity_ops::insert_entity(conn, &api)?;
                entity_ops::insert_entity(conn, &redis)?;
                entity_ops::insert_entity(conn, &disk)?;
                entity_ops::insert_relation(
                    conn,
                    &Relation {
                        id: "r1".into(),
                        project_id: "p1".into(),
                        from_entity: api.id.clone(),
                        to_entity: redis.id.clone(),
                        relation_type: RelationType::DependsOn,
                        strength: Strength::new(0.8),
                        confidence: Confidence::new(1.0),
                        valid_from: Utc::now() - chrono::Duration::days(1),
                        valid_until: None,
                    },
                )?;
                entity_ops::insert_relation(
                    conn,
                    &Relation {
                        id: "r2".into(),
                        project_id: "p1".into(),
                        from_entity: redis.id.clone(),
                        to_entity: disk.id.clone(),
                        relation_type: RelationType::DependsOn,
                        strength: Strength::new(0.5),
                        confidence: Confidence::new(1.0),
                        valid_from: Utc::now() - chrono::Duration::days(1),
                        valid_until: None,
                    },
                )?;
                Ok(())
            })
            .unwrap();
        (api, redis, disk)
    }

    #[test]
    fn walk_aggregates_path_strength() {
        let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
        seed_graph(&storage);

        let subgraph = walk(&storage, "p1", &["api".into()], 2, None).unwrap();
        let strengths: HashMap<&str, f64> = subgraph
            .entities
            .iter()
            .map(|e| (e.name.as_str(), e.strength))
            .collect();

        assert_eq!(strengths["api"], 1.0);
        assert!((strengths["redis"] - 0.8).abs() < 1e-9);
        assert!((strengths["disk"] - 0.4).abs() < 1e-9);
        assert_eq!(subgraph.relations.len(), 2);
    }

    #[test]
    fn depth_limits_the_walk() {
        let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
        seed_graph(&storage);

        let subgraph = walk(&storage, "p1", &["api".into()], 1, None).unwrap();
        assert!(subgraph.entities.iter().all(|e| e.name != "disk"));
    }

    #[test]
    fn relation_filter_prunes_edges() {
        let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
        seed_graph(&storage);

        let subgraph = walk(
            &storage,
            "p1",
            &["api".into()],
            2,
            Some(&[RelationType::Contradicts]),
        )
        .unwrap();
        assert_eq!(subgraph.entities.len(), 1);
        assert!(subgraph.relations.is_empty());
    }

    #[test]
    fn cyclic_graphs_terminate() {
        let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
        let (api, redis, _) = seed_graph(&storage);
        storage
            .with_writer(|conn| {
                entity_ops::insert_relation(
                    conn,
                    &Relation {
                        id: "r3".into(),
                        project_id: "p1".into(),
                        from_entity: redis.id.clone(),
                        to_entity: api.id.clone(),
                        relation_type: RelationType::Extends,
                        strength: Strength::new(0.9),
                        confidence: Confidence::new(1.0),
                        valid_from: Utc::now() - chrono::Duration::days(1),
                        valid_until: None,
                    },
                )
            })
            .unwrap();

        let subgraph = walk(&storage, "p1", &["api".into()], 5, None).unwrap();
        assert!(subgraph.entities.len() <= WALK_NODE_BUDGET);
    }
}
