//! Entity and relation rows for the graph layer.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::memory::{Confidence, Strength};
use engram_core::models::{Entity, Relation, RelationType};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn insert_entity(conn: &Connection, entity: &Entity) -> EngramResult<()> {
    let observations =
        serde_json::to_string(&entity.observations).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO entities (id, project_id, name, entity_type, observations, created_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entity.id,
            entity.project_id,
            entity.name,
            entity.entity_type,
            observations,
            datetime_to_ms(entity.created_at)
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_entity_by_name(
    conn: &Connection,
    project_id: &str,
    name: &str,
) -> EngramResult<Option<Entity>> {
    let result = conn
        .query_row(
            "SELECT id, project_id, name, entity_type, observations, created_at_ms
             FROM entities WHERE project_id = ?1 AND name = ?2",
            params![project_id, name],
            |row| Ok(row_to_entity(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match result {
        Some(Ok(e)) => Ok(Some(e)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

pub fn get_entity_by_id(conn: &Connection, id: &str) -> EngramResult<Option<Entity>> {
    let result = conn
        .query_row(
            "SELECT id, project_id, name, entity_type, observations, created_at_ms
             FROM entities WHERE id = ?1",
            params![id],
            |row| Ok(row_to_entity(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match result {
        Some(Ok(e)) => Ok(Some(e)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

/// Append observations to an existing entity.
pub fn add_observations(
    conn: &Connection,
    entity_id: &str,
    observations: &[String],
) -> EngramResult<()> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT observations FROM entities WHERE id = ?1",
            params![entity_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let Some(existing) = existing else {
        return Err(engram_core::errors::EngramError::NotFound {
            entity: "entity",
            id: entity_id.to_string(),
        });
    };

    let mut all: Vec<String> =
        serde_json::from_str(&existing).map_err(|e| to_storage_err(e.to_string()))?;
    all.extend(observations.iter().cloned());
    let updated = serde_json::to_string(&all).map_err(|e| to_storage_err(e.to_string()))?;

    conn.execute(
        "UPDATE entities SET observations = ?2 WHERE id = ?1",
        params![entity_id, updated],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn insert_relation(conn: &Connection, relation: &Relation) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO relations (
            id, project_id, from_entity, to_entity, relation_type, strength,
            confidence, valid_from_ms, valid_until_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(project_id, from_entity, to_entity, relation_type) DO UPDATE SET
            strength = ?6, confidence = ?7, valid_until_ms = ?9",
        params![
            relation.id,
            relation.project_id,
            relation.from_entity,
            relation.to_entity,
            relation.relation_type.as_str(),
            relation.strength.value(),
            relation.confidence.value(),
            datetime_to_ms(relation.valid_from),
            relation.valid_until.map(datetime_to_ms),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Relations valid at `now_ms` touching an entity, either direction.
pub fn relations_touching(
    conn: &Connection,
    entity_id: &str,
    now_ms: i64,
) -> EngramResult<Vec<Relation>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, project_id, from_entity, to_entity, relation_type, strength,
                    confidence, valid_from_ms, valid_until_ms
             FROM relations
             WHERE (from_entity = ?1 OR to_entity = ?1)
               AND valid_from_ms <= ?2
               AND (valid_until_ms IS NULL OR valid_until_ms > ?2)
             ORDER BY strength DESC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![entity_id, now_ms], |row| Ok(row_to_relation(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

/// Soft-invalidate a relation by setting valid_until.
pub fn invalidate_relation(conn: &Connection, relation_id: &str, at_ms: i64) -> EngramResult<()> {
    conn.execute(
        "UPDATE relations SET valid_until_ms = ?2 WHERE id = ?1 AND valid_until_ms IS NULL",
        params![relation_id, at_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Entity names present in the project graph, for query classification.
pub fn all_entity_names(conn: &Connection, project_id: &str) -> EngramResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM entities WHERE project_id = ?1")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![project_id], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}

pub fn count_entities(conn: &Connection, project_id: &str) -> EngramResult<u64> {
    conn.query_row(
        "SELECT COUNT(*) FROM entities WHERE project_id = ?1",
        params![project_id],
        |row| row.get::<_, u64>(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

fn row_to_entity(row: &rusqlite::Row<'_>) -> EngramResult<Entity> {
    let observations_json: String = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    Ok(Entity {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        project_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        name: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        entity_type: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        observations: serde_json::from_str(&observations_json)
            .map_err(|e| to_storage_err(e.to_string()))?,
        created_at: ms_to_datetime(row.get(5).map_err(|e| to_storage_err(e.to_string()))?),
    })
}

fn row_to_relation(row: &rusqlite::Row<'_>) -> EngramResult<Relation> {
    let type_str: String = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    let valid_until: Option<i64> = row.get(8).map_err(|e| to_storage_err(e.to_string()))?;
    Ok(Relation {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        project_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        from_entity: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        to_entity: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        relation_type: RelationType::parse(&type_str)
            .ok_or_else(|| to_storage_err(format!("unknown relation type: {type_str}")))?,
        strength: Strength::new(row.get(5).map_err(|e| to_storage_err(e.to_string()))?),
        confidence: Confidence::new(row.get(6).map_err(|e| to_storage_err(e.to_string()))?),
        valid_from: ms_to_datetime(row.get(7).map_err(|e| to_storage_err(e.to_string()))?),
        valid_until: valid_until.map(ms_to_datetime),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use chrono::Utc;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn relation(from: &str, to: &str) -> Relation {
        Relation {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: "p1".into(),
            from_entity: from.into(),
            to_entity: to.into(),
            relation_type: RelationType::DependsOn,
            strength: Strength::new(0.6),
            confidence: Confidence::new(0.9),
            valid_from: Utc::now(),
            valid_until: None,
        }
    }

    #[test]
    fn entity_round_trip_with_observations() {
        let conn = test_conn();
        let entity = Entity::new("p1", "redis", "service");
        insert_entity(&conn, &entity).unwrap();
        add_observations(&conn, &entity.id, &["used as cache".into()]).unwrap();

        let loaded = get_entity_by_name(&conn, "p1", "redis").unwrap().unwrap();
        assert_eq!(loaded.observations, vec!["used as cache".to_string()]);
    }

    #[test]
    fn invalidated_relations_disappear_from_walks() {
        let conn = test_conn();
        let rel = relation("api", "redis");
        insert_relation(&conn, &rel).unwrap();

        let now_ms = Utc::now().timestamp_millis();
        assert_eq!(relations_touching(&conn, "api", now_ms).unwrap().len(), 1);

        invalidate_relation(&conn, &rel.id, now_ms - 1).unwrap();
        assert!(relations_touching(&conn, "api", now_ms).unwrap().is_empty());
    }
}
