//! Association links, priming, and inhibition rows.
//!
//! Links are adjacency rows keyed by (from_id, to_id, link_type); the
//! Hebbian update is an upsert that increments co-occurrence and applies
//! one strengthening step.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::constants::{HEBBIAN_RATE, LINK_DECAY_FACTOR};
use engram_core::errors::EngramResult;
use engram_core::memory::Strength;
use engram_core::models::{
    AssociationLink, Inhibition, InhibitionType, LinkType, MemoryLayer, Priming,
};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

/// Hebbian co-access update: insert the link at base strength or apply one
/// strengthening step, bumping co-occurrence either way.
pub fn strengthen_link(
    conn: &Connection,
    from_id: &str,
    from_layer: MemoryLayer,
    to_id: &str,
    to_layer: MemoryLayer,
    link_type: LinkType,
    now_ms: i64,
) -> EngramResult<()> {
    let existing: Option<f64> = conn
        .query_row(
            "SELECT strength FROM association_links
             WHERE from_id = ?1 AND to_id = ?2 AND link_type = ?3",
            params![from_id, to_id, link_type.as_str()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    match existing {
        Some(strength) => {
            let new_strength = Strength::new(strength).strengthened(HEBBIAN_RATE);
            conn.execute(
                "UPDATE association_links
                 SET strength = ?4, co_occurrence_count = co_occurrence_count + 1,
                     last_strengthened_ms = ?5
                 WHERE from_id = ?1 AND to_id = ?2 AND link_type = ?3",
                params![
                    from_id,
                    to_id,
                    link_type.as_str(),
                    new_strength.value(),
                    now_ms
                ],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        }
        None => {
            conn.execute(
                "INSERT INTO association_links (
                    from_id, from_layer, to_id, to_layer, link_type, strength,
                    co_occurrence_count, last_strengthened_ms
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
                params![
                    from_id,
                    from_layer.as_str(),
                    to_id,
                    to_layer.as_str(),
                    link_type.as_str(),
                    HEBBIAN_RATE,
                    now_ms
                ],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        }
    }
    Ok(())
}

/// Outgoing links from a node, strongest first.
pub fn links_from(conn: &Connection, from_id: &str) -> EngramResult<Vec<AssociationLink>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_LINK} FROM association_links WHERE from_id = ?1
             ORDER BY strength DESC, last_strengthened_ms DESC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    collect_links(stmt.query_map(params![from_id], |row| Ok(row_to_link(row))))
}

/// All links touching a node in either direction.
pub fn links_touching(conn: &Connection, id: &str) -> EngramResult<Vec<AssociationLink>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_LINK} FROM association_links WHERE from_id = ?1 OR to_id = ?1
             ORDER BY strength DESC, last_strengthened_ms DESC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    collect_links(stmt.query_map(params![id], |row| Ok(row_to_link(row))))
}

/// Apply one multiplicative decay tick to links idle since `idle_before_ms`.
/// Returns the number of links decayed.
pub fn decay_idle_links(conn: &Connection, idle_before_ms: i64) -> EngramResult<usize> {
    let changed = conn
        .execute(
            "UPDATE association_links SET strength = strength * ?1
             WHERE last_strengthened_ms < ?2",
            params![LINK_DECAY_FACTOR, idle_before_ms],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(changed)
}

/// Remove links attached to a deleted memory.
pub fn delete_links_for(conn: &Connection, id: &str) -> EngramResult<usize> {
    let changed = conn
        .execute(
            "DELETE FROM association_links WHERE from_id = ?1 OR to_id = ?1",
            params![id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(changed)
}

// --- Priming ---

pub fn upsert_priming(conn: &Connection, priming: &Priming) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO priming (item_id, strength, expires_at_ms) VALUES (?1, ?2, ?3)
         ON CONFLICT(item_id) DO UPDATE SET strength = ?2, expires_at_ms = ?3",
        params![
            priming.item_id,
            priming.strength.value(),
            datetime_to_ms(priming.expires_at)
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Active priming for an item, if not expired at `now_ms`.
pub fn get_priming(conn: &Connection, item_id: &str, now_ms: i64) -> EngramResult<Option<Priming>> {
    let result = conn
        .query_row(
            "SELECT item_id, strength, expires_at_ms FROM priming
             WHERE item_id = ?1 AND expires_at_ms > ?2",
            params![item_id, now_ms],
            |row| {
                Ok(Priming {
                    item_id: row.get(0)?,
                    strength: Strength::new(row.get(1)?),
                    expires_at: ms_to_datetime(row.get(2)?),
                })
            },
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(result)
}

// --- Inhibition ---

pub fn upsert_inhibition(conn: &Connection, inhibition: &Inhibition) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO inhibition (item_id, strength, inhibition_type, expires_at_ms)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(item_id) DO UPDATE SET
            strength = ?2, inhibition_type = ?3, expires_at_ms = ?4",
        params![
            inhibition.item_id,
            inhibition.strength.value(),
            inhibition.inhibition_type.as_str(),
            datetime_to_ms(inhibition.expires_at)
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Ids currently inhibited at `now_ms` with strength ≥ `release_threshold`.
pub fn active_inhibitions(
    conn: &Connection,
    now_ms: i64,
    release_threshold: f64,
) -> EngramResult<Vec<Inhibition>> {
    let mut stmt = conn
        .prepare(
            "SELECT item_id, strength, inhibition_type, expires_at_ms FROM inhibition
             WHERE expires_at_ms > ?1 AND strength >= ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![now_ms, release_threshold], |row| {
            let type_str: String = row.get(2)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                type_str,
                row.get::<_, i64>(3)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        let (item_id, strength, type_str, expires_ms) =
            row.map_err(|e| to_storage_err(e.to_string()))?;
        let inhibition_type = InhibitionType::parse(&type_str)
            .ok_or_else(|| to_storage_err(format!("unknown inhibition type: {type_str}")))?;
        out.push(Inhibition {
            item_id,
            strength: Strength::new(strength),
            inhibition_type,
            expires_at: ms_to_datetime(expires_ms),
        });
    }
    Ok(out)
}

/// Drop expired priming and inhibition rows. Returns rows removed.
pub fn sweep_expired(conn: &Connection, now_ms: i64) -> EngramResult<usize> {
    let a = conn
        .execute("DELETE FROM priming WHERE expires_at_ms <= ?1", params![now_ms])
        .map_err(|e| to_storage_err(e.to_string()))?;
    let b = conn
        .execute(
            "DELETE FROM inhibition WHERE expires_at_ms <= ?1",
            params![now_ms],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(a + b)
}

const SELECT_LINK: &str = "SELECT from_id, from_layer, to_id, to_layer, link_type, \
    strength, co_occurrence_count, last_strengthened_ms";

fn row_to_link(row: &rusqlite::Row<'_>) -> EngramResult<AssociationLink> {
    let from_layer_str: String = row.get(1).map_err(|e| to_storage_err(e.to_string()))?;
    let to_layer_str: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
    let type_str: String = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(AssociationLink {
        from_id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        from_layer: MemoryLayer::parse(&from_layer_str)
            .ok_or_else(|| to_storage_err(format!("unknown layer: {from_layer_str}")))?,
        to_id: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        to_layer: MemoryLayer::parse(&to_layer_str)
            .ok_or_else(|| to_storage_err(format!("unknown layer: {to_layer_str}")))?,
        link_type: LinkType::parse(&type_str)
            .ok_or_else(|| to_storage_err(format!("unknown link type: {type_str}")))?,
        strength: Strength::new(row.get(5).map_err(|e| to_storage_err(e.to_string()))?),
        co_occurrence_count: row.get(6).map_err(|e| to_storage_err(e.to_string()))?,
        last_strengthened: ms_to_datetime(row.get(7).map_err(|e| to_storage_err(e.to_string()))?),
    })
}

fn collect_links(
    rows: rusqlite::Result<impl Iterator<Item = rusqlite::Result<EngramResult<AssociationLink>>>>,
) -> EngramResult<Vec<AssociationLink>> {
    let rows = rows.map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use chrono::{Duration, Utc};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn first_co_access_creates_link_at_base_strength() {
        let conn = test_conn();
        strengthen_link(
            &conn,
            "a",
            MemoryLayer::Semantic,
            "b",
            MemoryLayer::Semantic,
            LinkType::Similarity,
            1000,
        )
        .unwrap();

        let links = links_from(&conn, "a").unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].co_occurrence_count, 1);
        assert!((links[0].strength.value() - HEBBIAN_RATE).abs() < 1e-9);
    }

    #[test]
    fn repeated_co_access_strengthens_and_counts() {
        let conn = test_conn();
        for i in 0..3 {
            strengthen_link(
                &conn,
                "a",
                MemoryLayer::Semantic,
                "b",
                MemoryLayer::Semantic,
                LinkType::Similarity,
                1000 + i,
            )
            .unwrap();
        }
        let links = links_from(&conn, "a").unwrap();
        assert_eq!(links[0].co_occurrence_count, 3);
        // 0.05 then two Hebbian steps.
        let expected = Strength::new(HEBBIAN_RATE)
            .strengthened(HEBBIAN_RATE)
            .strengthened(HEBBIAN_RATE);
        assert!((links[0].strength.value() - expected.value()).abs() < 1e-9);
    }

    #[test]
    fn idle_links_decay_multiplicatively() {
        let conn = test_conn();
        strengthen_link(
            &conn,
            "a",
            MemoryLayer::Semantic,
            "b",
            MemoryLayer::Semantic,
            LinkType::Temporal,
            1000,
        )
        .unwrap();

        let decayed = decay_idle_links(&conn, 2000).unwrap();
        assert_eq!(decayed, 1);
        let links = links_from(&conn, "a").unwrap();
        assert!((links[0].strength.value() - HEBBIAN_RATE * LINK_DECAY_FACTOR).abs() < 1e-9);
    }

    #[test]
    fn priming_expires() {
        let conn = test_conn();
        let priming = Priming {
            item_id: "m1".into(),
            strength: Strength::new(0.5),
            expires_at: Utc::now() + Duration::seconds(60),
        };
        upsert_priming(&conn, &priming).unwrap();

        let now_ms = Utc::now().timestamp_millis();
        assert!(get_priming(&conn, "m1", now_ms).unwrap().is_some());
        let after_ms = (Utc::now() + Duration::seconds(120)).timestamp_millis();
        assert!(get_priming(&conn, "m1", after_ms).unwrap().is_none());

        assert_eq!(sweep_expired(&conn, after_ms).unwrap(), 1);
    }

    #[test]
    fn inhibition_active_set_respects_threshold_and_ttl() {
        let conn = test_conn();
        let strong = Inhibition {
            item_id: "m1".into(),
            strength: Strength::new(0.8),
            inhibition_type: InhibitionType::Retroactive,
            expires_at: Utc::now() + Duration::seconds(60),
        };
        let weak = Inhibition {
            item_id: "m2".into(),
            strength: Strength::new(0.05),
            inhibition_type: InhibitionType::Selective,
            expires_at: Utc::now() + Duration::seconds(60),
        };
        upsert_inhibition(&conn, &strong).unwrap();
        upsert_inhibition(&conn, &weak).unwrap();

        let now_ms = Utc::now().timestamp_millis();
        let active = active_inhibitions(&conn, now_ms, 0.1).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].item_id, "m1");
    }
}
