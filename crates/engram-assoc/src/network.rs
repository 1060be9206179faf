//! Associative network manager over the link table.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;

use engram_core::deadline::Deadline;
use engram_core::errors::EngramResult;
use engram_core::memory::Strength;
use engram_core::models::{
    ActivationState, Inhibition, InhibitionType, LinkType, MemoryLayer, Priming,
};
use engram_storage::queries::link_ops;
use engram_storage::StorageEngine;

use crate::spreading::{spread, SpreadParams};

/// Days a link may sit idle before the decay tick touches it.
const LINK_IDLE_DAYS: i64 = 7;

pub struct AssociativeNetwork {
    storage: Arc<StorageEngine>,
}

impl AssociativeNetwork {
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Hebbian co-access: strengthen pairwise links among all items
    /// touched by a single operation. Links are symmetric; both
    /// directions are strengthened.
    pub fn co_access(
        &self,
        items: &[(String, MemoryLayer)],
        link_type: LinkType,
    ) -> EngramResult<()> {
        if items.len() < 2 {
            return Ok(());
        }
        let now_ms = Utc::now().timestamp_millis();
        self.storage.with_writer(|conn| {
            for i in 0..items.len() {
                for j in (i + 1)..items.len() {
                    let (a, a_layer) = &items[i];
                    let (b, b_layer) = &items[j];
                    link_ops::strengthen_link(conn, a, *a_layer, b, *b_layer, link_type, now_ms)?;
                    link_ops::strengthen_link(conn, b, *b_layer, a, *a_layer, link_type, now_ms)?;
                }
            }
            Ok(())
        })
    }

    /// One decay tick: multiplicatively weaken links idle for more than
    /// the idle window. Returns the number of links touched.
    pub fn decay_tick(&self) -> EngramResult<usize> {
        let idle_before = (Utc::now() - Duration::days(LINK_IDLE_DAYS)).timestamp_millis();
        let touched = self
            .storage
            .with_writer(|conn| link_ops::decay_idle_links(conn, idle_before))?;
        debug!(links = touched, "association decay tick");
        Ok(touched)
    }

    /// Spreading activation seeded from the given items, reading links
    /// from storage frontier by frontier.
    pub fn spread_from(
        &self,
        seeds: &[(String, f64)],
        params: SpreadParams,
        deadline: Deadline,
    ) -> EngramResult<Vec<ActivationState>> {
        spread(seeds, params, deadline, |node_id| {
            self.storage
                .with_reader(|conn| link_ops::links_from(conn, node_id))
        })
    }

    /// Prime an item for a TTL.
    pub fn prime(&self, item_id: &str, strength: f64, ttl_ms: u64) -> EngramResult<()> {
        let priming = Priming {
            item_id: item_id.to_string(),
            strength: Strength::new(strength),
            expires_at: Utc::now() + Duration::milliseconds(ttl_ms as i64),
        };
        self.storage
            .with_writer(|conn| link_ops::upsert_priming(conn, &priming))
    }

    /// Priming boost for an item, 0.0 when none is active.
    pub fn priming_boost(&self, item_id: &str) -> EngramResult<f64> {
        let now_ms = Utc::now().timestamp_millis();
        let priming = self
            .storage
            .with_reader(|conn| link_ops::get_priming(conn, item_id, now_ms))?;
        Ok(priming.map(|p| p.strength.value()).unwrap_or(0.0))
    }

    /// Suppress an item for a TTL.
    pub fn inhibit(
        &self,
        item_id: &str,
        inhibition_type: InhibitionType,
        ttl_ms: u64,
    ) -> EngramResult<()> {
        let inhibition = Inhibition {
            item_id: item_id.to_string(),
            strength: Strength::new(1.0),
            inhibition_type,
            expires_at: Utc::now() + Duration::milliseconds(ttl_ms as i64),
        };
        self.storage
            .with_writer(|conn| link_ops::upsert_inhibition(conn, &inhibition))
    }

    /// Ids excluded from retrieval right now.
    pub fn inhibited_ids(&self, release_threshold: f64) -> EngramResult<HashSet<String>> {
        let now_ms = Utc::now().timestamp_millis();
        let active = self
            .storage
            .with_reader(|conn| link_ops::active_inhibitions(conn, now_ms, release_threshold))?;
        Ok(active.into_iter().map(|i| i.item_id).collect())
    }

    /// Drop expired priming/inhibition rows.
    pub fn sweep_expired(&self) -> EngramResult<usize> {
        let now_ms = Utc::now().timestamp_millis();
        self.storage
            .with_writer(|conn| link_ops::sweep_expired(conn, now_ms))
    }

    /// Remove all links attached to a forgotten memory.
    pub fn unlink(&self, item_id: &str) -> EngramResult<usize> {
        self.storage
            .with_writer(|conn| link_ops::delete_links_for(conn, item_id))
    }
}
