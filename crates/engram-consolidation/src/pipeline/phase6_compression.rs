//! Phase 6: Compression.
//!
//! Memories older than the configured age tiers get executive summaries.
//! At the final tier the original content is zstd-archived and search
//! switches to the summary; the archive is the retained reference.

use chrono::{DateTime, Utc};
use tracing::debug;

use engram_core::config::CompressionConfig;
use engram_core::errors::EngramResult;
use engram_core::memory::MemoryRecord;
use engram_core::traits::ISummarizer;

use crate::summarize::{compression_ratio, count_tokens, fidelity_score};

/// Target summary size per level, in tokens.
const LEVEL_TARGET_TOKENS: [usize; 3] = [100, 50, 20];

/// zstd level for archived originals.
const ARCHIVE_ZSTD_LEVEL: i32 = 9;

/// Result of compressing one memory.
#[derive(Debug)]
pub struct CompressionOutcome {
    pub memory: MemoryRecord,
    pub new_level: u8,
    pub ratio: f64,
    pub fidelity: f64,
    /// zstd-compressed original, present when the final tier archived it.
    pub archived_original: Option<Vec<u8>>,
    /// Summaries below the fidelity threshold are recorded but flagged.
    pub fidelity_miss: bool,
}

/// Compress one memory to the level its age demands. Returns None when
/// the memory is already at or above that level.
pub fn compress_memory(
    memory: &MemoryRecord,
    config: &CompressionConfig,
    summarizer: &dyn ISummarizer,
    now: DateTime<Utc>,
) -> EngramResult<Option<CompressionOutcome>> {
    let age_days = (now - memory.created_at).num_days().max(0) as u32;
    let target_level = config.level_for_age_days(age_days);
    if target_level == 0 || target_level <= memory.compression_level {
        return Ok(None);
    }

    let original = memory.content.text();
    if original.is_empty() {
        return Ok(None);
    }

    let target_tokens = LEVEL_TARGET_TOKENS[(target_level - 1) as usize];
    let summary = summarizer.summarize(original, target_tokens)?;
    let ratio = compression_ratio(original, &summary);
    let fidelity = fidelity_score(original, &summary);
    let fidelity_miss = fidelity < config.fidelity_threshold;

    let archived_original = if target_level >= 3 {
        let compressed = zstd::encode_all(original.as_bytes(), ARCHIVE_ZSTD_LEVEL)
            .map_err(|e| engram_core::errors::StorageError::Sqlite {
                message: format!("archive compression: {e}"),
            })?;
        Some(compressed)
    } else {
        None
    };

    let mut updated = memory.clone();
    updated.content_executive = Some(summary);
    updated.compression_level = target_level;

    debug!(
        memory_id = %memory.id,
        level = target_level,
        ratio,
        fidelity,
        original_tokens = count_tokens(original),
        "compressed memory"
    );

    Ok(Some(CompressionOutcome {
        memory: updated,
        new_level: target_level,
        ratio,
        fidelity,
        archived_original,
        fidelity_miss,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::ExtractiveSummarizer;
    use engram_core::memory::{MemoryKind, TypedContent};

    fn aged_memory(days: i64) -> MemoryRecord {
        let text = "The deploy failed at midnight. The database migration locked a table. \
                    Retrying after the lock cleared succeeded. The postmortem was written. \
                    Alerts were added to catch lock contention.";
        let mut m = MemoryRecord::new(
            "p1",
            TypedContent::from_text(MemoryKind::Episodic, text),
            vec![],
        );
        m.created_at = Utc::now() - chrono::Duration::days(days);
        m
    }

    #[test]
    fn young_memories_are_untouched() {
        let memory = aged_memory(2);
        let outcome = compress_memory(
            &memory,
            &CompressionConfig::default(),
            &ExtractiveSummarizer,
            Utc::now(),
        )
        .unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn week_old_memory_reaches_level_one() {
        let memory = aged_memory(10);
        let outcome = compress_memory(
            &memory,
            &CompressionConfig::default(),
            &ExtractiveSummarizer,
            Utc::now(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(outcome.new_level, 1);
        assert!(outcome.memory.content_executive.is_some());
        assert!(outcome.archived_original.is_none());
        assert!(outcome.ratio <= 1.0);
    }

    #[test]
    fn ninety_day_memory_is_archived() {
        let memory = aged_memory(120);
        let outcome = compress_memory(
            &memory,
            &CompressionConfig::default(),
            &ExtractiveSummarizer,
            Utc::now(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(outcome.new_level, 3);
        let archived = outcome.archived_original.unwrap();
        let restored = zstd::decode_all(archived.as_slice()).unwrap();
        assert_eq!(
            String::from_utf8(restored).unwrap(),
            memory.content.text()
        );
        // Search now sees the summary.
        assert_eq!(
            outcome.memory.searchable_text(),
            outcome.memory.content_executive.as_deref().unwrap()
        );
    }

    #[test]
    fn already_compressed_level_is_not_redone() {
        let mut memory = aged_memory(10);
        memory.compression_level = 1;
        let outcome = compress_memory(
            &memory,
            &CompressionConfig::default(),
            &ExtractiveSummarizer,
            Utc::now(),
        )
        .unwrap();
        assert!(outcome.is_none());
    }
}
