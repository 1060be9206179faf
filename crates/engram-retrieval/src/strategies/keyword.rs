//! Keyword strategy: BM25 over the FTS index, scores normalized to [0, 1].

use engram_core::errors::EngramResult;
use engram_core::memory::MemoryRecord;
use engram_core::traits::IMemoryStore;

use super::StrategyContext;

pub fn search(ctx: &StrategyContext<'_>) -> EngramResult<Vec<(MemoryRecord, f64)>> {
    ctx.deadline.check("keyword_search")?;
    let mut hits = ctx
        .storage
        .search_keyword(ctx.project_id, ctx.query, ctx.k)?;

    // BM25 magnitudes are corpus-dependent; normalize by the best hit so
    // fused and thresholded scores are comparable.
    let max_score = hits
        .iter()
        .map(|(_, s)| *s)
        .fold(f64::MIN, f64::max);
    if max_score > 0.0 {
        for (_, score) in &mut hits {
            *score /= max_score;
        }
    }
    Ok(hits)
}
