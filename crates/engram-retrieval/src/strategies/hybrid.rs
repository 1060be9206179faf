//! Hybrid strategy: positional fusion of the vector and keyword rankings.

use engram_core::errors::EngramResult;
use engram_core::memory::MemoryRecord;
use engram_storage::queries::memory_query;

use super::{keyword, vector, StrategyContext};
use crate::fusion::fuse_ranked;

pub fn search(ctx: &StrategyContext<'_>) -> EngramResult<Vec<(MemoryRecord, f64)>> {
    ctx.deadline.check("hybrid_search")?;

    // Either side may fail independently; fusion runs on whatever came
    // back. Both failing surfaces the vector error.
    let vector_results = vector::search(ctx);
    let keyword_results = keyword::search(ctx);

    let (vector_results, keyword_results) = match (vector_results, keyword_results) {
        (Err(e), Err(_)) => return Err(e),
        (v, k) => (v.unwrap_or_default(), k.unwrap_or_default()),
    };

    let vector_ids: Vec<String> = vector_results.iter().map(|(m, _)| m.id.clone()).collect();
    let keyword_ids: Vec<String> = keyword_results.iter().map(|(m, _)| m.id.clone()).collect();

    let fused = fuse_ranked(&vector_ids, &keyword_ids, ctx.vector_weight);
    let ids: Vec<String> = fused
        .iter()
        .take(ctx.k)
        .map(|c| c.memory_id.clone())
        .collect();
    let memories = ctx
        .storage
        .with_reader(|conn| memory_query::get_memories(conn, &ids))?;

    Ok(fused
        .into_iter()
        .take(ctx.k)
        .filter_map(|candidate| {
            memories
                .iter()
                .find(|m| m.id == candidate.memory_id)
                .map(|m| (m.clone(), candidate.score))
        })
        .collect())
}
