//! Vector strategy: cosine similarity over the index.

use engram_core::errors::EngramResult;
use engram_core::memory::MemoryRecord;
use engram_storage::queries::memory_query;

use super::StrategyContext;

pub fn search(ctx: &StrategyContext<'_>) -> EngramResult<Vec<(MemoryRecord, f64)>> {
    ctx.deadline.check("vector_search")?;
    if ctx.query.trim().is_empty() {
        return Ok(vec![]);
    }

    let embedding = ctx.embedder.embed(ctx.query)?;
    ctx.deadline.check("vector_search")?;

    // Over-fetch to survive superseded filtering.
    let hits = ctx.index.search(ctx.project_id, &embedding, ctx.k * 2)?;
    let ids: Vec<String> = hits.iter().map(|(id, _)| id.clone()).collect();
    let memories = ctx
        .storage
        .with_reader(|conn| memory_query::get_memories(conn, &ids))?;

    let mut results: Vec<(MemoryRecord, f64)> = hits
        .into_iter()
        .filter_map(|(id, score)| {
            memories
                .iter()
                .find(|m| m.id == id && m.is_current())
                .map(|m| (m.clone(), score))
        })
        .collect();
    results.truncate(ctx.k);
    Ok(results)
}
