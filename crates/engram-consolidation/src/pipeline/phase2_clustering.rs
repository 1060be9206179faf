//! Phase 2: Clustering — hierarchical agglomerative over embedding cosine,
//! gated by temporal proximity.
//!
//! Average-linkage: two clusters merge while their mean pairwise cosine
//! stays at or above the similarity threshold and their time spans stay
//! inside the window. Output ordering is deterministic (earliest event,
//! then id) so promotion decisions are reproducible.

use chrono::DateTime;
use chrono::Utc;

use engram_core::models::EpisodicEvent;
use engram_index::cosine_similarity;

/// Result of clustering: each inner Vec holds indices into the event
/// slice. Unclustered events are noise.
#[derive(Debug, Clone)]
pub struct ClusterResult {
    pub clusters: Vec<Vec<usize>>,
    pub noise: Vec<usize>,
}

/// Cluster events by embedding similarity and temporal proximity.
///
/// `embeddings` must be parallel to `events`.
pub fn cluster_events(
    events: &[EpisodicEvent],
    embeddings: &[Vec<f32>],
    similarity_threshold: f64,
    time_window_ms: i64,
    min_cluster_size: usize,
) -> ClusterResult {
    let n = events.len();
    if n == 0 {
        return ClusterResult {
            clusters: vec![],
            noise: vec![],
        };
    }

    // Start with singletons; greedily merge the best admissible pair.
    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for a in 0..clusters.len() {
            for b in (a + 1)..clusters.len() {
                if !within_time_window(&clusters[a], &clusters[b], events, time_window_ms) {
                    continue;
                }
                let link = average_linkage(&clusters[a], &clusters[b], embeddings);
                if link >= similarity_threshold
                    && best.map_or(true, |(_, _, best_link)| link > best_link)
                {
                    best = Some((a, b, link));
                }
            }
        }

        match best {
            Some((a, b, _)) => {
                let merged = clusters.remove(b);
                clusters[a].extend(merged);
                clusters[a].sort_unstable();
            }
            None => break,
        }
    }

    let (mut kept, mut noise): (Vec<Vec<usize>>, Vec<Vec<usize>>) = clusters
        .into_iter()
        .partition(|c| c.len() >= min_cluster_size);

    // Deterministic cluster order: earliest member timestamp, then the
    // smallest member id.
    kept.sort_by_key(|c| cluster_sort_key(c, events));

    ClusterResult {
        clusters: kept,
        noise: noise.drain(..).flatten().collect(),
    }
}

fn cluster_sort_key(cluster: &[usize], events: &[EpisodicEvent]) -> (DateTime<Utc>, String) {
    let earliest = cluster
        .iter()
        .map(|&i| events[i].timestamp)
        .min()
        .unwrap_or_else(Utc::now);
    let smallest_id = cluster
        .iter()
        .map(|&i| events[i].id.clone())
        .min()
        .unwrap_or_default();
    (earliest, smallest_id)
}

fn within_time_window(
    a: &[usize],
    b: &[usize],
    events: &[EpisodicEvent],
    window_ms: i64,
) -> bool {
    let min = a
        .iter()
        .chain(b)
        .map(|&i| events[i].timestamp.timestamp_millis())
        .min()
        .unwrap_or(0);
    let max = a
        .iter()
        .chain(b)
        .map(|&i| events[i].timestamp.timestamp_millis())
        .max()
        .unwrap_or(0);
    max - min <= window_ms
}

fn average_linkage(a: &[usize], b: &[usize], embeddings: &[Vec<f32>]) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for &i in a {
        for &j in b {
            total += cosine_similarity(&embeddings[i], &embeddings[j]);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event_at(content: &str, minutes_ago: i64) -> EpisodicEvent {
        let mut e = EpisodicEvent::new("p1", "s1", "command", content);
        e.timestamp = Utc::now() - Duration::minutes(minutes_ago);
        e
    }

    #[test]
    fn similar_events_within_window_cluster() {
        let events = vec![
            event_at("deploy one", 10),
            event_at("deploy two", 9),
            event_at("deploy three", 8),
        ];
        let embeddings = vec![vec![1.0, 0.0]; 3];
        let result = cluster_events(&events, &embeddings, 0.75, 3_600_000, 3);
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.clusters[0].len(), 3);
        assert!(result.noise.is_empty());
    }

    #[test]
    fn dissimilar_events_stay_apart() {
        let events = vec![event_at("deploy", 10), event_at("lunch", 9)];
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let result = cluster_events(&events, &embeddings, 0.75, 3_600_000, 2);
        assert!(result.clusters.is_empty());
        assert_eq!(result.noise.len(), 2);
    }

    #[test]
    fn time_window_blocks_distant_merges() {
        let events = vec![event_at("deploy one", 0), event_at("deploy two", 60 * 24)];
        let embeddings = vec![vec![1.0, 0.0]; 2];
        let result = cluster_events(&events, &embeddings, 0.75, 3_600_000, 2);
        assert!(result.clusters.is_empty());
    }

    #[test]
    fn small_clusters_are_noise() {
        let events = vec![event_at("deploy one", 10), event_at("deploy two", 9)];
        let embeddings = vec![vec![1.0, 0.0]; 2];
        let result = cluster_events(&events, &embeddings, 0.75, 3_600_000, 3);
        assert!(result.clusters.is_empty());
        assert_eq!(result.noise.len(), 2);
    }

    #[test]
    fn clustering_is_deterministic() {
        let events = vec![
            event_at("deploy a", 30),
            event_at("deploy b", 20),
            event_at("deploy c", 10),
            event_at("unrelated topic entirely", 5),
        ];
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![1.0, 0.05],
            vec![1.0, -0.05],
            vec![0.0, 1.0],
        ];
        let a = cluster_events(&events, &embeddings, 0.75, 3_600_000, 3);
        let b = cluster_events(&events, &embeddings, 0.75, 3_600_000, 3);
        assert_eq!(a.clusters, b.clusters);
        assert_eq!(a.noise, b.noise);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let result = cluster_events(&[], &[], 0.75, 3_600_000, 3);
        assert!(result.clusters.is_empty());
        assert!(result.noise.is_empty());
    }
}
