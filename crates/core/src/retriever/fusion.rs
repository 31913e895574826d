//! Weighted reciprocal rank fusion of lexical and vector rankings.

use std::collections::HashMap;

/// Fusion parameters. The constant dampens the influence of top ranks;
/// the weights bias fusion toward one source without ever zeroing the
/// other.
#[derive(Debug, Clone, Copy)]
pub struct FusionConfig {
    pub constant: f32,
    pub vector_weight: f32,
    pub lexical_weight: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { constant: 60.0, vector_weight: 0.7, lexical_weight: 0.3 }
    }
}

/// Where a fused candidate's score came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreProvenance {
    /// 1-based rank in the lexical list, if it appeared there.
    pub lexical_rank: Option<usize>,
    /// 1-based rank in the vector list, if it appeared there.
    pub vector_rank: Option<usize>,
    /// Whether a reranker reordered this result afterwards.
    pub reranked: bool,
}

#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub path: String,
    pub score: f32,
    pub provenance: ScoreProvenance,
}

/// Fuse the two ranked lists.
///
/// Each appearance contributes `weight / (constant + rank)`. Ties break by
/// first appearance across the lexical list then the vector list, so the
/// output is deterministic for identical inputs.
pub fn fuse(
    lexical: &[String],
    vector: &[String],
    config: FusionConfig,
) -> Vec<FusedCandidate> {
    struct Slot {
        score: f32,
        provenance: ScoreProvenance,
        order: usize,
    }

    let mut slots: HashMap<&str, Slot> = HashMap::new();
    let mut next_order = 0usize;

    for (i, path) in lexical.iter().enumerate() {
        let rank = i + 1;
        let slot = slots.entry(path).or_insert_with(|| {
            let order = next_order;
            next_order += 1;
            Slot { score: 0.0, provenance: ScoreProvenance::default(), order }
        });
        slot.score += config.lexical_weight / (config.constant + rank as f32);
        slot.provenance.lexical_rank = Some(rank);
    }

    for (i, path) in vector.iter().enumerate() {
        let rank = i + 1;
        let slot = slots.entry(path).or_insert_with(|| {
            let order = next_order;
            next_order += 1;
            Slot { score: 0.0, provenance: ScoreProvenance::default(), order }
        });
        slot.score += config.vector_weight / (config.constant + rank as f32);
        slot.provenance.vector_rank = Some(rank);
    }

    let mut fused: Vec<(usize, FusedCandidate)> = slots
        .into_iter()
        .map(|(path, slot)| {
            (
                slot.order,
                FusedCandidate {
                    path: path.to_string(),
                    score: slot.score,
                    provenance: slot.provenance,
                },
            )
        })
        .collect();

    fused.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    fused.into_iter().map(|(_, c)| c).collect()
}
