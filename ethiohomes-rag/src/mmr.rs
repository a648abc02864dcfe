//! Similarity scoring and maximal-marginal-relevance selection.

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Select up to `k` candidates balancing relevance to `query` against
/// redundancy with what has already been chosen.
///
/// Each round picks the candidate maximising
/// `w * sim(query, c) - (1 - w) * max(sim(c, s) for s in selected)`,
/// where `w` is `diversity_weight`. Ties go to the earlier candidate, so
/// callers should pass candidates in descending relevance order.
///
/// Returns indices into `candidates`, in selection order, without repeats.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[&[f32]],
    k: usize,
    diversity_weight: f32,
) -> Vec<usize> {
    let relevance: Vec<f32> = candidates.iter().map(|c| cosine_similarity(query, c)).collect();
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();
    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));

    while selected.len() < k && !remaining.is_empty() {
        let mut best: Option<(usize, f32)> = None;
        for (position, &index) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|&chosen| cosine_similarity(candidates[index], candidates[chosen]))
                .fold(None, |acc: Option<f32>, sim| Some(acc.map_or(sim, |m| m.max(sim))))
                .unwrap_or(0.0);
            let score =
                diversity_weight * relevance[index] - (1.0 - diversity_weight) * redundancy;
            // NaN ranks last.
            let score = if score.is_nan() { f32::NEG_INFINITY } else { score };
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((position, score));
            }
        }

        let Some((position, _)) = best else { break };
        selected.push(remaining.remove(position));
    }

    selected
}
