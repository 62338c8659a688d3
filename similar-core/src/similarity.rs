use std::cmp::Ordering;

use camino::Utf8PathBuf;

use crate::search::MatchResult;

/// Scales `vector` to unit Euclidean norm. A zero vector is returned untouched.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = norm(&vector);
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

/// Cosine similarity between `a` and `b`. Does not assume either side is normalized.
///
/// Vectors of different lengths, or where either side has zero norm, have no meaningful
/// direction to compare and score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / denom
}

/// Scores every candidate against `query` and returns the best `top_k`, highest first.
///
/// Sorting is stable, so candidates with equal scores stay in the order they were given.
pub fn rank(query: &[f32], candidates: Vec<(Utf8PathBuf, Vec<f32>)>, top_k: usize) -> Vec<MatchResult> {
    if top_k == 0 {
        return vec![];
    }

    let mut scored: Vec<MatchResult> = candidates.into_iter()
        .map(|(path, vector)| MatchResult::new(path, cosine_similarity(query, &vector)))
        .collect();
    scored.sort_by(cmp_similarity_desc);
    scored.truncate(top_k);
    scored
}

// Private functions

fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

fn cmp_similarity_desc(l: &MatchResult, r: &MatchResult) -> Ordering {
    // r.compare(l) to reverse ordering for descending
    r.similarity.total_cmp(&l.similarity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, vector: &[f32]) -> (Utf8PathBuf, Vec<f32>) {
        (Utf8PathBuf::from(format!("/assets/{name}")), vector.to_vec())
    }

    #[test]
    fn normalize_gives_unit_norm() {
        let v = l2_normalize(vec![3.0, 4.0]);

        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector_alone() {
        assert_eq!(l2_normalize(vec![0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn cosine_ignores_magnitude() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]);

        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_opposites_is_negative_one() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]);

        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn rank_sorts_descending_and_truncates() {
        let query = [1.0, 0.0];
        let candidates = vec![
            candidate("far.png", &[0.0, 1.0]),
            candidate("close.png", &[1.0, 0.1]),
            candidate("middle.png", &[1.0, 1.0]),
            candidate("opposite.png", &[-1.0, 0.0]),
        ];

        let results = rank(&query, candidates, 3);

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["close.png", "middle.png", "far.png"]);
        assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn rank_ties_keep_input_order() {
        let query = [1.0, 0.0];
        let candidates = vec![
            candidate("b.png", &[2.0, 0.0]),
            candidate("a.png", &[1.0, 0.0]),
            candidate("c.png", &[5.0, 0.0]),
        ];

        let results = rank(&query, candidates, 10);

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b.png", "a.png", "c.png"]);
    }

    #[test]
    fn rank_zero_top_k_is_empty() {
        let candidates = vec![candidate("a.png", &[1.0]), candidate("b.png", &[1.0])];

        assert!(rank(&[1.0], candidates, 0).is_empty());
    }

    #[test]
    fn rank_returns_everything_when_top_k_exceeds_candidates() {
        let candidates = vec![candidate("a.png", &[1.0]), candidate("b.png", &[0.5])];

        assert_eq!(rank(&[1.0], candidates, 5).len(), 2);
    }
}
