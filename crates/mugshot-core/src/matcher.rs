//! Weighted-vote recognition: map one probe embedding to an identity
//! label using every gallery entry within an absolute distance threshold.
//!
//! Nearest-neighbor alone is sensitive to one noisy embedding; summing
//! inverse-distance weights across all within-threshold neighbors favors
//! an identity with many close matches over one borderline nearest hit,
//! while the absolute threshold still rejects faces unseen in training.

use crate::gallery::Gallery;
use crate::types::Embedding;
use thiserror::Error;

/// Acceptance threshold on Euclidean distance. A probe whose nearest
/// gallery entry is farther than this never matches.
pub const MATCH_THRESHOLD: f32 = 0.45;

/// Added to each distance before inversion so a zero-distance entry gets
/// a large but finite weight.
const WEIGHT_SOFTENING: f32 = 0.1;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MatchError {
    /// The gallery for the active model is empty or absent. Distinct
    /// from "no match": recognition is not applicable at all.
    #[error("no trained data for the active model")]
    NoTrainedData,
}

/// Winning identity from a weighted vote.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub label: String,
    /// Nearest qualifying distance for this label.
    pub distance: f32,
    /// Accumulated inverse-distance weight.
    pub weight: f32,
    /// Number of qualifying entries that voted for this label.
    pub votes: usize,
}

/// Identify a probe embedding against a gallery.
///
/// Returns `Ok(None)` when entries exist but none fall within the
/// threshold, and `Err(NoTrainedData)` when the gallery is empty —
/// the two must stay distinguishable for callers.
///
/// Ties in accumulated weight resolve to the label whose first
/// qualifying entry appears earliest in gallery insertion order.
pub fn identify(
    probe: &Embedding,
    gallery: &Gallery,
    threshold: f32,
) -> Result<Option<Match>, MatchError> {
    if gallery.is_empty() {
        return Err(MatchError::NoTrainedData);
    }

    let distances: Vec<f32> = gallery
        .encodings()
        .iter()
        .map(|e| probe.euclidean_distance(e))
        .collect();

    let best = distances.iter().copied().fold(f32::INFINITY, f32::min);
    if best > threshold {
        return Ok(None);
    }

    // Accumulate per-label weight in first-seen order over the gallery.
    let mut tally: Vec<Match> = Vec::new();
    for ((label, _), &distance) in gallery.iter().zip(distances.iter()) {
        if distance > threshold {
            continue;
        }
        let weight = 1.0 / (distance + WEIGHT_SOFTENING);
        match tally.iter_mut().find(|m| m.label == label) {
            Some(m) => {
                m.weight += weight;
                m.votes += 1;
                if distance < m.distance {
                    m.distance = distance;
                }
            }
            None => tally.push(Match {
                label: label.to_string(),
                distance,
                weight,
                votes: 1,
            }),
        }
    }

    // Strict `>` keeps the first-seen label on equal weights.
    let mut winner: Option<Match> = None;
    for m in tally {
        let better = match &winner {
            None => true,
            Some(w) => m.weight > w.weight,
        };
        if better {
            winner = Some(m);
        }
    }

    Ok(winner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(v: &[f32]) -> Embedding {
        Embedding::new(v.to_vec())
    }

    /// Gallery where each entry sits at an exact 1-d distance from a
    /// zero probe.
    fn gallery_at_distances(entries: &[(&str, f32)]) -> Gallery {
        let mut g = Gallery::new();
        for (label, d) in entries {
            g.push(*label, emb(&[*d]));
        }
        g
    }

    #[test]
    fn test_empty_gallery_is_no_trained_data() {
        let g = Gallery::new();
        let err = identify(&emb(&[0.0]), &g, MATCH_THRESHOLD).unwrap_err();
        assert_eq!(err, MatchError::NoTrainedData);
    }

    #[test]
    fn test_beyond_threshold_is_no_match() {
        let g = gallery_at_distances(&[("alice", 0.46), ("bob", 0.9)]);
        let result = identify(&emb(&[0.0]), &g, MATCH_THRESHOLD).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_at_threshold_matches() {
        // 0.25 is exactly representable through square and sqrt, so the
        // boundary comparison is exact: d == threshold must match.
        let g = gallery_at_distances(&[("alice", 0.25)]);
        let m = identify(&emb(&[0.0]), &g, 0.25).unwrap().unwrap();
        assert_eq!(m.label, "alice");
        assert_eq!(m.votes, 1);
    }

    #[test]
    fn test_weighted_vote_beats_single_nearest() {
        // A has two entries at 0.1 and 0.2; B a single entry at 0.15,
        // closer than A's second. A's accumulated weight still wins.
        // weights: A = 1/0.2 + 1/0.3 = 8.33, B = 1/0.25 = 4.0
        let g = gallery_at_distances(&[("A", 0.1), ("A", 0.2), ("B", 0.15)]);
        let m = identify(&emb(&[0.0]), &g, MATCH_THRESHOLD).unwrap().unwrap();
        assert_eq!(m.label, "A");
        assert_eq!(m.votes, 2);
        assert!((m.weight - (1.0 / 0.2 + 1.0 / 0.3)).abs() < 1e-4);
        assert!((m.distance - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_label_wins_when_weight_dominates() {
        let g = gallery_at_distances(&[("far", 0.4), ("near", 0.05)]);
        let m = identify(&emb(&[0.0]), &g, MATCH_THRESHOLD).unwrap().unwrap();
        assert_eq!(m.label, "near");
    }

    #[test]
    fn test_equal_weight_tie_breaks_to_first_seen() {
        // Same distance each, so accumulated weights are exactly equal.
        let g = gallery_at_distances(&[("first", 0.2), ("second", 0.2)]);
        let m = identify(&emb(&[0.0]), &g, MATCH_THRESHOLD).unwrap().unwrap();
        assert_eq!(m.label, "first");

        let g = gallery_at_distances(&[("second", 0.2), ("first", 0.2)]);
        let m = identify(&emb(&[0.0]), &g, MATCH_THRESHOLD).unwrap().unwrap();
        assert_eq!(m.label, "second");
    }

    #[test]
    fn test_entries_beyond_threshold_do_not_vote() {
        // B's far entry must not contribute to its tally.
        let g = gallery_at_distances(&[("A", 0.3), ("B", 0.3), ("B", 0.46)]);
        let m = identify(&emb(&[0.0]), &g, MATCH_THRESHOLD).unwrap().unwrap();
        assert_eq!(m.label, "A");
        assert_eq!(m.votes, 1);
    }
}
