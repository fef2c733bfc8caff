//! In-memory encoding store: identity labels paired positionally with
//! embedding vectors, in stable insertion order.

use crate::types::Embedding;
use serde::{Deserialize, Serialize};

/// Parallel-sequence encoding store for one detection model.
///
/// `names[i]` labels `encodings[i]`; the two vectors always have equal
/// length (enforced by construction — entries only enter via [`push`]).
/// A label may recur, once per enrolled face instance. Iteration order
/// is insertion order, which makes the matcher's tie-break deterministic.
///
/// [`push`]: Gallery::push
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Gallery {
    names: Vec<String>,
    encodings: Vec<Embedding>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one (label, embedding) entry.
    pub fn push(&mut self, label: impl Into<String>, encoding: Embedding) {
        self.names.push(label.into());
        self.encodings.push(encoding);
    }

    /// Number of entries (not distinct identities).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// True when the parallel sequences line up. A deserialized gallery
    /// that fails this check is corrupt and must be discarded.
    pub fn is_consistent(&self) -> bool {
        self.names.len() == self.encodings.len()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Embedding)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.encodings.iter())
    }

    pub fn encodings(&self) -> &[Embedding] {
        &self.encodings
    }

    /// Number of distinct identity labels.
    pub fn identity_count(&self) -> usize {
        let mut seen: Vec<&str> = Vec::new();
        for name in &self.names {
            if !seen.contains(&name.as_str()) {
                seen.push(name);
            }
        }
        seen.len()
    }

    /// Distinct labels with their entry counts, in first-seen order.
    pub fn identities(&self) -> Vec<(String, usize)> {
        let mut out: Vec<(String, usize)> = Vec::new();
        for name in &self.names {
            match out.iter_mut().find(|(label, _)| label == name) {
                Some((_, count)) => *count += 1,
                None => out.push((name.clone(), 1)),
            }
        }
        out
    }

    /// Remove every entry whose label matches, preserving the order of
    /// the remaining entries. Returns the number of entries removed.
    pub fn remove_label(&mut self, label: &str) -> usize {
        let before = self.names.len();
        let mut kept_names = Vec::with_capacity(before);
        let mut kept_encodings = Vec::with_capacity(before);
        for (name, encoding) in self.names.drain(..).zip(self.encodings.drain(..)) {
            if name != label {
                kept_names.push(name);
                kept_encodings.push(encoding);
            }
        }
        self.names = kept_names;
        self.encodings = kept_encodings;
        before - self.names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Embedding;

    fn emb(v: &[f32]) -> Embedding {
        Embedding::new(v.to_vec())
    }

    #[test]
    fn test_push_and_iterate_in_insertion_order() {
        let mut g = Gallery::new();
        g.push("alice", emb(&[1.0]));
        g.push("bob", emb(&[2.0]));
        g.push("alice", emb(&[3.0]));

        let labels: Vec<&str> = g.iter().map(|(n, _)| n).collect();
        assert_eq!(labels, vec!["alice", "bob", "alice"]);
        assert_eq!(g.len(), 3);
        assert_eq!(g.identity_count(), 2);
    }

    #[test]
    fn test_identities_counts_in_first_seen_order() {
        let mut g = Gallery::new();
        g.push("bob", emb(&[1.0]));
        g.push("alice", emb(&[2.0]));
        g.push("bob", emb(&[3.0]));
        assert_eq!(
            g.identities(),
            vec![("bob".to_string(), 2), ("alice".to_string(), 1)]
        );
    }

    #[test]
    fn test_remove_label_drops_all_matching_entries() {
        let mut g = Gallery::new();
        g.push("alice", emb(&[1.0]));
        g.push("bob", emb(&[2.0]));
        g.push("alice", emb(&[3.0]));

        assert_eq!(g.remove_label("alice"), 2);
        assert_eq!(g.len(), 1);
        assert!(g.is_consistent());
        let labels: Vec<&str> = g.iter().map(|(n, _)| n).collect();
        assert_eq!(labels, vec!["bob"]);
    }

    #[test]
    fn test_remove_label_missing_is_noop() {
        let mut g = Gallery::new();
        g.push("alice", emb(&[1.0]));
        assert_eq!(g.remove_label("carol"), 0);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_serde_shape() {
        let mut g = Gallery::new();
        g.push("alice", emb(&[0.5, -0.5]));
        let json = serde_json::to_string(&g).unwrap();
        assert_eq!(json, r#"{"names":["alice"],"encodings":[[0.5,-0.5]]}"#);

        let back: Gallery = serde_json::from_str(&json).unwrap();
        assert!(back.is_consistent());
        assert_eq!(back.len(), 1);
    }

    #[test]
    fn test_mismatched_lengths_detected_as_inconsistent() {
        let json = r#"{"names":["alice","bob"],"encodings":[[0.5]]}"#;
        let g: Gallery = serde_json::from_str(json).unwrap();
        assert!(!g.is_consistent());
    }
}
