use std::collections::BTreeSet;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Jaccard similarity kept as an exact ratio `shared / total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityScore {
    shared: usize,
    total: usize,
}

impl SimilarityScore {
    pub fn shared(&self) -> usize {
        self.shared
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Unrounded ratio; 0 when both sets are empty.
    pub fn value(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.shared as f64 / self.total as f64
        }
    }

    /// Ratio rounded to three decimals, for display only.
    pub fn rounded(&self) -> f64 {
        (self.value() * 1000.0).round() / 1000.0
    }
}

impl std::fmt::Display for SimilarityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.value())
    }
}

impl Serialize for SimilarityScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SimilarityScore", 4)?;
        s.serialize_field("shared", &self.shared)?;
        s.serialize_field("total", &self.total)?;
        s.serialize_field("value", &self.value())?;
        s.serialize_field("display", &self.to_string())?;
        s.end()
    }
}

/// `|a ∩ b| / |a ∪ b|`. Sets are compared exactly; callers get comparable
/// sets by highlighting both texts against the same keyword list.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> SimilarityScore {
    let shared = a.intersection(b).count();
    let total = a.len() + b.len() - shared;
    SimilarityScore { shared, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_sets_score_zero() {
        let score = jaccard(&set(&[]), &set(&[]));
        assert_eq!(score.value(), 0.0);
        assert_eq!(score.to_string(), "0.000");
    }

    #[test]
    fn one_shared_of_three() {
        let score = jaccard(&set(&["a", "b"]), &set(&["b", "c"]));
        assert_eq!((score.shared(), score.total()), (1, 3));
        assert_eq!(score.value(), 1.0 / 3.0);
        assert_eq!(score.rounded(), 0.333);
        assert_eq!(score.to_string(), "0.333");
    }

    #[test]
    fn symmetric_and_bounded() {
        let samples = [
            set(&[]),
            set(&["a"]),
            set(&["a", "b"]),
            set(&["b", "c", "d"]),
            set(&["x"]),
        ];
        for a in &samples {
            for b in &samples {
                let ab = jaccard(a, b);
                assert_eq!(ab, jaccard(b, a));
                assert!((0.0..=1.0).contains(&ab.value()));
            }
        }
    }

    #[test]
    fn identical_sets_score_one() {
        let score = jaccard(&set(&["cats", "pets"]), &set(&["cats", "pets"]));
        assert_eq!(score.to_string(), "1.000");
    }

    #[test]
    fn one_sided_set_scores_zero() {
        let score = jaccard(&set(&["a"]), &set(&[]));
        assert_eq!(score.value(), 0.0);
    }

    #[test]
    fn serializes_exact_and_display_forms() {
        let score = jaccard(&set(&["a", "b"]), &set(&["b", "c"]));
        let json = serde_json::to_value(score).unwrap();
        assert_eq!(json["shared"], 1);
        assert_eq!(json["total"], 3);
        assert_eq!(json["display"], "0.333");
    }
}
