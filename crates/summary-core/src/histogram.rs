//! Word-length data for the summary histogram.

use serde::Serialize;

pub const DEFAULT_BUCKET_WIDTH: usize = 5;
pub const DEFAULT_DOMAIN_MAX: usize = 30;

/// Character length of every whitespace-delimited token of the lower-cased text.
pub fn word_lengths(text: &str) -> Vec<usize> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| word.chars().count())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LengthBucket {
    /// Inclusive lower bound.
    pub start: usize,
    /// Exclusive upper bound, except for the last bucket which also takes
    /// everything longer.
    pub end: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LengthHistogram(Vec<LengthBucket>);

impl LengthHistogram {
    pub fn from_lengths(lengths: &[usize], bucket_width: usize, domain_max: usize) -> Self {
        let width = bucket_width.max(1);
        let n = domain_max.div_ceil(width).max(1);
        let mut buckets: Vec<LengthBucket> = (0..n)
            .map(|i| LengthBucket {
                start: i * width,
                end: ((i + 1) * width).min(domain_max.max(width)),
                count: 0,
            })
            .collect();
        for &len in lengths {
            let idx = (len / width).min(n - 1);
            buckets[idx].count += 1;
        }
        Self(buckets)
    }

    pub fn buckets(&self) -> &[LengthBucket] {
        &self.0
    }
}

impl Default for LengthHistogram {
    fn default() -> Self {
        Self::from_lengths(&[], DEFAULT_BUCKET_WIDTH, DEFAULT_DOMAIN_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_follow_whitespace_tokens() {
        assert_eq!(word_lengths("Cats  make\tgreat\npets."), vec![4, 4, 5, 5]);
        assert!(word_lengths("   ").is_empty());
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        assert_eq!(word_lengths("Café naïve"), vec![4, 5]);
    }

    #[test]
    fn buckets_span_the_domain() {
        let hist = LengthHistogram::from_lengths(&[1, 4, 5, 12, 29, 30, 44], 5, 30);
        let counts: Vec<usize> = hist.buckets().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 1, 1, 0, 0, 3]);
        assert_eq!(hist.buckets()[0].start, 0);
        assert_eq!(hist.buckets()[5].end, 30);
    }

    #[test]
    fn default_histogram_is_empty() {
        let hist = LengthHistogram::default();
        assert_eq!(hist.buckets().len(), 6);
        assert!(hist.buckets().iter().all(|b| b.count == 0));
    }
}
