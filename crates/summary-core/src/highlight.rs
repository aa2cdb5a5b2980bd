//! Multi-keyword highlighter.
//!
//! Keywords are processed longest first (ties in ascending order, ignoring
//! case). Every occurrence is located in the original text; an occurrence
//! that overlaps one already claimed by an earlier keyword is left to the
//! earlier keyword. Rendering happens once at the end, so inserted markup can
//! never be matched by a later keyword.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use rand::Rng;
use regex::RegexBuilder;
use serde::Serialize;
use tracing::warn;

use crate::keywords::KeywordList;

/// Picks the span color for a keyword. Called at most once per keyword per
/// highlight call.
pub trait ColorStrategy: Send {
    fn color_for(&mut self, keyword: &str) -> String;
}

impl<S: ColorStrategy + ?Sized> ColorStrategy for &mut S {
    fn color_for(&mut self, keyword: &str) -> String {
        (**self).color_for(keyword)
    }
}

/// Random light hue, readable behind dark text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PastelColors;

impl ColorStrategy for PastelColors {
    fn color_for(&mut self, _keyword: &str) -> String {
        let hue: u16 = rand::rng().random_range(0..360);
        format!("hsl({hue}deg, 100%, 90%)")
    }
}

/// Hands out colors from a fixed list in order, wrapping around.
#[derive(Debug, Clone)]
pub struct FixedPalette {
    colors: Vec<String>,
    next: usize,
}

impl FixedPalette {
    pub fn new<I, S>(colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut colors: Vec<String> = colors.into_iter().map(Into::into).collect();
        if colors.is_empty() {
            colors.push("hsl(60deg, 100%, 90%)".to_string());
        }
        Self { colors, next: 0 }
    }
}

impl ColorStrategy for FixedPalette {
    fn color_for(&mut self, _keyword: &str) -> String {
        let color = self.colors[self.next % self.colors.len()].clone();
        self.next += 1;
        color
    }
}

/// Remembers the color given to each keyword (case-insensitively) so several
/// highlight passes over one submission agree on colors.
#[derive(Debug, Clone)]
pub struct StableColors<S> {
    inner: S,
    assigned: HashMap<String, String>,
}

impl<S: ColorStrategy> StableColors<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            assigned: HashMap::new(),
        }
    }
}

impl<S: ColorStrategy> ColorStrategy for StableColors<S> {
    fn color_for(&mut self, keyword: &str) -> String {
        let key = keyword.to_lowercase();
        if let Some(color) = self.assigned.get(&key) {
            return color.clone();
        }
        let color = self.inner.color_for(keyword);
        self.assigned.insert(key, color.clone());
        color
    }
}

/// How text outside the inserted markup is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEscape {
    /// Copy the source text verbatim.
    #[default]
    None,
    /// Escape `& < > " '` so the output can be embedded in HTML.
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    /// Source text with every claimed occurrence wrapped in a `<mark>` span.
    pub rendered: String,
    /// Keywords with at least one whole-word occurrence in the source text,
    /// spelled as in the keyword list.
    pub matched: BTreeSet<String>,
}

struct Span {
    range: Range<usize>,
    color: String,
}

pub fn highlight(
    keywords: &KeywordList,
    text: &str,
    colors: &mut dyn ColorStrategy,
) -> MatchResult {
    highlight_with(keywords, text, colors, TextEscape::None)
}

pub fn highlight_with(
    keywords: &KeywordList,
    text: &str,
    colors: &mut dyn ColorStrategy,
    escape: TextEscape,
) -> MatchResult {
    let mut matched = BTreeSet::new();
    // Disjoint and sorted by start, so ends are sorted too.
    let mut spans: Vec<Span> = Vec::new();

    for keyword in priority_order(keywords) {
        let occurrences = whole_word_occurrences(text, keyword);
        if occurrences.is_empty() {
            continue;
        }
        matched.insert(keyword.to_string());

        let unclaimed: Vec<Range<usize>> = occurrences
            .into_iter()
            .filter(|r| !is_claimed(&spans, r))
            .collect();
        if unclaimed.is_empty() {
            continue;
        }

        let color = colors.color_for(keyword);
        spans.extend(unclaimed.into_iter().map(|range| Span {
            range,
            color: color.clone(),
        }));
        spans.sort_by_key(|s| s.range.start);
    }

    MatchResult {
        rendered: render(text, &spans, escape),
        matched,
    }
}

/// Longest first, then ascending ignoring case, with case-only variants in
/// code point order. Empty terms are skipped; duplicates are kept.
fn priority_order(keywords: &KeywordList) -> Vec<&str> {
    let mut order: Vec<&str> = keywords
        .iter()
        .map(String::as_str)
        .filter(|k| !k.is_empty())
        .collect();
    order.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
            .then_with(|| a.cmp(b))
    });
    order
}

/// Byte ranges of case-insensitive occurrences of `keyword` whose neighbours
/// on both sides are non-word characters or the ends of the text.
fn whole_word_occurrences(text: &str, keyword: &str) -> Vec<Range<usize>> {
    let re = match RegexBuilder::new(&regex::escape(keyword))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re,
        Err(e) => {
            warn!(error = %e, keyword, "keyword pattern rejected, skipping");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    let mut at = 0;
    while at <= text.len() {
        let Some(m) = re.find_at(text, at) else {
            break;
        };
        if is_bounded(text, m.start(), m.end()) {
            out.push(m.range());
            at = m.end();
        } else {
            // Retry one character later so an overlapping candidate is not skipped.
            at = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
        }
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Only the first span ending after `r.start` can overlap `r`.
fn is_claimed(spans: &[Span], r: &Range<usize>) -> bool {
    let idx = spans.partition_point(|s| s.range.end <= r.start);
    spans.get(idx).is_some_and(|s| overlaps(&s.range, r))
}

fn render(text: &str, spans: &[Span], escape: TextEscape) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * 48);
    let mut cursor = 0;
    for span in spans {
        push_text(&mut out, &text[cursor..span.range.start], escape);
        out.push_str("<mark style='background: ");
        push_text(&mut out, &span.color, TextEscape::Html);
        out.push_str("'>");
        push_text(&mut out, &text[span.range.clone()], escape);
        out.push_str("</mark>");
        cursor = span.range.end;
    }
    push_text(&mut out, &text[cursor..], escape);
    out
}

/// Write `s` the way the highlighter writes text outside its spans.
pub fn escape_text(s: &str, escape: TextEscape) -> String {
    let mut out = String::with_capacity(s.len());
    push_text(&mut out, s, escape);
    out
}

fn push_text(out: &mut String, s: &str, escape: TextEscape) {
    if escape == TextEscape::None {
        out.push_str(s);
        return;
    }
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(terms: &[&str]) -> KeywordList {
        KeywordList::new(terms.iter().map(|t| t.to_string()).collect())
    }

    fn palette() -> FixedPalette {
        FixedPalette::new(["c1", "c2", "c3", "c4"])
    }

    fn mark(color: &str, word: &str) -> String {
        format!("<mark style='background: {color}'>{word}</mark>")
    }

    fn matched(result: &MatchResult) -> Vec<&str> {
        result.matched.iter().map(String::as_str).collect()
    }

    #[test]
    fn empty_keyword_list_leaves_text_unmodified() {
        let result = highlight(&KeywordList::default(), "a <b> & c", &mut palette());
        assert_eq!(result.rendered, "a <b> & c");
        assert!(result.matched.is_empty());
    }

    #[test]
    fn never_matches_partial_words() {
        let result = highlight(&list(&["cat"]), "category", &mut palette());
        assert_eq!(result.rendered, "category");
        assert!(result.matched.is_empty());
    }

    #[test]
    fn longer_keyword_takes_precedence() {
        let result = highlight(&list(&["data", "database"]), "database systems", &mut palette());
        assert_eq!(result.rendered, format!("{} systems", mark("c1", "database")));
        assert_eq!(matched(&result), vec!["database"]);
    }

    #[test]
    fn case_insensitive_and_one_color_per_keyword() {
        let result = highlight(&list(&["cats"]), "Cats like CATS", &mut palette());
        assert_eq!(
            result.rendered,
            format!("{} like {}", mark("c1", "Cats"), mark("c1", "CATS"))
        );
        assert_eq!(matched(&result), vec!["cats"]);
    }

    #[test]
    fn ties_are_ordered_lexicographically() {
        let result = highlight(&list(&["b", "a"]), "b a", &mut palette());
        assert_eq!(result.rendered, format!("{} {}", mark("c2", "b"), mark("c1", "a")));
    }

    #[test]
    fn overlapped_occurrence_still_counts_as_matched() {
        let result = highlight(
            &list(&["learning", "machine learning"]),
            "machine learning",
            &mut palette(),
        );
        assert_eq!(result.rendered, mark("c1", "machine learning"));
        assert_eq!(matched(&result), vec!["learning", "machine learning"]);
    }

    #[test]
    fn shorter_keyword_wraps_its_free_occurrences() {
        let result = highlight(
            &list(&["learning", "machine learning"]),
            "machine learning helps learning",
            &mut palette(),
        );
        assert_eq!(
            result.rendered,
            format!(
                "{} helps {}",
                mark("c1", "machine learning"),
                mark("c2", "learning")
            )
        );
    }

    #[test]
    fn inserted_markup_is_never_matched() {
        let result = highlight(
            &list(&["background", "style", "mark"]),
            "mark my style",
            &mut palette(),
        );
        assert_eq!(
            result.rendered,
            format!("{} my {}", mark("c2", "mark"), mark("c1", "style"))
        );
        assert_eq!(matched(&result), vec!["mark", "style"]);
    }

    #[test]
    fn duplicate_keywords_draw_one_color() {
        let result = highlight(&list(&["cats", "cats"]), "cats and dogs", &mut palette());
        assert_eq!(result.rendered, format!("{} and dogs", mark("c1", "cats")));
        assert_eq!(matched(&result), vec!["cats"]);
    }

    #[test]
    fn ties_ignore_case() {
        let result = highlight(&list(&["b", "A"]), "b A", &mut palette());
        assert_eq!(result.rendered, format!("{} {}", mark("c2", "b"), mark("c1", "A")));

        let keywords = list(&["beta", "Alfa", "alfa", "Beta"]);
        let order = priority_order(&keywords);
        assert_eq!(order, vec!["Alfa", "alfa", "Beta", "beta"]);
    }

    #[test]
    fn many_occurrences_are_claimed_against_sorted_spans() {
        let text = "a ".repeat(20_000);
        let result = highlight(&list(&["a", "a a"]), &text, &mut palette());
        assert_eq!(result.rendered.matches(&mark("c1", "a a")).count(), 10_000);
        assert_eq!(result.rendered.matches(&mark("c2", "a")).count(), 0);
        assert_eq!(matched(&result), vec!["a", "a a"]);

        let spaced = "x a ".repeat(5_000);
        let result = highlight(&list(&["a", "x a", "b"]), &spaced, &mut palette());
        assert_eq!(result.rendered.matches("<mark").count(), 5_000);
    }

    #[test]
    fn later_keyword_fills_gaps_between_claimed_spans() {
        let result = highlight(
            &list(&["red", "big dog", "cat"]),
            "cat big dog red cat dog",
            &mut palette(),
        );
        assert_eq!(
            result.rendered,
            format!(
                "{} {} {} {} dog",
                mark("c2", "cat"),
                mark("c1", "big dog"),
                mark("c3", "red"),
                mark("c2", "cat"),
            )
        );
    }

    #[test]
    fn case_variant_duplicates_both_count() {
        let result = highlight(&list(&["Cats", "cats"]), "cats", &mut palette());
        assert_eq!(matched(&result), vec!["Cats", "cats"]);
        assert_eq!(result.rendered.matches("<mark").count(), 1);
    }

    #[test]
    fn keywords_with_symbols_need_word_boundaries() {
        let result = highlight(&list(&["c++"]), "I like c++ but not c++x", &mut palette());
        assert_eq!(
            result.rendered,
            format!("I like {} but not c++x", mark("c1", "c++"))
        );
    }

    #[test]
    fn overlapping_candidates_are_retried() {
        let result = highlight(&list(&["aa"]), "aaa aa", &mut palette());
        assert_eq!(result.rendered, format!("aaa {}", mark("c1", "aa")));
    }

    #[test]
    fn unicode_words_match_case_insensitively() {
        let result = highlight(&list(&["café"]), "CAFÉ au lait", &mut palette());
        assert_eq!(result.rendered, format!("{} au lait", mark("c1", "CAFÉ")));
    }

    #[test]
    fn html_escape_covers_text_and_matches() {
        let result = highlight_with(
            &list(&["tom"]),
            "Tom & <Jerry>",
            &mut palette(),
            TextEscape::Html,
        );
        assert_eq!(
            result.rendered,
            format!("{} &amp; &lt;Jerry&gt;", mark("c1", "Tom"))
        );
    }

    #[test]
    fn stable_colors_reuse_assignment() {
        let mut colors = StableColors::new(palette());
        assert_eq!(colors.color_for("Cats"), "c1");
        assert_eq!(colors.color_for("pets"), "c2");
        assert_eq!(colors.color_for("cats"), "c1");
    }

    #[test]
    fn pastel_colors_are_light_hsl() {
        let color = PastelColors.color_for("x");
        assert!(color.starts_with("hsl("));
        assert!(color.ends_with("deg, 100%, 90%)"));
    }

    #[test]
    fn matched_set_is_subset_of_keywords() {
        let keywords = list(&["alpha", "beta", "gamma"]);
        let result = highlight(&keywords, "beta then alpha, no third", &mut PastelColors);
        for term in &result.matched {
            assert!(keywords.iter().any(|k| k == term));
        }
        assert_eq!(matched(&result), vec!["alpha", "beta"]);
    }
}
