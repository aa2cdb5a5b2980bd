//! Keyword extraction from a finalized summary.
//!
//! The model is asked to answer as:
//!
//! ```text
//! Summary: ...
//!
//! Keywords: keyword1, keyword2, keyword3
//! ```
//!
//! Extraction takes the last blank-line separated section, drops trailing
//! whitespace and one trailing period, splits on the first ':' and then on
//! commas. Terms keep their order; duplicates are kept.

use serde::Serialize;

use crate::error::ExtractError;

const SECTION_DELIMITER: &str = "\n\n";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeywordList(Vec<String>);

impl KeywordList {
    pub fn new(terms: Vec<String>) -> Self {
        Self(terms)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<'a> IntoIterator for &'a KeywordList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<String>> for KeywordList {
    fn from(terms: Vec<String>) -> Self {
        Self(terms)
    }
}

/// Extract the keyword list from a finalized text.
///
/// An empty payload (`"Keywords:"` with nothing after it) yields an empty
/// list; deciding whether that is acceptable is left to the caller.
pub fn extract_keywords(text: &str) -> Result<KeywordList, ExtractError> {
    let section = keyword_section(text)?;
    let section = section.trim_end();
    let section = section.strip_suffix('.').unwrap_or(section);

    let (_label, payload) = section
        .split_once(':')
        .ok_or(ExtractError::MissingColon)?;

    let terms = payload
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect();

    Ok(KeywordList(terms))
}

/// The text before the keyword section, i.e. the summary proper.
pub fn summary_body(text: &str) -> Result<&str, ExtractError> {
    let idx = last_delimiter(text)?;
    Ok(&text[..idx])
}

fn keyword_section(text: &str) -> Result<&str, ExtractError> {
    let idx = last_delimiter(text)?;
    Ok(&text[idx + SECTION_DELIMITER.len()..])
}

// Scans left to right so runs of newlines split the same way `str::split` does.
fn last_delimiter(text: &str) -> Result<usize, ExtractError> {
    text.match_indices(SECTION_DELIMITER)
        .last()
        .map(|(idx, _)| idx)
        .ok_or(ExtractError::NoKeywordSection)
}
