use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use crate::search::{fold_punctuation, SearchQuery};

/// Regex over the query keywords, longest first so overlapping keywords mark
/// the widest match.
pub fn build_highlight_regex(query: &SearchQuery) -> Option<Regex> {
    let mut unique = Vec::new();
    let mut seen = HashSet::new();
    for keyword in &query.keywords {
        if keyword.is_empty() {
            continue;
        }
        if seen.insert(keyword.clone()) {
            unique.push(keyword.clone());
        }
    }
    if unique.is_empty() {
        return None;
    }
    unique.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    let pattern = unique
        .into_iter()
        .map(|keyword| regex::escape(&keyword))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

pub fn mark_matches(name: &str, regex: &Regex) -> String {
    regex
        .replace_all(&fold_punctuation(name), "*$0*")
        .into_owned()
}
