use crate::catalog::{Catalog, Item};
use crate::recent::RecencyCache;

/// Full-width punctuation found in catalog names and typed input, with the
/// ASCII form matching is done on.
const NORMALIZATION_TABLE: &[(char, char)] = &[
    ('　', ' '),
    ('（', '('),
    ('）', ')'),
    ('＜', '<'),
    ('＞', '>'),
    ('［', '['),
    ('］', ']'),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub keywords: Vec<String>,
}

impl SearchQuery {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        let haystack = normalize(name);
        self.keywords
            .iter()
            .all(|keyword| haystack.contains(keyword.as_str()))
    }
}

pub fn parse_query(input: &str) -> SearchQuery {
    let keywords = normalize(input)
        .split_whitespace()
        .map(str::to_string)
        .collect();
    SearchQuery { keywords }
}

pub fn fold_punctuation(text: &str) -> String {
    text.chars()
        .map(|ch| {
            NORMALIZATION_TABLE
                .iter()
                .find(|(from, _)| *from == ch)
                .map(|(_, to)| *to)
                .unwrap_or(ch)
        })
        .collect()
}

pub fn normalize(text: &str) -> String {
    fold_punctuation(text).to_lowercase()
}

pub fn suggest<'c>(
    catalog: &'c Catalog,
    recent: &RecencyCache,
    input: &str,
    limit: usize,
) -> Vec<&'c Item> {
    let query = parse_query(input);
    if query.is_empty() {
        return Vec::new();
    }
    let mut ranked: Vec<(f64, &Item)> = catalog
        .items()
        .iter()
        .filter(|item| query.matches(&item.name))
        .map(|item| (recent.priority(&item.code), item))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.into_iter().take(limit).map(|(_, item)| item).collect()
}
