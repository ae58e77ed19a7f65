use std::fmt;

use crate::catalog::Catalog;
use crate::selection::Selection;

pub mod legacy;
pub mod query;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLocation {
    pub path: String,
    pub query: String,
    pub fragment: String,
}

impl PageLocation {
    pub fn parse(url: &str) -> Self {
        let (rest, fragment) = url.split_once('#').unwrap_or((url, ""));
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        Self {
            path: path.to_string(),
            query: query.to_string(),
            fragment: fragment.to_string(),
        }
    }

    pub fn with_selection(&self, selection: &Selection) -> Self {
        let query = query::encode(selection);
        Self {
            path: self.path.clone(),
            query: query.strip_prefix('?').unwrap_or(&query).to_string(),
            fragment: String::new(),
        }
    }
}

impl fmt::Display for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    pub selection: Selection,
    pub upgraded: Option<PageLocation>,
}

/// Reads the selection out of a page URL. A decodable legacy fragment takes
/// precedence and yields an upgraded location; otherwise the query string is
/// decoded and any fragment is left alone.
pub fn restore(location: &PageLocation, catalog: &Catalog) -> Restored {
    if !location.fragment.is_empty() {
        if let Some(selection) = legacy::decode(&location.fragment, catalog) {
            let upgraded = location.with_selection(&selection);
            tracing::info!(url = %upgraded, "upgraded legacy fragment link");
            return Restored {
                selection,
                upgraded: Some(upgraded),
            };
        }
    }
    Restored {
        selection: query::decode(&location.query, catalog),
        upgraded: None,
    }
}
