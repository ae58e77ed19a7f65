use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

mod fetch;

pub use fetch::{spawn_fetch, CancelToken, PendingCatalog};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub code: String,
    pub name: String,
    #[serde(rename = "carbs", alias = "carbsPercent")]
    pub carbs_percent: f64,
    /// Row reference used by legacy fragment links. Defaults to the list position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

impl Item {
    pub fn carbs_for(&self, grams: f64) -> f64 {
        grams * self.carbs_percent / 100.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    by_code: HashMap<String, usize>,
    by_index: HashMap<u32, usize>,
}

impl Catalog {
    pub fn new(mut items: Vec<Item>) -> Self {
        let mut by_code = HashMap::with_capacity(items.len());
        let mut by_index = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter_mut().enumerate() {
            let index = *item.index.get_or_insert(pos as u32);
            by_code.entry(item.code.clone()).or_insert(pos);
            by_index.entry(index).or_insert(pos);
        }
        Self {
            items,
            by_code,
            by_index,
        }
    }

    pub fn from_document(doc: CatalogDocument) -> Self {
        Self::new(doc.items)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&Item> {
        self.by_code.get(code).map(|&pos| &self.items[pos])
    }

    pub fn by_legacy_index(&self, index: u32) -> Option<&Item> {
        self.by_index.get(&index).map(|&pos| &self.items[pos])
    }
}

/// Where the catalog comes from. Implementations should poll `cancel` between
/// expensive steps and bail out with [`CatalogError::Cancelled`].
pub trait CatalogSource: Send + Sync {
    fn fetch(&self, cancel: &CancelToken) -> Result<CatalogDocument, CatalogError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for JsonFileSource {
    fn fetch(&self, cancel: &CancelToken) -> Result<CatalogDocument, CatalogError> {
        let raw = fs::read(&self.path).map_err(|source| CatalogError::Read {
            path: self.path.clone(),
            source,
        })?;
        if cancel.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }
        Ok(serde_json::from_slice(&raw)?)
    }
}

pub fn load(source: &dyn CatalogSource) -> Catalog {
    match source.fetch(&CancelToken::default()) {
        Ok(doc) => Catalog::from_document(doc),
        Err(err) => {
            tracing::warn!(?err, "catalog unavailable, continuing without items");
            Catalog::default()
        }
    }
}

#[cfg(test)]
pub(crate) fn item(code: &str, name: &str, carbs_percent: f64) -> Item {
    Item {
        code: code.into(),
        name: name.into(),
        carbs_percent,
        index: None,
    }
}
