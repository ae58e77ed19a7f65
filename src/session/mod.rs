use std::sync::Arc;

use strum::IntoStaticStr;

use crate::catalog::{Catalog, Item};
use crate::codec::{self, PageLocation};
use crate::config::SearchOptions;
use crate::error::SessionError;
use crate::recent::RecencyHandle;
use crate::search;
use crate::selection::{unsigned_zero, SelectedItem, Selection, Totals};

pub mod history;

pub use history::{HistoryMode, MemoryHistory, NavigationHistory};

#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Edit {
    AddItem(String),
    RemoveItem(usize),
    Reset,
    SetAmount(usize, Option<f64>),
    SetCarbRatio(Option<f64>),
    SetNote(String),
}

impl Edit {
    pub fn history_mode(&self) -> HistoryMode {
        match self {
            Edit::AddItem(_) | Edit::RemoveItem(_) | Edit::Reset => HistoryMode::Push,
            Edit::SetAmount(..) | Edit::SetCarbRatio(_) | Edit::SetNote(_) => HistoryMode::Replace,
        }
    }
}

pub struct CalculatorSession<H: NavigationHistory> {
    catalog: Arc<Catalog>,
    recent: RecencyHandle,
    history: H,
    selection: Selection,
    search_limit: usize,
}

impl<H: NavigationHistory> CalculatorSession<H> {
    /// Restores the selection from the current URL. Legacy fragment links are
    /// rewritten in the current scheme by replacing the history entry.
    pub fn open(catalog: Arc<Catalog>, recent: RecencyHandle, mut history: H) -> Self {
        let location = PageLocation::parse(&history.current());
        let restored = codec::restore(&location, &catalog);
        if let Some(upgraded) = restored.upgraded {
            history.replace(&upgraded.to_string());
        }
        Self {
            catalog,
            recent,
            history,
            selection: restored.selection,
            search_limit: SearchOptions::default().max_results,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn totals(&self) -> Totals {
        self.selection.totals()
    }

    pub fn suggest(&self, input: &str) -> Vec<&Item> {
        search::suggest(&self.catalog, &self.recent, input, self.search_limit)
    }

    pub fn navigated(&mut self) {
        let location = PageLocation::parse(&self.history.current());
        self.selection = codec::query::decode(&location.query, &self.catalog);
    }

    pub fn apply(&mut self, edit: Edit) -> Result<(), SessionError> {
        let mode = edit.history_mode();
        let kind: &'static str = (&edit).into();
        match edit {
            Edit::AddItem(code) => {
                let item = self
                    .catalog
                    .get(&code)
                    .ok_or_else(|| SessionError::UnknownItem(code.clone()))?;
                self.selection.items.push(SelectedItem::new(item.clone(), None));
                self.recent.record_use(&code);
            }
            Edit::RemoveItem(pos) => {
                if pos >= self.selection.items.len() {
                    return Err(SessionError::NoSuchPosition(pos));
                }
                self.selection.items.remove(pos);
            }
            Edit::Reset => {
                self.selection = Selection::default();
            }
            Edit::SetAmount(pos, amount) => {
                if let Some(grams) = amount {
                    if !grams.is_finite() || grams < 0.0 {
                        return Err(SessionError::InvalidAmount(grams));
                    }
                }
                let selected = self
                    .selection
                    .items
                    .get_mut(pos)
                    .ok_or(SessionError::NoSuchPosition(pos))?;
                selected.amount = amount.map(unsigned_zero);
            }
            Edit::SetCarbRatio(ratio) => {
                self.selection.carb_ratio = ratio;
            }
            Edit::SetNote(note) => {
                self.selection.note = note;
            }
        }

        let url = PageLocation::parse(&self.history.current())
            .with_selection(&self.selection)
            .to_string();
        tracing::debug!(edit = kind, %mode, %url, "selection changed");
        self.history.apply(mode, &url);
        Ok(())
    }
}
