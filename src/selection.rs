use std::fmt::Write as _;

use crate::catalog::Item;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedItem {
    pub item: Item,
    pub amount: Option<f64>,
}

impl SelectedItem {
    pub fn new(item: Item, amount: Option<f64>) -> Self {
        Self {
            item,
            amount: amount.map(unsigned_zero),
        }
    }

    pub fn carbs(&self) -> f64 {
        self.item.carbs_for(self.amount.unwrap_or(0.0))
    }
}

/// `-0.0` becomes `0.0`; every other value passes through.
pub(crate) fn unsigned_zero(grams: f64) -> f64 {
    if grams == 0.0 {
        0.0
    } else {
        grams
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub items: Vec<SelectedItem>,
    /// Grams of carbohydrate covered by one unit of insulin.
    pub carb_ratio: Option<f64>,
    pub note: String,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.active_ratio().is_none() && self.note.is_empty()
    }

    pub fn active_ratio(&self) -> Option<f64> {
        self.carb_ratio.filter(|ratio| ratio.is_finite() && *ratio > 0.0)
    }

    pub fn totals(&self) -> Totals {
        let carbs = self.items.iter().map(SelectedItem::carbs).sum();
        Totals {
            carbs,
            insulin: self.active_ratio().map(|ratio| carbs / ratio),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub carbs: f64,
    pub insulin: Option<f64>,
}

impl Totals {
    pub fn describe(&self) -> String {
        let mut out = format!("Carbohydrate: {:.1}g", self.carbs);
        if let Some(units) = self.insulin {
            let _ = write!(&mut out, "\nInsulin: {units:.1}U");
        }
        out
    }
}
