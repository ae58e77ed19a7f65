//! Current URL scheme: `?is=<code>*<amount>-...&icr=<ratio>&n=<note>`.
//!
//! Amounts carry three states. An unset amount is written as the bare code,
//! zero as `code*0` and anything else as the shortest decimal that parses
//! back to the same `f64`.

use std::borrow::Cow;
use std::fmt::Write as _;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};

use crate::catalog::Catalog;
use crate::selection::{unsigned_zero, SelectedItem, Selection};

pub const ITEMS_PARAM: &str = "is";
pub const RATIO_PARAM: &str = "icr";
pub const NOTE_PARAM: &str = "n";

const ITEM_SEPARATOR: char = '-';
const AMOUNT_SEPARATOR: char = '*';

const CODE_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'*')
    .add(b'+')
    .add(b'-')
    .add(b'=')
    .add(b'?');

const NOTE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn encode(selection: &Selection) -> String {
    let mut params: Vec<(&str, String)> = Vec::with_capacity(3);

    if !selection.items.is_empty() {
        let mut value = String::new();
        for (i, selected) in selection.items.iter().enumerate() {
            if i > 0 {
                value.push(ITEM_SEPARATOR);
            }
            value.extend(utf8_percent_encode(&selected.item.code, CODE_ENCODE_SET));
            if let Some(amount) = selected.amount {
                let _ = write!(&mut value, "{AMOUNT_SEPARATOR}{}", unsigned_zero(amount));
            }
        }
        params.push((ITEMS_PARAM, value));
    }

    if let Some(ratio) = selection.active_ratio() {
        params.push((RATIO_PARAM, ratio.to_string()));
    }

    if !selection.note.is_empty() {
        params.push((
            NOTE_PARAM,
            utf8_percent_encode(&selection.note, NOTE_ENCODE_SET).to_string(),
        ));
    }

    if params.is_empty() {
        return String::new();
    }

    let mut out = String::from("?");
    for (i, (key, value)) in params.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        let _ = write!(&mut out, "{key}={value}");
    }
    out
}

/// Decodes a query string (with or without the leading `?`). Never fails:
/// entries that do not resolve are dropped and absent parameters fall back
/// to their defaults.
pub fn decode(query: &str, catalog: &Catalog) -> Selection {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut selection = Selection::default();

    if let Some(raw) = raw_param(query, ITEMS_PARAM) {
        selection.items = decode_items(raw, catalog);
    }

    if let Some(raw) = raw_param(query, RATIO_PARAM) {
        let ratio = decode_component(raw)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|ratio| ratio.is_finite())
            .unwrap_or(0.0);
        selection.carb_ratio = Some(ratio);
    }

    if let Some(raw) = raw_param(query, NOTE_PARAM) {
        selection.note = decode_component(raw).into_owned();
    }

    selection
}

fn decode_items(raw: &str, catalog: &Catalog) -> Vec<SelectedItem> {
    let mut items = Vec::new();
    for entry in raw.split(ITEM_SEPARATOR) {
        if entry.is_empty() {
            continue;
        }
        let (code, amount) = match entry.split_once(AMOUNT_SEPARATOR) {
            Some((code, amount)) => match parse_amount(amount) {
                Some(amount) => (code, Some(amount)),
                None => {
                    tracing::debug!(entry, "dropping entry with invalid amount");
                    continue;
                }
            },
            None => (entry, None),
        };
        let code = decode_component(code);
        let Some(item) = catalog.get(&code) else {
            tracing::debug!(code = %code, "dropping entry with unknown item code");
            continue;
        };
        items.push(SelectedItem::new(item.clone(), amount));
    }
    items
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
        .map(unsigned_zero)
}

fn raw_param<'q>(query: &'q str, name: &str) -> Option<&'q str> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| decode_component(key) == name)
        .map(|(_, value)| value)
}

fn decode_component(raw: &str) -> Cow<'_, str> {
    if raw.contains('+') {
        let spaced = raw.replace('+', " ");
        Cow::Owned(percent_decode_str(&spaced).decode_utf8_lossy().into_owned())
    } else {
        percent_decode_str(raw).decode_utf8_lossy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{item, Catalog};

    fn catalog() -> Catalog {
        Catalog::new(vec![
            item("R01", "Rice", 77.0),
            item("B01", "Bread", 46.4),
            item("X-1*", "Odd code", 10.0),
        ])
    }

    fn selected(catalog: &Catalog, code: &str, amount: Option<f64>) -> SelectedItem {
        SelectedItem::new(catalog.get(code).expect("known code").clone(), amount)
    }

    #[test]
    fn scenario_rice_with_ratio() {
        let selection = decode("?is=R01*150&icr=10", &catalog());
        assert_eq!(selection.items.len(), 1);
        assert_eq!(selection.items[0].item.code, "R01");
        assert_eq!(selection.items[0].amount, Some(150.0));
        assert_eq!(selection.carb_ratio, Some(10.0));
        let totals = selection.totals();
        assert!((totals.carbs - 115.5).abs() < 1e-9);
        assert!((totals.insulin.expect("ratio set") - 11.55).abs() < 1e-9);
    }

    #[test]
    fn empty_selection_encodes_to_nothing() {
        assert_eq!(encode(&Selection::default()), "");
        let disabled = Selection {
            carb_ratio: Some(0.0),
            ..Selection::default()
        };
        assert_eq!(encode(&disabled), "");
    }

    #[test]
    fn round_trip_preserves_order_amount_states_and_note() {
        let catalog = catalog();
        let selection = Selection {
            items: vec![
                selected(&catalog, "B01", Some(60.5)),
                selected(&catalog, "R01", None),
                selected(&catalog, "R01", Some(0.0)),
                selected(&catalog, "X-1*", Some(12.0)),
            ],
            carb_ratio: Some(8.5),
            note: "lunch & snack = 100% + more?".into(),
        };
        let encoded = encode(&selection);
        insta::assert_snapshot!(
            encoded,
            @"?is=B01*60.5-R01-R01*0-X%2D1%2A*12&icr=8.5&n=lunch%20%26%20snack%20%3D%20100%25%20%2B%20more%3F"
        );
        assert_eq!(decode(&encoded, &catalog), selection);
    }

    #[test]
    fn note_round_trips_non_ascii() {
        let catalog = catalog();
        let selection = Selection {
            note: "朝ごはん 2杯".into(),
            ..Selection::default()
        };
        assert_eq!(decode(&encode(&selection), &catalog), selection);
    }

    #[test]
    fn unknown_code_drops_only_that_entry() {
        let selection = decode("is=R01*100-ZZZ*50-B01*20", &catalog());
        let codes: Vec<_> = selection.items.iter().map(|s| s.item.code.as_str()).collect();
        assert_eq!(codes, vec!["R01", "B01"]);
    }

    #[test]
    fn invalid_amounts_drop_entry() {
        let selection = decode("is=R01*abc-B01*-5-R01*inf-B01*30", &catalog());
        assert_eq!(selection.items.len(), 1);
        assert_eq!(selection.items[0].item.code, "B01");
        assert_eq!(selection.items[0].amount, Some(30.0));
    }

    #[test]
    fn ratio_absent_is_unset_and_garbage_is_zero() {
        let catalog = catalog();
        assert_eq!(decode("is=R01*1", &catalog).carb_ratio, None);
        let garbage = decode("is=R01*1&icr=lots", &catalog);
        assert_eq!(garbage.carb_ratio, Some(0.0));
        assert_eq!(garbage.totals().insulin, None);
    }

    #[test]
    fn plus_decodes_as_space_in_note() {
        let selection = decode("n=after+run", &catalog());
        assert_eq!(selection.note, "after run");
    }

    #[test]
    fn first_occurrence_wins_and_unknown_params_are_ignored() {
        let selection = decode("utm=x&is=R01*1&is=B01*2&&icr=4&icr=9", &catalog());
        assert_eq!(selection.items.len(), 1);
        assert_eq!(selection.items[0].item.code, "R01");
        assert_eq!(selection.carb_ratio, Some(4.0));
    }

    #[test]
    fn ratio_without_items_still_encodes() {
        let selection = Selection {
            carb_ratio: Some(12.0),
            ..Selection::default()
        };
        assert_eq!(encode(&selection), "?icr=12");
    }

    #[test]
    fn negative_zero_amount_is_written_as_zero() {
        let catalog = catalog();
        let rice = SelectedItem {
            item: catalog.get("R01").expect("known code").clone(),
            amount: Some(-0.0),
        };
        let selection = Selection {
            items: vec![rice, selected(&catalog, "B01", None)],
            ..Selection::default()
        };
        let query = encode(&selection);
        assert_eq!(query, "?is=R01*0-B01");

        let decoded = decode(&query, &catalog);
        assert_eq!(decoded.items.len(), 2);
        let amount = decoded.items[0].amount.expect("zero amount");
        assert_eq!(amount, 0.0);
        assert!(amount.is_sign_positive());
        assert_eq!(decoded.items[1].amount, None);
    }
}
