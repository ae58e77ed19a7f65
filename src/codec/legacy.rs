//! Read-only support for the old fragment links.
//!
//! The fragment holds a bincode envelope encoded as URL-safe base64. Items
//! point at catalog rows by index, so links resolve against whatever row
//! currently carries that index.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurposeConfig;
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::selection::{SelectedItem, Selection};

pub const LEGACY_VERSION: u32 = 1;

const FRAGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LegacyEnvelope {
    pub v: u32,
    pub carb_ratio: f64,
    pub items: Vec<(u32, f64)>,
}

pub fn decode(fragment: &str, catalog: &Catalog) -> Option<Selection> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    if fragment.is_empty() {
        return None;
    }
    let bytes = match FRAGMENT_ENGINE.decode(fragment) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(?err, "fragment is not legacy base64");
            return None;
        }
    };

    let version: u32 = bincode::deserialize(&bytes).ok()?;
    if version != LEGACY_VERSION {
        tracing::debug!(version, "unsupported legacy fragment version");
        return None;
    }
    let envelope: LegacyEnvelope = match bincode::deserialize(&bytes) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::debug!(?err, "corrupt legacy fragment");
            return None;
        }
    };

    let items = envelope
        .items
        .iter()
        .filter_map(|&(index, amount)| {
            if !amount.is_finite() || amount < 0.0 {
                return None;
            }
            let Some(item) = catalog.by_legacy_index(index) else {
                tracing::debug!(index, "legacy index not in catalog");
                return None;
            };
            Some(SelectedItem::new(item.clone(), Some(amount)))
        })
        .collect();

    Some(Selection {
        items,
        carb_ratio: Some(envelope.carb_ratio).filter(|ratio| ratio.is_finite() && *ratio > 0.0),
        note: String::new(),
    })
}

#[cfg(test)]
pub(crate) fn encode_envelope(envelope: &LegacyEnvelope) -> String {
    let bytes = bincode::serialize(envelope).expect("envelope serializes");
    format!("#{}", FRAGMENT_ENGINE.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::item;

    fn catalog() -> Catalog {
        Catalog::new(vec![item("R01", "Rice", 77.0), item("B01", "Bread", 46.4)])
    }

    #[test]
    fn decodes_supported_version() {
        let fragment = encode_envelope(&LegacyEnvelope {
            v: LEGACY_VERSION,
            carb_ratio: 10.0,
            items: vec![(1, 60.0), (0, 150.0)],
        });
        let selection = decode(&fragment, &catalog()).expect("legacy data");
        let codes: Vec<_> = selection.items.iter().map(|s| s.item.code.as_str()).collect();
        assert_eq!(codes, vec!["B01", "R01"]);
        assert_eq!(selection.items[1].amount, Some(150.0));
        assert_eq!(selection.carb_ratio, Some(10.0));
        assert!(selection.note.is_empty());
    }

    #[test]
    fn other_versions_yield_no_data() {
        let fragment = encode_envelope(&LegacyEnvelope {
            v: LEGACY_VERSION + 1,
            carb_ratio: 10.0,
            items: vec![(0, 150.0)],
        });
        assert_eq!(decode(&fragment, &catalog()), None);
    }

    #[test]
    fn out_of_range_index_skips_only_that_entry() {
        let fragment = encode_envelope(&LegacyEnvelope {
            v: LEGACY_VERSION,
            carb_ratio: 0.0,
            items: vec![(0, 100.0), (42, 5.0), (1, 30.0)],
        });
        let selection = decode(&fragment, &catalog()).expect("legacy data");
        assert_eq!(selection.items.len(), 2);
        assert_eq!(selection.carb_ratio, None);
    }

    #[test]
    fn garbage_yields_no_data() {
        let catalog = catalog();
        assert_eq!(decode("#!!not base64!!", &catalog), None);
        assert_eq!(decode("#AQ", &catalog), None);
        assert_eq!(decode("", &catalog), None);
        assert_eq!(decode("#", &catalog), None);
    }

    #[test]
    fn truncated_envelope_yields_no_data() {
        let fragment = encode_envelope(&LegacyEnvelope {
            v: LEGACY_VERSION,
            carb_ratio: 10.0,
            items: vec![(0, 150.0), (1, 20.0)],
        });
        let truncated = &fragment[..fragment.len() - 8];
        assert_eq!(decode(truncated, &catalog()), None);
    }

    #[test]
    fn negative_zero_amount_upgrades_to_plain_zero() {
        let fragment = encode_envelope(&LegacyEnvelope {
            v: LEGACY_VERSION,
            carb_ratio: 10.0,
            items: vec![(0, -0.0), (1, 20.0)],
        });
        let selection = decode(&fragment, &catalog()).expect("legacy data");
        let amount = selection.items[0].amount.expect("zero amount");
        assert!(amount.is_sign_positive());

        let query = crate::codec::query::encode(&selection);
        assert_eq!(query, "?is=R01*0-B01*20&icr=10");
        assert_eq!(crate::codec::query::decode(&query, &catalog()), selection);
    }

    #[test]
    fn padded_fragments_are_accepted() {
        let bytes = bincode::serialize(&LegacyEnvelope {
            v: LEGACY_VERSION,
            carb_ratio: 5.0,
            items: vec![(0, 10.0)],
        })
        .expect("envelope serializes");
        let padded = base64::engine::general_purpose::URL_SAFE.encode(bytes);
        assert!(decode(&padded, &catalog()).is_some());
    }
}
