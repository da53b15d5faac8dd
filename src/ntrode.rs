//! Ntrode channel maps from the `SpikeConfiguration` section of a header.

use serde_json::Value;
use tracing::warn;

use crate::types::*;
use crate::xml;

/// Path from the `Configuration` node to the ntrode records.
pub const NTRODE_PATH: [&str; 2] = ["SpikeConfiguration", "SpikeNTrode"];

/// Ntrodes read from a header, plus the ones that had no usable channels.
#[derive(Debug, Clone, Default)]
pub struct NtrodeExtraction {
    pub ntrodes: Vec<Ntrode>,
    pub diagnostics: Vec<Diagnostic>,
}

fn parse_int(record: &Value, field: &str) -> Option<i64> {
    match record.get(field)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Hardware channels of one ntrode record in document order, or `None` when
/// the record has no channels or any channel lacks an integer `hwChan`.
fn hw_channels(record: &Value) -> Option<Vec<u32>> {
    let channels = xml::as_records(record.get("SpikeChannel")?);
    if channels.is_empty() {
        return None;
    }
    channels
        .into_iter()
        .map(|ch| parse_int(ch, "hwChan").and_then(|n| u32::try_from(n).ok()))
        .collect()
}

/// Reads every ntrode of a decoded `Configuration` node.
///
/// Incomplete ntrodes are kept, without a channel map, and reported.
pub fn extract_ntrodes(config: &Value) -> Result<NtrodeExtraction> {
    let node = xml::lookup(config, &NTRODE_PATH).ok_or_else(|| MetadataError::MissingConfig {
        path: format!("Configuration.{}", NTRODE_PATH.join(".")),
    })?;

    let mut extraction = NtrodeExtraction::default();
    for record in xml::as_records(node) {
        let ntrode_id = parse_int(record, "id").ok_or_else(|| MetadataError::InvalidConfigValue {
            field: "SpikeNTrode.id".to_string(),
            value: record.get("id").map(|v| v.to_string()).unwrap_or_default(),
        })?;

        match hw_channels(record) {
            Some(channels) => extraction
                .ntrodes
                .push(Ntrode::with_hw_channels(ntrode_id, &channels)),
            None => {
                warn!("incomplete ntrode id {}", ntrode_id);
                extraction.ntrodes.push(Ntrode::new(ntrode_id));
                extraction
                    .diagnostics
                    .push(Diagnostic::IncompleteNtrode { ntrode_id });
            }
        }
    }
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn maps_follow_document_order() {
        let config = json!({
            "SpikeConfiguration": {
                "SpikeNTrode": [
                    {"id": "1", "SpikeChannel": [{"hwChan": "12"}, {"hwChan": "3"}, {"hwChan": "40"}]},
                    {"id": "2", "SpikeChannel": {"hwChan": "7"}}
                ]
            }
        });
        let extraction = extract_ntrodes(&config).unwrap();
        assert!(extraction.diagnostics.is_empty());
        let first = &extraction.ntrodes[0];
        assert_eq!(first.ntrode_id, 1);
        assert_eq!(first.electrode_group, GroupRef::Unknown);
        assert_eq!(first.bad_channels, UNKNOWN);
        let expected: BTreeMap<usize, u32> = [(0, 12), (1, 3), (2, 40)].into_iter().collect();
        assert_eq!(first.map.as_ref(), Some(&expected));
        assert_eq!(extraction.ntrodes[1].num_channels(), Some(1));
    }

    #[test]
    fn incomplete_ntrodes_are_kept_and_reported() {
        let config = json!({
            "SpikeConfiguration": {
                "SpikeNTrode": [
                    {"id": "1"},
                    {"id": "2", "SpikeChannel": [{"hwChan": "x"}]},
                    {"id": "3", "SpikeChannel": [{"hwChan": "0"}]}
                ]
            }
        });
        let extraction = extract_ntrodes(&config).unwrap();
        assert_eq!(extraction.ntrodes.len(), 3);
        assert!(extraction.ntrodes[0].map.is_none());
        assert!(extraction.ntrodes[1].map.is_none());
        assert!(extraction.ntrodes[2].map.is_some());
        assert_eq!(
            extraction.diagnostics,
            [
                Diagnostic::IncompleteNtrode { ntrode_id: 1 },
                Diagnostic::IncompleteNtrode { ntrode_id: 2 },
            ]
        );
    }

    #[test]
    fn single_ntrode_is_one_record() {
        let config = json!({
            "SpikeConfiguration": {"SpikeNTrode": {"id": "9", "SpikeChannel": [{"hwChan": "1"}]}}
        });
        let extraction = extract_ntrodes(&config).unwrap();
        assert_eq!(extraction.ntrodes.len(), 1);
        assert_eq!(extraction.ntrodes[0].ntrode_id, 9);
    }

    #[test]
    fn missing_section_is_fatal() {
        let err = extract_ntrodes(&json!({"GlobalConfiguration": null})).unwrap_err();
        assert!(matches!(err, MetadataError::MissingConfig { .. }));
    }

    #[test]
    fn unparsable_id_is_fatal() {
        let config = json!({"SpikeConfiguration": {"SpikeNTrode": [{"id": "abc"}]}});
        assert!(matches!(
            extract_ntrodes(&config),
            Err(MetadataError::InvalidConfigValue { .. })
        ));
    }
}
