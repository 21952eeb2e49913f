//! Report encoder
//!
//! Produces ASCII, control-character-free text suitable for appending to an
//! outbound message. Encoding is deterministic: every map in a report is a
//! `BTreeMap` and every struct serializes its fields in declaration order.

use std::fmt::Write as _;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::report::Report;

/// Text representation used for outbound reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// Compact JSON with non-ASCII escaped
    #[default]
    Json,
    /// MessagePack bytes as lowercase hex
    Packed,
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MessagePack encoding failed: {0}")]
    Packed(#[from] rmp_serde::encode::Error),
}

/// Serialize a report for transport
pub fn encode(report: &Report, format: WireFormat) -> Result<String, EncodeError> {
    match format {
        WireFormat::Json => {
            let json = serde_json::to_string(report)?;
            Ok(escape_non_ascii(&json))
        }
        WireFormat::Packed => {
            let bytes = rmp_serde::to_vec_named(report)?;
            Ok(hex::encode(bytes))
        }
    }
}

/// Replace every non-ASCII character with its `\uXXXX` escape
///
/// serde_json already escapes control characters, and structural JSON is
/// ASCII, so anything non-ASCII sits inside a string literal where the escape
/// is valid.
fn escape_non_ascii(json: &str) -> String {
    if json.is_ascii() {
        return json.to_string();
    }

    let mut out = String::with_capacity(json.len() + 16);
    let mut units = [0u16; 2];
    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{:04x}", unit);
            }
        }
    }
    out
}

/// True when `text` is safe to embed in a line-oriented transport
pub fn is_transport_safe(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii() && !b.is_ascii_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulo::ModuloHistograms;
    use crate::report::{assemble, AssemblyInputs, EntitySlot, Selection};
    use crate::tables::LookupTables;
    use crate::vblank::VblankLedger;

    fn sample_report() -> Report {
        let mut ledger = VblankLedger::new();
        ledger.on_interval_start(10);
        ledger.on_interval_end(30).unwrap();
        let histograms = ModuloHistograms::default();
        let slots = [
            Some(EntitySlot {
                id: 3,
                payload: 0x0102_0304,
                drawn_at: 77,
            }),
            None,
            None,
        ];
        assemble(
            &AssemblyInputs {
                intervals: &[],
                ledger: &ledger,
                histograms: &histograms,
                slots: &slots,
                selection: Some(Selection {
                    identifier: 9,
                    counter: 50,
                }),
                reset_counter: 0,
                win_streak: 14,
                anomalies: 0,
            },
            &LookupTables::default(),
        )
    }

    #[test]
    fn test_json_is_transport_safe() {
        let text = encode(&sample_report(), WireFormat::Json).unwrap();
        assert!(is_transport_safe(&text));
        assert!(text.contains(r#""payload":"01020304""#));
        assert!(text.contains(r#""vblanks":[{"start_cycle":10,"duration":20}]"#));
    }

    #[test]
    fn test_packed_is_hex_and_decodes() {
        let report = sample_report();
        let text = encode(&report, WireFormat::Packed).unwrap();
        assert!(is_transport_safe(&text));
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));

        let bytes = hex::decode(&text).unwrap();
        let back: Report = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let report = sample_report();
        for format in [WireFormat::Json, WireFormat::Packed] {
            assert_eq!(
                encode(&report, format).unwrap(),
                encode(&report.clone(), format).unwrap()
            );
        }
    }

    #[test]
    fn test_escape_non_ascii() {
        assert_eq!(escape_non_ascii(r#"{"a":"b"}"#), r#"{"a":"b"}"#);
        assert_eq!(escape_non_ascii("\"é\""), "\"\\u00e9\"");
        // Astral plane characters become surrogate pairs
        assert_eq!(escape_non_ascii("\"😀\""), "\"\\ud83d\\ude00\"");
    }

    #[test]
    fn test_is_transport_safe_rejects_controls() {
        assert!(is_transport_safe("abc 123"));
        assert!(!is_transport_safe("line\nbreak"));
        assert!(!is_transport_safe("tab\there"));
        assert!(!is_transport_safe("é"));
    }
}
