//! Read-only live telemetry carried on application frame ids `0x20`,
//! `0x21`, and `0x22`.
//!
//! Unlike the status-buffer command records (C3), these frames are not
//! part of the diagnostic transport: the CP Plus broadcasts them
//! unconditionally and this core only ever listens. Each frame carries
//! several nibble/byte-packed values; only the three named display-only
//! enumerations (`vent_mode`, `display_status`, `heating_status`) are
//! surfaced, matching the distilled spec's scope. The rest of each
//! frame's bytes are unidentified and kept as raw hex so they are at
//! least visible in a snapshot, per the "pass unknown fields through
//! unchanged" scope.

use std::collections::BTreeMap;

use crate::conversions;

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
}

/// Parses one `0x20`/`0x21`/`0x22` application frame's 8 data bytes into
/// named telemetry fields.
///
/// `0x20` carries `vent_mode` in the high nibble of byte 5; `0x22`
/// carries `display_status` in byte 1 and `heating_status` in byte 2.
/// `0x21` (current room/water temperatures) has no counterpart in the
/// three named maps and is passed through entirely as raw hex.
pub fn parse(id: u8, data: &[u8; 8]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    match id {
        0x20 => {
            out.insert("vent_mode".to_string(), conversions::vent_mode_decode((data[5] >> 4) as u32));
            out.insert("display_20_raw".to_string(), hex(data));
        }
        0x21 => {
            out.insert("display_21_raw".to_string(), hex(data));
        }
        0x22 => {
            out.insert(
                "display_status".to_string(),
                conversions::display_status_decode(data[1] as u32),
            );
            out.insert("heating_status".to_string(), conversions::heating_status_decode(data[2] as u32));
            out.insert("display_22_raw".to_string(), hex(data));
        }
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_0x20_vent_mode_from_high_nibble_of_byte_5() {
        let mut data = [0u8; 8];
        data[5] = 0xD0; // high nibble 0xD -> "high"
        let out = parse(0x20, &data);
        assert_eq!(out["vent_mode"], "high");
    }

    #[test]
    fn parses_0x22_display_and_heating_status() {
        let mut data = [0u8; 8];
        data[1] = 0xF0; // "heating on"
        data[2] = 0x11; // "boiler eco heating"
        let out = parse(0x22, &data);
        assert_eq!(out["display_status"], "heating on");
        assert_eq!(out["heating_status"], "boiler eco heating");
    }

    #[test]
    fn parses_0x21_as_raw_passthrough_only() {
        let data = [0xAAu8; 8];
        let out = parse(0x21, &data);
        assert!(!out.contains_key("vent_mode"));
        assert!(!out.contains_key("display_status"));
        assert_eq!(out["display_21_raw"], "aa aa aa aa aa aa aa aa");
    }

    #[test]
    fn unknown_id_returns_empty_map() {
        assert!(parse(0x2F, &[0; 8]).is_empty());
    }
}
