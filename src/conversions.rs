//! Field value conversions (C4): the human-facing encode/decode layer on
//! top of the raw record fields in [`crate::record`].
//!
//! Locale/translation tables are out of scope here; every string this
//! module produces is a fixed-point number or an English enum label.

/// Sentinel raw values meaning "no sensor reading / not applicable".
/// All three render as the string `"0"`, matching the original
/// firmware's debug output rather than an empty/absent value.
pub const TEMP_SENTINELS: [u32; 3] = [0x0000, 0x0AAA, 0xAAAA];

/// Decodes a raw temperature code into a Celsius string.
///
/// The wire field is degrees Celsius plus a 273 offset (so `293`
/// decodes to `"20"`); any of [`TEMP_SENTINELS`] decodes to `"0"`.
pub fn temp_decode(raw: u32) -> String {
    if TEMP_SENTINELS.contains(&raw) {
        return "0".to_string();
    }
    (raw as i64 - 273).to_string()
}

/// Encodes a Celsius value back into a raw temperature code.
///
/// Values below 5 (or text that fails to parse as a number) encode as
/// `0x0000`, matching the "no value" sentinel.
pub fn temp_encode(text: &str) -> Option<u32> {
    let value: f64 = text.parse().ok()?;
    if value < 5.0 {
        return Some(0x0000);
    }
    Some((value.round() as i64 + 273) as u32)
}

fn unknown(raw: u32) -> String {
    format!("unknown(0x{raw:02X})")
}

fn unknown_value(raw: u32) -> String {
    format!("unknown value 0x{raw:02x}")
}

/// Decodes the `heating_mode` field.
pub fn heating_mode_decode(raw: u32) -> String {
    match raw {
        0 => "off".into(),
        1 => "eco".into(),
        10 => "high".into(),
        other => unknown(other),
    }
}

/// Encodes the `heating_mode` field from its label.
pub fn heating_mode_encode(label: &str) -> Option<u32> {
    match label {
        "off" => Some(0),
        "eco" => Some(1),
        "high" => Some(10),
        _ => None,
    }
}

/// Decodes the `energy_mix` field. Only the two low bits carry meaning.
pub fn energy_mix_decode(raw: u32) -> String {
    match raw & 0x03 {
        0 => "none".into(),
        1 => "gas".into(),
        2 => "electricity".into(),
        3 => "mix".into(),
        _ => unreachable!(),
    }
}

/// Encodes the `energy_mix` field from its label.
pub fn energy_mix_encode(label: &str) -> Option<u32> {
    match label {
        "none" => Some(0),
        "gas" => Some(1),
        "electricity" => Some(2),
        "mix" => Some(3),
        _ => None,
    }
}

/// Decodes the `el_power_level` field (a wattage value, not an index).
pub fn el_power_level_decode(raw: u32) -> String {
    match raw {
        0 => "0".into(),
        900 => "900".into(),
        1800 => "1800".into(),
        other => unknown(other),
    }
}

/// Encodes the `el_power_level` field from its decimal string.
pub fn el_power_level_encode(text: &str) -> Option<u32> {
    match text {
        "0" => Some(0),
        "900" => Some(900),
        "1800" => Some(1800),
        _ => None,
    }
}

/// Decodes the read-only `operating_status` field.
///
/// Unlike every other enum here, unrecognized values render as
/// `UNKNOWN(n)` (decimal, uppercase), matching the original vendor
/// firmware's debug string for this one field.
pub fn operating_status_decode(raw: u32) -> String {
    match raw {
        0 => "Off".into(),
        1 => "WARNING".into(),
        4 => "On (starting)".into(),
        5 => "On".into(),
        other => format!("UNKNOWN({other})"),
    }
}

/// Decodes the `clock_mode` field.
pub fn clock_mode_decode(raw: u32) -> String {
    match raw {
        0 => "24h".into(),
        1 => "12h".into(),
        other => unknown(other),
    }
}

/// Encodes the `clock_mode` field from its label.
pub fn clock_mode_encode(label: &str) -> Option<u32> {
    match label {
        "24h" => Some(0),
        "12h" => Some(1),
        _ => None,
    }
}

/// Decodes the `clock_source` field.
pub fn clock_source_decode(raw: u32) -> String {
    match raw {
        1 => "manual".into(),
        2 => "inetbox".into(),
        other => unknown(other),
    }
}

/// Encodes the `clock_source` field from its label.
pub fn clock_source_encode(label: &str) -> Option<u32> {
    match label {
        "manual" => Some(1),
        "inetbox" => Some(2),
        _ => None,
    }
}

/// Decodes the read-only live-telemetry `vent_mode` field (the high
/// nibble of byte 5 of the `0x20` frame).
pub fn vent_mode_decode(raw: u32) -> String {
    match raw {
        0x0 => "off".into(),
        0xB => "eco".into(),
        0xD => "high".into(),
        1..=0xA => format!("vent {raw}"),
        other => unknown_value(other),
    }
}

/// Decodes the read-only live-telemetry `display_status` field (byte 1
/// of the `0x22` frame: the CP Plus's own display state).
pub fn display_status_decode(raw: u32) -> String {
    match raw {
        0xF0 => "heating on".into(),
        0x20 => "standby ac on".into(),
        0x00 => "standby ac off".into(),
        0xD0 => "error".into(),
        0x70 => "fatal error".into(),
        0x50 => "boiler on".into(),
        0x40 => "boiler off".into(),
        other => unknown_value(other),
    }
}

/// Decodes the read-only live-telemetry `heating_status` field (byte 2
/// of the `0x22` frame: the boiler's own burner state).
pub fn heating_status_decode(raw: u32) -> String {
    match raw {
        0x10 => "boiler eco done".into(),
        0x11 => "boiler eco heating".into(),
        0x30 => "boiler hot done".into(),
        0x31 => "boiler hot heating".into(),
        other => unknown_value(other),
    }
}

/// Decodes the `error_code` field.
///
/// The two bytes come back from [`crate::record`] as a single big-endian
/// `u16`; the original firmware renders them as `hi_byte*100 + lo_byte`.
pub fn error_code_decode(raw: u32) -> String {
    let b0 = (raw >> 8) & 0xFF;
    let b1 = raw & 0xFF;
    (b1 * 100 + b0).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_round_trips_for_whole_degrees() {
        for c in 5..=99i64 {
            let raw = temp_encode(&c.to_string()).unwrap();
            assert_eq!(temp_decode(raw), c.to_string());
        }
    }

    #[test]
    fn temp_sentinels_decode_to_zero_string() {
        for &s in &TEMP_SENTINELS {
            assert_eq!(temp_decode(s), "0");
        }
    }

    #[test]
    fn below_five_encodes_to_sentinel() {
        assert_eq!(temp_encode("4"), Some(0x0000));
        assert_eq!(temp_decode(0x0000), "0");
    }

    #[test]
    fn target_temp_water_plain_decimal() {
        // Scenario: target_temp_water raw 313 renders as "40", same
        // formula as room temperature -- no locale label table.
        assert_eq!(temp_decode(313), "40");
    }

    #[test]
    fn heating_mode_round_trips() {
        for (raw, label) in [(0, "off"), (1, "eco"), (10, "high")] {
            assert_eq!(heating_mode_decode(raw), label);
            assert_eq!(heating_mode_encode(label), Some(raw));
        }
    }

    #[test]
    fn heating_mode_unknown_is_stable() {
        assert_eq!(heating_mode_decode(7), "unknown(0x07)");
    }

    #[test]
    fn energy_mix_masks_low_bits() {
        assert_eq!(energy_mix_decode(0x02), "electricity");
        assert_eq!(energy_mix_decode(0x42), "electricity");
    }

    #[test]
    fn operating_status_unknown_uses_uppercase_form() {
        assert_eq!(operating_status_decode(9), "UNKNOWN(9)");
    }

    #[test]
    fn error_code_zero_is_zero() {
        assert_eq!(error_code_decode(0x0000), "0");
    }

    #[test]
    fn vent_mode_numbered_slots_render_as_vent_n() {
        assert_eq!(vent_mode_decode(9), "vent 9");
    }

    #[test]
    fn display_maps_use_lowercase_unknown_value_form() {
        assert_eq!(heating_status_decode(0x99), "unknown value 0x99");
    }
}
