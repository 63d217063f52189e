//! Vendor status-buffer command records (C3).
//!
//! Each command id has a declarative schema: an ordered list of named,
//! byte-aligned fields. A field name occurring twice in a schema (the
//! STATUS command duplicates `el_power_level` and `energy_mix`) is one
//! logical attribute written into two wire slots; on read, both slots
//! must agree, and on write both slots get the same value.
//!
//! Reserved/unidentified byte ranges are modeled as opaque [`FieldValue::Raw`]
//! blobs rather than numeric fields, and are carried through a
//! read-then-write round trip unchanged.

use std::collections::BTreeMap;

use crate::error::FrameError;

/// Width (and interpretation) of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One unsigned byte.
    U8,
    /// Two bytes, big-endian unsigned.
    U16,
    /// `n` bytes carried opaquely, not interpreted.
    Raw(usize),
}

impl FieldKind {
    fn width(self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16 => 2,
            FieldKind::Raw(n) => n,
        }
    }
}

/// One named field in a command schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Field name. Fields beginning with `_` are reserved/opaque.
    pub name: &'static str,
    /// Field width and interpretation.
    pub kind: FieldKind,
}

const fn f(name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { name, kind }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Numeric value (fits both `U8` and `U16`).
    Int(u32),
    /// Opaque byte blob.
    Raw(Vec<u8>),
}

impl FieldValue {
    /// Returns the numeric value, if this is an `Int`.
    pub fn as_int(&self) -> Option<u32> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Raw(_) => None,
        }
    }
}

/// Declarative schema for one command id.
pub struct CommandSchema {
    /// Command id used when the CP Plus reads this command (status push).
    pub cid_read: u8,
    /// Command id used when this node writes this command.
    pub cid_write: u8,
    /// Fields present in both the write and the full read record, in
    /// wire order.
    pub write_fields: &'static [FieldDef],
    /// Fields present only in the full read record, appended after
    /// `write_fields`.
    pub read_only_fields: &'static [FieldDef],
}

impl CommandSchema {
    /// Byte length of the write-direction record.
    pub fn write_len(&self) -> usize {
        self.write_fields.iter().map(|d| d.kind.width()).sum()
    }

    /// Byte length of the full read-direction record.
    pub fn read_len(&self) -> usize {
        self.write_len() + self.read_only_fields.iter().map(|d| d.kind.width()).sum::<usize>()
    }
}

/// STATUS command (heating mode, temperatures, power level, energy mix).
pub static STATUS: CommandSchema = CommandSchema {
    cid_read: 0x33,
    cid_write: 0x32,
    write_fields: &[
        f("target_temp_room", FieldKind::U16),
        f("heating_mode", FieldKind::U8),
        f("_status_reserved_3", FieldKind::U8),
        f("el_power_level", FieldKind::U16),
        f("target_temp_water", FieldKind::U16),
        f("el_power_level", FieldKind::U16),
        f("energy_mix", FieldKind::U8),
        f("energy_mix", FieldKind::U8),
    ],
    read_only_fields: &[
        f("current_temp_water", FieldKind::U16),
        f("current_temp_room", FieldKind::U16),
        f("operating_status", FieldKind::U8),
        f("error_code", FieldKind::U16),
        f("_status_reserved_10", FieldKind::U8),
    ],
};

/// TIMER command (scheduled start/stop of a heating program).
pub static TIMER: CommandSchema = CommandSchema {
    cid_read: 0x3D,
    cid_write: 0x3C,
    write_fields: &[
        f("timer_target_temp_room", FieldKind::U16),
        f("timer_heating_mode", FieldKind::U8),
        f("_timer_reserved_a", FieldKind::U8),
        f("timer_el_power_level", FieldKind::U8),
        f("_timer_reserved_b", FieldKind::U8),
        f("timer_target_temp_water", FieldKind::U16),
        f("_timer_reserved_c", FieldKind::Raw(8)),
    ],
    read_only_fields: &[
        f("_timer_reserved_d", FieldKind::Raw(3)),
        f("timer_active", FieldKind::U8),
        f("timer_start_minutes", FieldKind::U8),
        f("timer_start_hours", FieldKind::U8),
        f("timer_stop_minutes", FieldKind::U8),
        f("timer_stop_hours", FieldKind::U8),
    ],
};

/// TIME command (wall clock and clock source/mode).
pub static TIME: CommandSchema = CommandSchema {
    cid_read: 0x15,
    cid_write: 0x14,
    write_fields: &[
        f("wall_time_hours", FieldKind::U8),
        f("wall_time_minutes", FieldKind::U8),
        f("wall_time_seconds", FieldKind::U8),
        f("_time_display_a", FieldKind::U8),
        f("_time_display_b", FieldKind::U8),
        f("_time_display_c", FieldKind::U8),
        f("clock_mode", FieldKind::U8),
        f("clock_source", FieldKind::U8),
    ],
    read_only_fields: &[
        f("_time_display_d", FieldKind::U8),
        f("_time_display_e", FieldKind::U8),
    ],
};

/// Fixed 10-byte preamble prefixing every status-buffer payload carried
/// by `0xBA`/`0xBB`.
pub const STATUS_BUFFER_PREAMBLE: [u8; 10] = [0x00, 0x1E, 0x00, 0x00, 0x22, 0xFF, 0xFF, 0xFF, 0x54, 0x01];

/// Status buffers are always padded with zeros to this length before
/// being segmented onto the transport layer.
pub const STATUS_BUFFER_PADDED_LEN: usize = 38;

/// All known command schemas, in dispatch-priority order (STATUS first,
/// matching the original firmware's preference for heating state over
/// timer/clock updates when several are pending at once).
pub static ALL: &[&CommandSchema] = &[&STATUS, &TIMER, &TIME];

/// Looks up the schema whose read cid matches.
pub fn by_read_cid(cid: u8) -> Option<&'static CommandSchema> {
    ALL.iter().copied().find(|s| s.cid_read == cid)
}

/// Unpacks `data` against `fields`, starting at `data[0]`, merging into
/// `out`. Returns the number of bytes consumed.
fn unpack_fields(
    fields: &[FieldDef],
    data: &[u8],
    out: &mut BTreeMap<String, FieldValue>,
) -> Result<usize, FrameError> {
    let mut offset = 0;
    for def in fields {
        let width = def.kind.width();
        if data.len() < offset + width {
            return Err(FrameError::Truncated {
                wanted: offset + width,
                got: data.len(),
            });
        }
        let slice = &data[offset..offset + width];
        match def.kind {
            FieldKind::Raw(_) => {
                out.insert(def.name.to_string(), FieldValue::Raw(slice.to_vec()));
            }
            FieldKind::U8 | FieldKind::U16 => {
                let mut v: u32 = 0;
                for &b in slice {
                    v = (v << 8) | b as u32;
                }
                if let Some(FieldValue::Int(prev)) = out.get(def.name) {
                    if *prev != v {
                        log::warn!(
                            "duplicate field {} disagrees: {prev} then {v}, keeping the later reading",
                            def.name
                        );
                    }
                }
                out.insert(def.name.to_string(), FieldValue::Int(v));
            }
        }
        offset += width;
    }
    Ok(offset)
}

/// Unpacks the write-direction prefix only (`schema.write_len()` bytes).
pub fn unpack_write(
    schema: &CommandSchema,
    data: &[u8],
) -> Result<BTreeMap<String, FieldValue>, FrameError> {
    let mut out = BTreeMap::new();
    unpack_fields(schema.write_fields, data, &mut out)?;
    Ok(out)
}

/// Unpacks a full read-direction record (`schema.read_len()` bytes).
pub fn unpack_full(
    schema: &CommandSchema,
    data: &[u8],
) -> Result<BTreeMap<String, FieldValue>, FrameError> {
    let mut out = BTreeMap::new();
    let consumed = unpack_fields(schema.write_fields, data, &mut out)?;
    unpack_fields(schema.read_only_fields, &data[consumed..], &mut out)?;
    Ok(out)
}

/// Packs the write-direction record from `values`. Returns `None` if any
/// required field is absent (matching the "cannot send until every
/// writable field has a known value" gating rule).
pub fn pack_write(schema: &CommandSchema, values: &BTreeMap<String, FieldValue>) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(schema.write_len());
    for def in schema.write_fields {
        let value = values.get(def.name)?;
        match (def.kind, value) {
            (FieldKind::U8, FieldValue::Int(v)) => out.push(*v as u8),
            (FieldKind::U16, FieldValue::Int(v)) => {
                out.push((*v >> 8) as u8);
                out.push(*v as u8);
            }
            (FieldKind::Raw(n), FieldValue::Raw(bytes)) if bytes.len() == n => {
                out.extend_from_slice(bytes)
            }
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_schema_lengths_match_spec() {
        assert_eq!(STATUS.write_len(), 0x0C);
        assert_eq!(STATUS.read_len(), 0x14);
    }

    #[test]
    fn timer_schema_lengths_match_spec() {
        assert_eq!(TIMER.write_len(), 0x10);
        assert_eq!(TIMER.read_len(), 0x18);
    }

    #[test]
    fn time_schema_lengths_match_spec() {
        assert_eq!(TIME.write_len(), 0x08);
        assert_eq!(TIME.read_len(), 0x0A);
    }

    #[test]
    fn status_round_trips_duplicate_fields() {
        let mut values = BTreeMap::new();
        values.insert("target_temp_room".into(), FieldValue::Int(313));
        values.insert("heating_mode".into(), FieldValue::Int(1));
        values.insert("_status_reserved_3".into(), FieldValue::Int(0));
        values.insert("el_power_level".into(), FieldValue::Int(900));
        values.insert("target_temp_water".into(), FieldValue::Int(313));
        values.insert("energy_mix".into(), FieldValue::Int(2));

        let packed = pack_write(&STATUS, &values).unwrap();
        assert_eq!(packed.len(), STATUS.write_len());
        let unpacked = unpack_write(&STATUS, &packed).unwrap();
        assert_eq!(unpacked["el_power_level"].as_int(), Some(900));
        assert_eq!(unpacked["energy_mix"].as_int(), Some(2));
    }

    #[test]
    fn pack_fails_when_field_missing() {
        let values = BTreeMap::new();
        assert!(pack_write(&STATUS, &values).is_none());
    }

    #[test]
    fn by_read_cid_finds_status() {
        assert!(std::ptr::eq(by_read_cid(0x33).unwrap(), &STATUS));
        assert!(by_read_cid(0xFF).is_none());
    }
}
