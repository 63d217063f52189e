//! Application state (C5): the authoritative mirror of the last status
//! the master delivered, queued outbound updates, and the per-command
//! send-gating flags that keep this core from writing before it has
//! read.
//!
//! All mutation happens on the bus loop's thread; external callers only
//! ever go through [`AppState::get`]/[`AppState::set`] (synchronous,
//! cheap, and safe to call from another thread while holding the same
//! mutex the bus loop locks between serial reads).

use std::collections::BTreeMap;

use crate::conversions;
use crate::error::{ConfigError, ConversionError, CoreError};
use crate::record::{self, CommandSchema, FieldValue};

/// Outward-facing coarse state, derived from the gating flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// No pending updates, nothing in flight.
    Idle,
    /// Updates are queued but at least one target command has never
    /// been read from the master yet, so nothing can be sent.
    WaitingForMaster,
    /// Updates are queued and every target command is send-eligible,
    /// but no `0xBA` upload request has packed them yet.
    WaitingCommit,
    /// A write was packed and sent; waiting for the master to
    /// acknowledge it with a fresh status push.
    WaitingMasterAck,
}

#[derive(Debug, Default)]
struct Tracker {
    can_send_updates: bool,
    updates_pending: bool,
}

/// The core's single piece of mutable application state.
pub struct AppState {
    last_status: BTreeMap<String, FieldValue>,
    pending_updates: BTreeMap<String, FieldValue>,
    trackers: BTreeMap<u8, Tracker>,
    command_counter: u8,
    display_snapshot: BTreeMap<String, String>,
    strict_status_checksum: bool,
}

struct FieldSpec {
    decode: fn(u32) -> String,
    encode: Option<fn(&str) -> Option<u32>>,
}

fn plain_decode(v: u32) -> String {
    v.to_string()
}

fn plain_encode(s: &str) -> Option<u32> {
    s.parse().ok()
}

fn field_spec(name: &str) -> Option<FieldSpec> {
    use conversions::*;
    Some(match name {
        "target_temp_room" | "target_temp_water" | "timer_target_temp_room"
        | "timer_target_temp_water" => FieldSpec {
            decode: temp_decode,
            encode: Some(temp_encode),
        },
        "heating_mode" | "timer_heating_mode" => FieldSpec {
            decode: heating_mode_decode,
            encode: Some(heating_mode_encode),
        },
        "el_power_level" | "timer_el_power_level" => FieldSpec {
            decode: el_power_level_decode,
            encode: Some(el_power_level_encode),
        },
        "energy_mix" => FieldSpec {
            decode: energy_mix_decode,
            encode: Some(energy_mix_encode),
        },
        "clock_mode" => FieldSpec {
            decode: clock_mode_decode,
            encode: Some(clock_mode_encode),
        },
        "clock_source" => FieldSpec {
            decode: clock_source_decode,
            encode: Some(clock_source_encode),
        },
        "current_temp_water" | "current_temp_room" => FieldSpec {
            decode: temp_decode,
            encode: None,
        },
        "operating_status" => FieldSpec {
            decode: operating_status_decode,
            encode: None,
        },
        "error_code" => FieldSpec {
            decode: error_code_decode,
            encode: None,
        },
        "wall_time_hours" | "wall_time_minutes" | "wall_time_seconds" => FieldSpec {
            decode: plain_decode,
            encode: Some(plain_encode),
        },
        "timer_active" | "timer_start_minutes" | "timer_start_hours" | "timer_stop_minutes"
        | "timer_stop_hours" => FieldSpec {
            decode: plain_decode,
            encode: None,
        },
        _ => return None,
    })
}

impl AppState {
    /// Creates a fresh state with a random initial command counter.
    pub fn new(strict_status_checksum: bool) -> Self {
        Self {
            last_status: BTreeMap::new(),
            pending_updates: BTreeMap::new(),
            trackers: BTreeMap::new(),
            command_counter: rand::random::<u8>() % 255,
            display_snapshot: BTreeMap::new(),
            strict_status_checksum,
        }
    }

    /// Whether ingest should verify the status-buffer checksum (see
    /// `CoreError::Frame(FrameError::Checksum)` on mismatch) or stay
    /// lenient like the firmware this replaces.
    pub fn strict_status_checksum(&self) -> bool {
        self.strict_status_checksum
    }

    /// Reads one field, routed through its conversion function.
    ///
    /// `Ok(None)` means the field is known but no value has been
    /// observed yet.
    pub fn get(&self, field: &str) -> Result<Option<String>, CoreError> {
        if field.starts_with('_') {
            return Ok(self.last_status.get(field).map(render_raw));
        }
        let Some(spec) = field_spec(field) else {
            return Err(ConfigError::UnknownField(field.to_string()).into());
        };
        Ok(self
            .last_status
            .get(field)
            .and_then(FieldValue::as_int)
            .map(spec.decode))
    }

    /// Stages a write to `field`, after validating and converting
    /// `value`. Writable fields land in `pending_updates`; the update
    /// is only packed onto the wire once [`materialize_write`] picks a
    /// command whose writable fields are all send-eligible.
    ///
    /// [`materialize_write`]: AppState::materialize_write
    pub fn set(&mut self, field: &str, value: &str) -> Result<(), CoreError> {
        if field == "wall_time" {
            return self.set_wall_time(value);
        }
        if field.starts_with('_') {
            let raw = parse_raw(value).ok_or_else(|| ConversionError {
                field: field.to_string(),
                reason: "not a valid integer".to_string(),
            })?;
            self.pending_updates
                .insert(field.to_string(), FieldValue::Int(raw));
            return Ok(());
        }
        let spec = field_spec(field).ok_or_else(|| ConfigError::UnknownField(field.to_string()))?;
        let Some(encode) = spec.encode else {
            return Err(ConfigError::ReadOnly(field.to_string()).into());
        };
        let raw = encode(value).ok_or_else(|| ConversionError {
            field: field.to_string(),
            reason: format!("invalid value {value:?}"),
        })?;
        self.pending_updates
            .insert(field.to_string(), FieldValue::Int(raw));
        Ok(())
    }

    fn set_wall_time(&mut self, value: &str) -> Result<(), CoreError> {
        let parts: Vec<&str> = value.split(':').collect();
        let bad = || ConversionError {
            field: "wall_time".to_string(),
            reason: format!("expected HH:MM:SS, got {value:?}"),
        };
        let [h, m, s] = parts[..] else {
            return Err(bad().into());
        };
        for part in [h, m, s] {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(bad().into());
            }
        }
        let hours: u32 = h.parse().map_err(|_| bad())?;
        let minutes: u32 = m.parse().map_err(|_| bad())?;
        let seconds: u32 = s.parse().map_err(|_| bad())?;
        if hours > 23 || minutes > 59 || seconds > 59 {
            return Err(bad().into());
        }
        self.pending_updates
            .insert("wall_time_hours".to_string(), FieldValue::Int(hours));
        self.pending_updates
            .insert("wall_time_minutes".to_string(), FieldValue::Int(minutes));
        self.pending_updates
            .insert("wall_time_seconds".to_string(), FieldValue::Int(seconds));
        Ok(())
    }

    /// Merges a freshly decoded full record into `last_status`, marking
    /// the owning command as eligible to send writes and clearing its
    /// pending-ack flag.
    pub fn ingest(&mut self, schema: &CommandSchema, fields: BTreeMap<String, FieldValue>) {
        self.last_status.extend(fields);
        let tracker = self.trackers.entry(schema.cid_read).or_default();
        tracker.can_send_updates = true;
        tracker.updates_pending = false;
    }

    /// Adopts a bare command-counter update (vendor cid `0x0D`).
    pub fn adopt_counter(&mut self, counter: u8) {
        self.command_counter = counter;
    }

    /// Current command counter (the last value adopted or emitted).
    pub fn command_counter(&self) -> u8 {
        self.command_counter
    }

    /// Merges freshly parsed live telemetry into the display snapshot.
    pub fn ingest_display(&mut self, fields: BTreeMap<String, String>) {
        self.display_snapshot.extend(fields);
    }

    /// Snapshot of every field known through the record codec,
    /// rendered through the conversion table.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.last_status
            .keys()
            .filter_map(|k| self.get(k).ok().flatten().map(|v| (k.clone(), v)))
            .collect()
    }

    /// Snapshot of the read-only live telemetry fields.
    pub fn display_snapshot(&self) -> BTreeMap<String, String> {
        self.display_snapshot.clone()
    }

    /// Renders [`Self::snapshot`] as a JSON object, for outbox consumers
    /// that speak JSON rather than this crate's map type directly.
    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }

    /// Whether at least one field is staged in `pending_updates`, i.e.
    /// not yet packed into an outbound record by [`Self::materialize_write`].
    ///
    /// This is the poll-answer signal (`0xFF`/`0xFE` on PID `0x18`),
    /// matching the original daemon's `updates_to_send` truthiness check
    /// rather than the coarser [`UpdateState`] (which also covers writes
    /// already sent and awaiting the master's acknowledging status push).
    pub fn has_pending_updates(&self) -> bool {
        !self.pending_updates.is_empty()
    }

    /// Coarse state derived from the gating flags, for [`Self::update_state`].
    pub fn update_state(&self) -> UpdateState {
        if self.pending_updates.is_empty() {
            if self.trackers.values().any(|t| t.updates_pending) {
                return UpdateState::WaitingMasterAck;
            }
            return UpdateState::Idle;
        }
        let ready = record::ALL.iter().any(|schema| {
            self.command_has_pending(schema)
                && self
                    .trackers
                    .get(&schema.cid_read)
                    .is_some_and(|t| t.can_send_updates)
        });
        if ready {
            UpdateState::WaitingCommit
        } else {
            UpdateState::WaitingForMaster
        }
    }

    fn command_has_pending(&self, schema: &CommandSchema) -> bool {
        schema
            .write_fields
            .iter()
            .any(|f| !f.name.starts_with('_') && self.pending_updates.contains_key(f.name))
    }

    /// Picks the first command (in [`record::ALL`] order) with a
    /// pending update, packs a fresh write record for it, and returns
    /// the full status-buffer bytes (preamble, header, counter,
    /// checksum, record) ready to be padded and segmented.
    ///
    /// Returns `None` if no command has a pending update, or if the
    /// owning command has never been read from the master (I2).
    pub fn materialize_write(&mut self) -> Option<Vec<u8>> {
        let schema = record::ALL
            .iter()
            .copied()
            .find(|schema| self.command_has_pending(schema))?;

        let tracker = self.trackers.entry(schema.cid_read).or_default();
        if !tracker.can_send_updates {
            return None;
        }

        let mut values = self.last_status.clone();
        values.extend(self.pending_updates.clone());
        let Some(record_bytes) = record::pack_write(schema, &values) else {
            self.trackers.get_mut(&schema.cid_read).unwrap().can_send_updates = false;
            return None;
        };

        for field in schema.write_fields {
            self.pending_updates.remove(field.name);
        }

        let counter = self.command_counter.wrapping_add(1) % 255;
        self.command_counter = counter;

        let mut buffer = Vec::with_capacity(10 + 2 + 1 + 1 + record_bytes.len());
        buffer.extend_from_slice(&record::STATUS_BUFFER_PREAMBLE);
        let header = [record_bytes.len() as u8, schema.cid_write];
        let checksum_input: Vec<u8> = record::STATUS_BUFFER_PREAMBLE[8..]
            .iter()
            .chain(header.iter())
            .chain(std::iter::once(&counter))
            .chain(record_bytes.iter())
            .copied()
            .collect();
        let checksum = crate::frame::classic_checksum(&checksum_input);
        buffer.extend_from_slice(&header);
        buffer.push(counter);
        buffer.push(checksum);
        buffer.extend_from_slice(&record_bytes);

        self.trackers.get_mut(&schema.cid_read).unwrap().updates_pending = true;
        Some(buffer)
    }
}

fn render_raw(value: &FieldValue) -> String {
    match value {
        FieldValue::Int(v) => format!("0x{v:x}"),
        FieldValue::Raw(bytes) => bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" "),
    }
}

fn parse_raw(value: &str) -> Option<u32> {
    if let Some(hex) = value.strip_prefix("0x") {
        u32::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}
