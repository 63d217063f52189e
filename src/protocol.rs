//! Protocol state machine (C6): maps classified inbound PIDs to either
//! silence, an immediate answer, or a queued transport response.
//!
//! This is the only layer that knows the vendor identity this node
//! impersonates and the NAD it answers to.

use std::collections::VecDeque;

use crate::display;
use crate::error::{CoreError, ProtocolError};
use crate::record;
use crate::state::AppState;
use crate::transport::{self, Reassembler, TransportFrame};

/// Node address this core answers to.
pub const NODE_ADDRESS: u8 = 0x03;

/// Broadcast node address (every node must act on frames sent here).
pub const BROADCAST_ADDRESS: u8 = 0x7F;

/// Constant 4-byte vendor identifier that tags this node as an iNet Box.
pub const VENDOR_ID: [u8; 4] = [0x17, 0x46, 0x00, 0x1F];

/// Drives the request/response state machine on top of [`AppState`].
pub struct Protocol {
    /// Application state (C5); public so callers can `get`/`set`/snapshot.
    pub state: AppState,
    reassembler: Reassembler,
    response_queue: VecDeque<Vec<u8>>,
}

impl Protocol {
    /// Creates a protocol engine wrapping a fresh [`AppState`].
    pub fn new(strict_status_checksum: bool) -> Self {
        Self {
            state: AppState::new(strict_status_checksum),
            reassembler: Reassembler::new(),
            response_queue: VecDeque::new(),
        }
    }

    /// Builds the 8 data bytes answering a PID `0x18` poll.
    ///
    /// Byte 0 is `0xFF` if an update is queued for output, `0xFE`
    /// otherwise; the rest is always `0xFF`.
    pub fn poll_answer(&self) -> [u8; 8] {
        let mut data = [0xFFu8; 8];
        if !self.state.has_pending_updates() {
            data[0] = 0xFE;
        }
        data
    }

    /// Handles a read-only live-telemetry frame (PID `0x20`/`0x21`/`0x22`).
    pub fn handle_display(&mut self, id: u8, data: &[u8; 8]) {
        let fields = display::parse(id, data);
        self.state.ingest_display(fields);
    }

    /// Handles the diagnostic master-to-slave frame (PID `0x3C`).
    ///
    /// Returns `Err` only for [`ProtocolError::NadReassignUnsupported`];
    /// every other recoverable failure is logged and swallowed.
    pub fn handle_diagnostic_master(&mut self, data: &[u8; 8]) -> Result<(), CoreError> {
        let nad = data[0];
        if nad != NODE_ADDRESS && nad != BROADCAST_ADDRESS {
            return Ok(());
        }

        let frame = match transport::parse_header(&data[1..]) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("transport header parse error: {e}");
                return Ok(());
            }
        };

        if let TransportFrame::NegativeResponse { err } = frame {
            log::warn!("negative response (err 0x{err:02x}), dropping in-flight request");
            self.reassembler.reset();
            return Ok(());
        }

        let reassembled = match self.reassembler.push(frame) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("transport reassembly error: {e}");
                return Ok(());
            }
        };
        let Some((sid, payload)) = reassembled else {
            return Ok(());
        };

        self.dispatch_sid(sid, &payload)
    }

    fn dispatch_sid(&mut self, sid: u8, payload: &[u8]) -> Result<(), CoreError> {
        match sid {
            0xB2 => {
                if payload.starts_with(&VENDOR_ID) {
                    let mut data = VENDOR_ID.to_vec();
                    data.push(0x00);
                    self.response_queue
                        .push_back(transport::single_response(NODE_ADDRESS, 0xF2, &data));
                }
                Ok(())
            }
            0xB0 => {
                if payload.last() == Some(&NODE_ADDRESS) {
                    self.response_queue
                        .push_back(transport::single_response(NODE_ADDRESS, 0xF0, &[]));
                    Ok(())
                } else {
                    let foreign = payload.last().copied().unwrap_or(0);
                    Err(ProtocolError::NadReassignUnsupported(foreign).into())
                }
            }
            0xB9 => {
                if payload.get(0..2) == Some(&VENDOR_ID[2..4]) {
                    self.response_queue
                        .push_back(transport::single_response(NODE_ADDRESS, 0xF9, &[0x00]));
                }
                Ok(())
            }
            0xBA => {
                if let Some(mut buffer) = self.state.materialize_write() {
                    buffer.resize(record::STATUS_BUFFER_PADDED_LEN, 0);
                    for segment in transport::segment_response(NODE_ADDRESS, 0xFA, &buffer) {
                        self.response_queue.push_back(segment);
                    }
                }
                Ok(())
            }
            0xBB => {
                self.ingest_status_buffer(payload);
                self.response_queue
                    .push_back(transport::single_response(NODE_ADDRESS, 0xFB, &[]));
                Ok(())
            }
            other => {
                log::warn!("{}", ProtocolError::UnknownSid(other));
                Ok(())
            }
        }
    }

    fn ingest_status_buffer(&mut self, payload: &[u8]) {
        if payload.len() < 14 || payload[0..10] != record::STATUS_BUFFER_PREAMBLE {
            log::warn!("{}", ProtocolError::PreambleMismatch);
            return;
        }
        let len = payload[10] as usize;
        let cid = payload[11];
        let counter = payload[12];
        let checksum = payload[13];
        let Some(record_bytes) = payload.get(14..14 + len) else {
            log::warn!("status buffer record truncated (cid 0x{cid:02x}, wanted {len} bytes)");
            return;
        };

        let mut input = record::STATUS_BUFFER_PREAMBLE[8..].to_vec();
        input.extend_from_slice(&[payload[10], cid, counter]);
        input.extend_from_slice(record_bytes);
        let calculated = crate::frame::classic_checksum(&input);
        if calculated != checksum {
            if self.state.strict_status_checksum() {
                log::warn!(
                    "{}",
                    CoreError::from(crate::error::FrameError::Checksum { received: checksum, calculated })
                );
                return;
            }
            log::warn!(
                "status buffer checksum mismatch (received 0x{checksum:02x}, calculated 0x{calculated:02x}), ingesting anyway in lenient mode"
            );
        }

        if cid == 0x0D {
            self.state.adopt_counter(counter);
            return;
        }

        let Some(schema) = record::by_read_cid(cid) else {
            log::warn!("{}", ProtocolError::UnknownCid(cid));
            return;
        };
        match record::unpack_full(schema, record_bytes) {
            Ok(fields) => self.state.ingest(schema, fields),
            Err(e) => log::warn!("record decode error: {e}"),
        }
    }

    /// Pops the next queued response segment, for PID `0x3D` polls.
    pub fn pop_response(&mut self) -> Option<Vec<u8>> {
        self.response_queue.pop_front()
    }
}
