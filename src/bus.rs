//! Bus loop (C7): the single-threaded, cooperative driver that turns
//! bytes on a [`SerialChannel`] into calls against [`Protocol`].
//!
//! Mirrors a bounded-cost `step()` contract: one call processes at most
//! one inbound frame or emits at most one outbound segment, so callers
//! can drive it from a tight poll loop without starving other work.

use crate::error::{CoreError, ProtocolError};
use crate::frame::{self, DATA_PLUS_CHECKSUM_LEN};
use crate::protocol::Protocol;
use crate::serial::SerialChannel;

/// Whether the bus loop is allowed to transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Impersonates the accessory: answers polls, packs writes.
    Active,
    /// Observes traffic only, e.g. replaying a captured log.
    ReadOnly,
}

/// Live frame id for the accessory's own poll slot.
const POLL_ID: u8 = 0x18;
/// Live telemetry frame ids this core only ever listens to.
const DISPLAY_IDS: [u8; 3] = [0x20, 0x21, 0x22];
/// Master-to-slave diagnostic request.
const DIAGNOSTIC_MASTER_ID: u8 = 0x3C;
/// Master's "slave, send your queued answer" poll.
const DIAGNOSTIC_SLAVE_ID: u8 = 0x3D;

/// Owns a channel and a [`Protocol`] and steps them together.
pub struct Bus<C: SerialChannel> {
    channel: C,
    protocol: Protocol,
    mode: Mode,
}

impl<C: SerialChannel> Bus<C> {
    /// Builds a bus loop over an already-configured channel.
    pub fn new(channel: C, mode: Mode, strict_status_checksum: bool) -> Self {
        Self {
            channel,
            protocol: Protocol::new(strict_status_checksum),
            mode,
        }
    }

    /// Borrows the underlying protocol state, e.g. for a `get`/`set` API
    /// exposed over another thread.
    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Mutably borrows the underlying protocol state.
    pub fn protocol_mut(&mut self) -> &mut Protocol {
        &mut self.protocol
    }

    /// Runs one bounded step of the loop.
    ///
    /// Reads until the next sync preamble, classifies the PID, then
    /// either ingests the frame or (in [`Mode::Active`]) answers it.
    /// Returns `Ok(())` for every recoverable condition (parity error,
    /// checksum error, unknown PID, desync); the only propagated error
    /// is [`ProtocolError::NadReassignUnsupported`].
    pub fn step(&mut self) -> Result<(), CoreError> {
        let mut header = [0u8; 3];
        self.channel.read_exact(&mut header)?;
        if header[0] != frame::SYNC_BYTE || header[1] != frame::SYNC_DELIMITER {
            return Ok(());
        }
        let pid = header[2];

        let id = match frame::classify(pid) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("{e}");
                return Ok(());
            }
        };

        let mut rest = [0u8; DATA_PLUS_CHECKSUM_LEN];
        self.channel.read_exact(&mut rest)?;
        let (data, checksum) = rest.split_at(8);
        let checksum = checksum[0];
        if let Err(e) = frame::verify_checksum(id, pid, data, checksum) {
            log::warn!("{e}");
            return Ok(());
        }
        let mut data8 = [0u8; 8];
        data8.copy_from_slice(data);

        match id {
            POLL_ID => self.answer_poll(),
            id if DISPLAY_IDS.contains(&id) => {
                self.protocol.handle_display(id, &data8);
                Ok(())
            }
            DIAGNOSTIC_MASTER_ID => self.protocol.handle_diagnostic_master(&data8),
            DIAGNOSTIC_SLAVE_ID => self.answer_queued(),
            other => {
                log::debug!("ignoring unrecognized frame id 0x{other:02x}");
                Ok(())
            }
        }
    }

    fn answer_poll(&mut self) -> Result<(), CoreError> {
        if self.mode != Mode::Active {
            return Ok(());
        }
        let data = self.protocol.poll_answer();
        let pid = frame::make_pid(POLL_ID);
        let checksum = frame::enhanced_checksum(pid, &data);
        self.transmit(&data, checksum)
    }

    fn answer_queued(&mut self) -> Result<(), CoreError> {
        if self.mode != Mode::Active {
            return Ok(());
        }
        let Some(data) = self.protocol.pop_response() else {
            return Ok(());
        };
        let pid = frame::make_pid(DIAGNOSTIC_SLAVE_ID);
        let checksum = frame::classic_checksum(&data);
        self.transmit(&data, checksum)
    }

    /// Writes the 8 data bytes plus checksum onto the wire, then drains
    /// the self-echo a half-duplex transceiver reflects back.
    fn transmit(&mut self, data: &[u8], checksum: u8) -> Result<(), CoreError> {
        let mut frame = data.to_vec();
        frame.push(checksum);
        self.channel.write_all(&frame)?;
        let mut echo = [0u8; DATA_PLUS_CHECKSUM_LEN];
        let _ = self.channel.read_exact(&mut echo);
        Ok(())
    }
}

/// Maps the only propagated failure back onto the impersonation being
/// unrecoverable, matching the spec's "surfaced because it would
/// otherwise leave the impersonation in an ill-defined state" framing.
pub fn is_fatal(err: &CoreError) -> bool {
    matches!(err, CoreError::Protocol(ProtocolError::NadReassignUnsupported(_)))
}
