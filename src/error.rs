/*! Error types for the LIN protocol engine.

Frame- and transport-level errors are always recoverable: the caller logs
and resynchronizes. `CoreError::Protocol(ProtocolError::NadReassignUnsupported)`
is the only variant [`crate::bus::Bus::step`] ever propagates;
everything else is handled at the point of detection.
*/

/// Frame codec (C1) errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    /// PID parity bits did not match the computed parity.
    #[error("PID parity error (received 0x{0:02x})")]
    Parity(u8),

    /// Checksum byte did not match the computed checksum.
    #[error("checksum error (received 0x{received:02x}, calculated 0x{calculated:02x})")]
    Checksum {
        /// Checksum byte found on the wire.
        received: u8,
        /// Checksum calculated from the rest of the frame.
        calculated: u8,
    },

    /// Fewer bytes were available than the frame requires.
    #[error("truncated frame: wanted {wanted} bytes, got {got}")]
    Truncated {
        /// Bytes expected.
        wanted: usize,
        /// Bytes actually available.
        got: usize,
    },
}

/// Transport layer (C2) errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    /// A consecutive frame arrived with no preceding first frame.
    #[error("consecutive frame with no matching first frame (sequence {0})")]
    OrphanConsecutive(u8),

    /// The reassembled payload did not match the length the first frame announced.
    #[error("transport length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// Length announced by the first frame.
        expected: usize,
        /// Length actually reassembled.
        got: usize,
    },

    /// The PCI byte did not encode a known frame type.
    #[error("unrecognized transport frame type (PCI 0x{0:02x})")]
    UnknownFrameType(u8),
}

/// Protocol state machine (C6) errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Service identifier not recognized by the core.
    #[error("unknown service id 0x{0:02x}")]
    UnknownSid(u8),

    /// Command id not recognized by the record codec.
    #[error("unknown command id 0x{0:02x}")]
    UnknownCid(u8),

    /// Status buffer did not start with the expected preamble.
    #[error("status buffer preamble mismatch")]
    PreambleMismatch,

    /// The CP Plus tried to reassign this node to a different NAD.
    ///
    /// Fatal: the only error kind the bus loop propagates to its caller.
    #[error("CP Plus requested NAD reassignment to 0x{0:02x}, which is unsupported")]
    NadReassignUnsupported(u8),
}

/// Application state (C5) errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No such field in the status model.
    #[error("unknown field {0:?}")]
    UnknownField(String),

    /// Field exists but cannot be written from the outside.
    #[error("field {0:?} is read-only")]
    ReadOnly(String),
}

/// Field conversion (C4) errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("could not convert value for field {field:?}: {reason}")]
pub struct ConversionError {
    /// Field being converted.
    pub field: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// See [`FrameError`].
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// See [`TransportError`].
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// See [`ProtocolError`].
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// See [`ConversionError`].
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// I/O error from the abstract serial channel.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CoreError>;
