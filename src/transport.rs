//! Diagnostic transport layer (C2): single/first/consecutive frame
//! segmentation and reassembly on top of the frame layer.
//!
//! Frames are passed in without their leading node address byte -- the
//! bus loop matches the NAD before handing the remainder to this module.

use crate::error::TransportError;

/// One diagnostic transport frame, already classified by PCI type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFrame {
    /// Whole request/response fits in one frame.
    Single {
        /// Service id.
        sid: u8,
        /// Payload following the sid byte.
        payload: Vec<u8>,
    },
    /// First frame of a multi-frame request/response.
    First {
        /// Service id.
        sid: u8,
        /// Total byte count announced by this frame, including `sid` itself.
        total_len: usize,
        /// Payload bytes carried in this frame (up to 4).
        payload: Vec<u8>,
    },
    /// Continuation frame of a multi-frame request/response.
    Consecutive {
        /// Low nibble of the PCI byte.
        seq: u8,
        /// Payload bytes carried in this frame (up to 6).
        payload: Vec<u8>,
    },
    /// The other side rejected the in-flight exchange.
    NegativeResponse {
        /// Vendor error code, if one was carried.
        err: u8,
    },
}

/// Parses the PCI byte and whatever follows it into a [`TransportFrame`].
///
/// `data` starts at the PCI byte (the frame's node address must already
/// have been stripped by the caller).
pub fn parse_header(data: &[u8]) -> Result<TransportFrame, TransportError> {
    if data.is_empty() {
        return Err(TransportError::LengthMismatch {
            expected: 1,
            got: 0,
        });
    }
    let pci = data[0];
    match pci >> 4 {
        0x0 => {
            let len = (pci & 0x0F) as usize;
            if len == 0 || data.len() < 1 + len {
                return Err(TransportError::LengthMismatch {
                    expected: 1 + len,
                    got: data.len(),
                });
            }
            let sid = data[1];
            let payload = data[2..1 + len].to_vec();
            Ok(TransportFrame::Single { sid, payload })
        }
        0x1 => {
            if data.len() < 3 {
                return Err(TransportError::LengthMismatch {
                    expected: 3,
                    got: data.len(),
                });
            }
            let total_len = data[1] as usize;
            let sid = data[2];
            let available = (data.len() - 3).min(4);
            let payload = data[3..3 + available].to_vec();
            Ok(TransportFrame::First {
                sid,
                total_len,
                payload,
            })
        }
        0x2 => {
            let seq = pci & 0x0F;
            let available = (data.len() - 1).min(6);
            let payload = data[1..1 + available].to_vec();
            Ok(TransportFrame::Consecutive { seq, payload })
        }
        0x3 => Ok(TransportFrame::NegativeResponse {
            err: data.get(1).copied().unwrap_or(0),
        }),
        _ => Err(TransportError::UnknownFrameType(pci)),
    }
}

/// Reassembles first+consecutive frame sequences into a complete
/// `(sid, payload)` request, carrying state across [`push`](Reassembler::push)
/// calls for multi-frame requests.
#[derive(Debug, Default)]
pub struct Reassembler {
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    sid: u8,
    total_len: usize,
    buffer: Vec<u8>,
    next_seq: u8,
}

impl Reassembler {
    /// Creates an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a first frame has been seen but not yet completed.
    pub fn is_mid_request(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops any in-flight partial request, e.g. after a negative response.
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Feeds one transport frame in. Returns `Some((sid, payload))` once a
    /// full request has been reassembled, `None` while still waiting on
    /// consecutive frames.
    pub fn push(&mut self, frame: TransportFrame) -> Result<Option<(u8, Vec<u8>)>, TransportError> {
        match frame {
            TransportFrame::Single { sid, payload } => {
                self.pending = None;
                Ok(Some((sid, payload)))
            }
            TransportFrame::First {
                sid,
                total_len,
                payload,
            } => {
                if payload.len() + 1 >= total_len {
                    let mut buffer = payload;
                    buffer.truncate(total_len.saturating_sub(1));
                    self.pending = None;
                    return Ok(Some((sid, buffer)));
                }
                self.pending = Some(Pending {
                    sid,
                    total_len,
                    buffer: payload,
                    next_seq: 1,
                });
                Ok(None)
            }
            TransportFrame::Consecutive { seq, payload } => {
                let Some(pending) = self.pending.as_mut() else {
                    return Err(TransportError::OrphanConsecutive(seq));
                };
                pending.buffer.extend_from_slice(&payload);
                pending.next_seq = pending.next_seq.wrapping_add(1);
                if pending.buffer.len() + 1 >= pending.total_len {
                    let mut pending = self.pending.take().unwrap();
                    pending.buffer.truncate(pending.total_len.saturating_sub(1));
                    Ok(Some((pending.sid, pending.buffer)))
                } else {
                    Ok(None)
                }
            }
            TransportFrame::NegativeResponse { .. } => {
                self.pending = None;
                Ok(None)
            }
        }
    }
}

/// Builds a single-frame diagnostic response: `[node, len, sid_resp,
/// ...data]`, padded with `0xFF` idle bytes to a full 8-byte LIN frame.
pub fn single_response(node: u8, sid_resp: u8, data: &[u8]) -> Vec<u8> {
    let len = (1 + data.len()) as u8;
    let mut frame = vec![node, len, sid_resp];
    frame.extend_from_slice(data);
    frame.resize(8, 0xFF);
    frame
}

/// Segments `payload` (which does *not* include `sid_resp`) into a first
/// frame carrying up to 4 bytes plus as many consecutive frames of up to
/// 6 bytes as needed to drain the rest.
///
/// `total_len` in the first frame is `payload.len() + 1`, the `+1`
/// accounting for `sid_resp`.
pub fn segment_response(node: u8, sid_resp: u8, payload: &[u8]) -> Vec<Vec<u8>> {
    let total_len = (payload.len() + 1) as u8;
    let first_len = payload.len().min(4);
    let mut first = vec![node, 0x10, total_len, sid_resp];
    first.extend_from_slice(&payload[..first_len]);
    first.resize(8, 0xFF);
    let mut frames = vec![first];

    let mut offset = first_len;
    let mut seq = 1u8;
    while offset < payload.len() {
        let end = (offset + 6).min(payload.len());
        let mut frame = vec![node, 0x20 + seq];
        frame.extend_from_slice(&payload[offset..end]);
        frame.resize(8, 0xFF);
        frames.push(frame);
        offset = end;
        seq += 1;
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_round_trips() {
        let data = [0x17, 0x46, 0x00, 0x1F];
        let pci = 0x00 | ((1 + data.len()) as u8);
        let mut raw = vec![pci, 0xB2];
        raw.extend_from_slice(&data);
        match parse_header(&raw).unwrap() {
            TransportFrame::Single { sid, payload } => {
                assert_eq!(sid, 0xB2);
                assert_eq!(payload, data);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn first_and_consecutive_reassemble() {
        let mut r = Reassembler::new();
        let first = parse_header(&[0x10, 0x08, 0xBA, 0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        assert!(r.push(first).unwrap().is_none());
        assert!(r.is_mid_request());
        let cons = parse_header(&[0x21, 0xEE, 0xFF, 0x01, 0x02]).unwrap();
        let (sid, payload) = r.push(cons).unwrap().unwrap();
        assert_eq!(sid, 0xBA);
        assert_eq!(payload, vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x01]);
        assert!(!r.is_mid_request());
    }

    #[test]
    fn orphan_consecutive_is_rejected() {
        let mut r = Reassembler::new();
        let cons = parse_header(&[0x21, 0x01, 0x02]).unwrap();
        assert_eq!(r.push(cons), Err(TransportError::OrphanConsecutive(1)));
    }

    #[test]
    fn segment_response_splits_into_first_plus_consecutive() {
        let payload: Vec<u8> = (0..38u8).collect();
        let frames = segment_response(0x03, 0xFA, &payload);
        assert_eq!(frames[0][0..4], [0x03, 0x10, 39, 0xFA]);
        assert_eq!(frames[0].len(), 8);
        for (k, frame) in frames.iter().enumerate().skip(1) {
            assert_eq!(frame[0], 0x03);
            assert_eq!(frame[1], 0x20 + k as u8);
        }
        // Every frame is padded to a full 8-byte LIN frame, so frame
        // count (not byte count) must reconstruct the payload: 4 bytes
        // in the first frame, up to 6 in each consecutive one.
        assert_eq!(frames.len(), 1 + 6);
        assert_eq!(&frames[6][2..6], &payload[34..38]);
        assert_eq!(&frames[6][6..8], &[0xFF, 0xFF]);

        let mut r = Reassembler::new();
        let mut result = None;
        for frame in frames {
            let parsed = parse_header(&frame[1..]).unwrap();
            if let Some(got) = r.push(parsed).unwrap() {
                result = Some(got);
            }
        }
        let (sid, reassembled) = result.expect("should reassemble");
        assert_eq!(sid, 0xFA);
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn single_response_pads_to_eight_bytes() {
        let frame = single_response(0x03, 0xF9, &[0x00]);
        assert_eq!(frame.len(), 8);
        assert_eq!(&frame[0..3], &[0x03, 0x02, 0xF9]);
    }
}
