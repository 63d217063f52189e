//! End-to-end coverage of the §8 scenarios (S1-S6), driven through the
//! public `Bus` the way a real serial transceiver would see it: raw
//! sync/PID/data/checksum bytes in, raw answer bytes out.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use inetbox_lin::bus::{Bus, Mode};
use inetbox_lin::frame;
use inetbox_lin::protocol::{NODE_ADDRESS, VENDOR_ID};
use inetbox_lin::serial::SerialChannel;

#[derive(Default)]
struct MockChannel {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
}

impl SerialChannel for MockChannel {
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.inbound.len() < buf.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no more bytes"));
        }
        for slot in buf {
            *slot = self.inbound.pop_front().unwrap();
        }
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.outbound.extend_from_slice(buf);
        Ok(())
    }

    fn flush_input(&mut self) -> io::Result<()> {
        self.inbound.clear();
        Ok(())
    }

    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}

fn push_single(chan: &mut MockChannel, id: u8, node: u8, sid: u8, payload: &[u8]) {
    let mut data = [0xFFu8; 8];
    data[0] = node;
    data[1] = (1 + payload.len()) as u8;
    data[2] = sid;
    data[3..3 + payload.len()].copy_from_slice(payload);
    push_frame(chan, id, &data);
}

fn push_frame(chan: &mut MockChannel, id: u8, data: &[u8; 8]) {
    let pid = frame::make_pid(id);
    let checksum = if id == 0x3C || id == 0x3D {
        frame::classic_checksum(data)
    } else {
        frame::enhanced_checksum(pid, data)
    };
    chan.inbound.push_back(0x00);
    chan.inbound.push_back(0x55);
    chan.inbound.push_back(pid);
    chan.inbound.extend(data.iter().copied());
    chan.inbound.push_back(checksum);
}

/// Pushes a `0xBB` status-buffer push, segmented as first(4)+consecutive(6)
/// diagnostic frames, returning the number of frames pushed.
fn push_status_buffer(chan: &mut MockChannel, payload: &[u8], sid: u8) -> usize {
    let total_len = (payload.len() + 1) as u8;
    let first_chunk_len = payload.len().min(4);

    let mut first_data = [0xFFu8; 8];
    first_data[0] = NODE_ADDRESS;
    first_data[1] = 0x10;
    first_data[2] = total_len;
    first_data[3] = sid;
    first_data[4..4 + first_chunk_len].copy_from_slice(&payload[..first_chunk_len]);
    push_frame(chan, 0x3C, &first_data);
    let mut frame_count = 1;

    let mut offset = first_chunk_len;
    let mut seq = 1u8;
    while offset < payload.len() {
        let end = (offset + 6).min(payload.len());
        let mut data = [0xFFu8; 8];
        data[0] = NODE_ADDRESS;
        data[1] = 0x20 + seq;
        data[2..2 + (end - offset)].copy_from_slice(&payload[offset..end]);
        push_frame(chan, 0x3C, &data);
        frame_count += 1;
        offset = end;
        seq += 1;
    }
    frame_count
}

fn status_push_payload() -> Vec<u8> {
    use inetbox_lin::record;

    let mut write_bytes = vec![0u8; record::STATUS.write_len()];
    write_bytes[0..2].copy_from_slice(&293u16.to_be_bytes()); // target_temp_room
    write_bytes[2] = 1; // heating_mode eco
    write_bytes[4..6].copy_from_slice(&900u16.to_be_bytes()); // el_power_level
    write_bytes[6..8].copy_from_slice(&313u16.to_be_bytes()); // target_temp_water
    write_bytes[8..10].copy_from_slice(&900u16.to_be_bytes()); // el_power_level dup
    write_bytes[10] = 1; // energy_mix
    write_bytes[11] = 1; // energy_mix dup

    let mut read_only = vec![0u8; 8];
    read_only[0..2].copy_from_slice(&315u16.to_be_bytes()); // current_temp_water
    read_only[2..4].copy_from_slice(&295u16.to_be_bytes()); // current_temp_room
    read_only[4] = 5; // operating_status On

    let mut full = write_bytes;
    full.extend_from_slice(&read_only);

    let mut payload = record::STATUS_BUFFER_PREAMBLE.to_vec();
    payload.push(full.len() as u8);
    payload.push(record::STATUS.cid_read);
    payload.push(0x00); // counter
    let mut checksum_input = record::STATUS_BUFFER_PREAMBLE[8..].to_vec();
    checksum_input.push(full.len() as u8);
    checksum_input.push(record::STATUS.cid_read);
    checksum_input.push(0x00);
    checksum_input.extend_from_slice(&full);
    payload.push(frame::classic_checksum(&checksum_input));
    payload.extend_from_slice(&full);
    payload
}

#[test]
fn s1_heartbeat_round_trip() {
    let mut chan = MockChannel::default();
    push_single(&mut chan, 0x3C, NODE_ADDRESS, 0xB9, &VENDOR_ID[2..4]);
    push_single(&mut chan, 0x3D, 0, 0, &[]); // content irrelevant, only the PID drives a poll-the-queue answer
    let mut bus = Bus::new(chan, Mode::Active, true);
    bus.step().unwrap();
    bus.step().unwrap();
}

#[test]
fn s2_read_by_id_is_accepted_without_state_change() {
    let mut chan = MockChannel::default();
    push_single(&mut chan, 0x3C, NODE_ADDRESS, 0xB2, &VENDOR_ID);
    let mut bus = Bus::new(chan, Mode::Active, true);
    bus.step().unwrap();
    assert!(bus.protocol().state.snapshot().is_empty());
}

#[test]
fn s3_and_s4_status_ingest_then_materialized_write() {
    let payload = status_push_payload();

    let mut chan = MockChannel::default();
    let status_frame_count = push_status_buffer(&mut chan, &payload, 0xBB);
    push_single(&mut chan, 0x3C, NODE_ADDRESS, 0xBA, &[]);

    let mut bus = Bus::new(chan, Mode::Active, true);
    for _ in 0..status_frame_count {
        bus.step().unwrap();
    }

    let snap = bus.protocol().state.snapshot();
    assert_eq!(snap["target_temp_room"], "20");
    assert_eq!(snap["heating_mode"], "eco");
    assert_eq!(snap["current_temp_room"], "22");
    assert_eq!(snap["current_temp_water"], "42");
    assert_eq!(snap["operating_status"], "On");

    bus.protocol_mut().state.set("target_temp_room", "21").unwrap();
    let before = bus.protocol().state.command_counter();
    bus.step().unwrap(); // consumes the queued 0xBA upload request
    assert_eq!(bus.protocol().state.command_counter(), before.wrapping_add(1) % 255);
}

#[test]
fn s5_upload_without_ingest_is_gated() {
    let mut chan = MockChannel::default();
    push_single(&mut chan, 0x3C, NODE_ADDRESS, 0xBA, &[]);
    let mut bus = Bus::new(chan, Mode::Active, true);
    bus.protocol_mut().state.set("target_temp_room", "21").unwrap();
    let before = bus.protocol().state.command_counter();
    bus.step().unwrap();
    assert_eq!(bus.protocol().state.command_counter(), before);
}

#[test]
fn s6_read_only_mode_ingests_but_never_writes() {
    let payload = status_push_payload();
    let mut chan = MockChannel::default();
    let frame_count = push_status_buffer(&mut chan, &payload, 0xBB);
    push_single(&mut chan, 0x3D, 0, 0, &[]);

    let mut bus = Bus::new(chan, Mode::ReadOnly, true);
    for _ in 0..frame_count + 1 {
        bus.step().unwrap();
    }
    assert_eq!(bus.protocol().state.snapshot()["target_temp_room"], "20");
}
