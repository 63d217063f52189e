#![warn(missing_docs)]
/*! A LIN slave protocol engine that impersonates a Truma iNet Box
accessory on a Truma CP Plus control panel's LIN bus.

The CP Plus polls its accessories on a fixed schedule and only keeps
talking to ones that answer the way it expects. This crate implements
that side of the conversation: frame-level codec, diagnostic transport
reassembly, the vendor's status-buffer record layout, and the
request/response state machine that decides when to stay quiet and
when to push a write.

# Architecture overview

Each layer only knows about the one below it:

```text
  [ bus ]        reads/writes raw bytes, drives step()
     |
  [ protocol ]   PID dispatch, transport reassembly, response queue
     |
  [ state ]      last_status / pending_updates / send gating
     |
  [ record ]     status-buffer field schemas, pack/unpack
     |
  [ conversions ]  field <-> human-readable string
     |
  [ transport ]  single/first/consecutive diagnostic framing
     |
  [ frame ]      sync, PID parity, checksum
```

`display` sits beside `record`: it decodes the three read-only live
telemetry frames (`0x20`/`0x21`/`0x22`) that never go through the
diagnostic transport at all.

`serial` abstracts the byte stream `bus` runs on, so the same engine
drives a real transceiver (`bin/inetbox-serial`) or replays a captured
log (`bin/inetbox-replay`).
*/

pub mod bus;
pub mod config;
pub mod conversions;
pub mod display;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod record;
pub mod serial;
pub mod state;
pub mod transport;

pub use bus::{Bus, Mode};
pub use error::{CoreError, Result};
pub use protocol::Protocol;
