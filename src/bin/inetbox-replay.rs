/*! Replays a captured LIN log file through the bus loop in read-only
mode, for offline debugging (§6).

Log format: one frame per line, whitespace-separated hex bytes. The
data bytes of each line are selected by `[first:last]` (Python-style
slice indices, negative counting from the end; `1` and `-2` by
default) before `00 55` is prepended and the result fed to the bus.
*/
use std::collections::VecDeque;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use inetbox_lin::bus::{Bus, Mode};
use inetbox_lin::serial::SerialChannel;

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Opt {
    /// Log file to replay.
    log_file: PathBuf,

    /// First index (Python-style, negative counts from the end) of the
    /// data-byte slice within each line.
    #[arg(long, default_value = "1", allow_hyphen_values = true)]
    first: isize,

    /// Last index (exclusive, Python-style) of the data-byte slice.
    #[arg(long, default_value = "-2", allow_hyphen_values = true)]
    last: isize,

    /// Verbosity, repeatable.
    #[arg(short = 'v', default_value = "0")]
    verbose: usize,
}

fn resolve_index(i: isize, len: usize) -> usize {
    if i < 0 {
        len.saturating_sub((-i) as usize)
    } else {
        (i as usize).min(len)
    }
}

fn parse_line(line: &str, first: isize, last: isize) -> Result<Vec<u8>> {
    let tokens: Vec<u8> = line
        .split_whitespace()
        .map(|tok| u8::from_str_radix(tok, 16).with_context(|| format!("invalid hex byte {tok:?}")))
        .collect::<Result<_>>()?;
    let start = resolve_index(first, tokens.len());
    let end = resolve_index(last, tokens.len());
    if start > end {
        bail!("slice [{first}:{last}] is empty for a {}-byte line", tokens.len());
    }
    Ok(tokens[start..end].to_vec())
}

struct MemoryChannel {
    inbound: VecDeque<u8>,
}

impl SerialChannel for MemoryChannel {
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.inbound.len() < buf.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "end of replay log"));
        }
        for slot in buf {
            *slot = self.inbound.pop_front().unwrap();
        }
        Ok(())
    }

    fn write_all(&mut self, _buf: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn flush_input(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}

fn load(path: &std::path::Path, first: isize, last: isize) -> Result<MemoryChannel> {
    let mut text = String::new();
    std::fs::File::open(path)
        .with_context(|| format!("opening replay log {}", path.display()))?
        .read_to_string(&mut text)?;

    let mut inbound = VecDeque::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let data = parse_line(line, first, last)?;
        inbound.push_back(0x00);
        inbound.push_back(0x55);
        inbound.extend(data);
    }
    Ok(MemoryChannel { inbound })
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    stderrlog::new()
        .module(module_path!())
        .module("inetbox_lin")
        .quiet(false)
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    let channel = load(&opt.log_file, opt.first, opt.last)?;
    let mut bus = Bus::new(channel, Mode::ReadOnly, true);
    loop {
        if let Err(e) = bus.step() {
            log::debug!("stopping replay: {e}");
            break;
        }
    }

    let snapshot = bus.protocol().state.snapshot();
    for (field, value) in &snapshot {
        println!("{field} = {value}");
    }
    Ok(())
}
