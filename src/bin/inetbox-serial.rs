/*! Runs the LIN slave engine against a real serial transceiver,
impersonating a Truma iNet Box accessory in active mode.
*/
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use inetbox_lin::bus::{Bus, Mode};
use inetbox_lin::config::{Config, Opt};
use inetbox_lin::serial::PortChannel;

fn init_logging(opt: &Opt, config: &Config) -> Result<()> {
    stderrlog::new()
        .module(module_path!())
        .module("inetbox_lin")
        .quiet(false)
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    if let Some(dir) = &config.log_dir {
        flexi_logger::Logger::try_with_str("info")?
            .log_to_file(flexi_logger::FileSpec::default().directory(dir))
            .rotate(
                flexi_logger::Criterion::Age(flexi_logger::Age::Day),
                flexi_logger::Naming::Timestamps,
                flexi_logger::Cleanup::KeepLogFiles(7),
            )
            .start()?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let config = Config::from_args(&opt);
    init_logging(&opt, &config)?;

    log::info!("opening {} at {} baud", config.serial_device.display(), config.baud_rate);
    let port = serialport::new(config.serial_device.to_string_lossy(), config.baud_rate)
        .timeout(config.read_timeout)
        .open()
        .with_context(|| format!("opening serial device {}", config.serial_device.display()))?;
    let channel = PortChannel::new(port);

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        log::info!("received interrupt, shutting down");
        handler_flag.store(false, Ordering::SeqCst);
    })
    .context("installing Ctrl-C handler")?;

    let mut bus = Bus::new(channel, Mode::Active, config.strict_status_checksum);
    while running.load(Ordering::SeqCst) {
        if let Err(e) = bus.step() {
            if inetbox_lin::bus::is_fatal(&e) {
                log::error!("fatal protocol error: {e}");
                return Err(e.into());
            }
            log::warn!("recoverable error: {e}");
            std::thread::sleep(Duration::from_millis(10));
        }
    }
    Ok(())
}
