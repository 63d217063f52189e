//! Runtime configuration (A2): defaults overridden by environment
//! variables, themselves overridden by explicit CLI flags, mirroring
//! the original daemon's `service_config.get(key, environ.get(...))`
//! fallback chain.

use std::path::PathBuf;
use std::time::Duration;

/// Serial device, timing, and default-state configuration shared by
/// both CLI binaries.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the serial device, e.g. `/dev/ttyUSB0`.
    pub serial_device: PathBuf,
    /// Baud rate for the LIN transceiver link.
    pub baud_rate: u32,
    /// Per-byte read timeout.
    pub read_timeout: Duration,
    /// Directory to write rotating daily logs to, if any.
    pub log_dir: Option<PathBuf>,
    /// Heating mode assumed before the first status record arrives.
    pub default_heating_mode: u8,
    /// Target room temperature (degrees Celsius) assumed at startup.
    pub default_target_temp_room: i64,
    /// How long pending `set()` calls are coalesced before the first
    /// eligible upload request packs them.
    pub update_coalescing_interval: Duration,
    /// Verify the status-buffer inner checksum on ingest instead of
    /// the original firmware's lenient (unverified) behavior.
    pub strict_status_checksum: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_device: PathBuf::from("/dev/ttyUSB0"),
            baud_rate: 9600,
            read_timeout: Duration::from_millis(500),
            log_dir: None,
            default_heating_mode: 0,
            default_target_temp_room: 20,
            update_coalescing_interval: Duration::from_secs(2),
            strict_status_checksum: true,
        }
    }
}

/// CLI flags shared by both binaries, parsed with `clap`.
#[derive(clap::Parser, Debug)]
#[command(version, about)]
pub struct Opt {
    /// Serial device path.
    #[arg(long, short = 'd')]
    pub device: Option<PathBuf>,

    /// Baud rate.
    #[arg(long)]
    pub baud: Option<u32>,

    /// Per-byte read timeout, in milliseconds.
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,

    /// Directory to write rotating daily logs to.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Verbosity, repeatable (`-v`, `-vv`, ...).
    #[arg(short = 'v', default_value = "0")]
    pub verbose: usize,

    /// Disable status-buffer checksum verification on ingest.
    #[arg(long)]
    pub lenient_checksum: bool,
}

impl Config {
    /// Builds a config from defaults, environment variables, then CLI
    /// flags, in that precedence order (later wins).
    pub fn from_args(opt: &Opt) -> Self {
        let mut config = Self::default().with_env_overrides();

        if let Some(device) = &opt.device {
            config.serial_device = device.clone();
        }
        if let Some(baud) = opt.baud {
            config.baud_rate = baud;
        }
        if let Some(ms) = opt.read_timeout_ms {
            config.read_timeout = Duration::from_millis(ms);
        }
        if opt.log_dir.is_some() {
            config.log_dir = opt.log_dir.clone();
        }
        if opt.lenient_checksum {
            config.strict_status_checksum = false;
        }
        config
    }

    /// Applies `INETBOX_*` environment variable overrides on top of the
    /// built-in defaults.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("INETBOX_SERIAL_DEVICE") {
            self.serial_device = PathBuf::from(device);
        }
        if let Ok(baud) = std::env::var("INETBOX_BAUD_RATE") {
            if let Ok(baud) = baud.parse() {
                self.baud_rate = baud;
            }
        }
        if let Ok(ms) = std::env::var("INETBOX_READ_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                self.read_timeout = Duration::from_millis(ms);
            }
        }
        if let Ok(dir) = std::env::var("INETBOX_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Ok(mode) = std::env::var("INETBOX_DEFAULT_HEATING_MODE") {
            if let Ok(mode) = mode.parse() {
                self.default_heating_mode = mode;
            }
        }
        if let Ok(strict) = std::env::var("INETBOX_STRICT_STATUS_CHECKSUM") {
            self.strict_status_checksum = strict != "0" && !strict.eq_ignore_ascii_case("false");
        }
        self
    }
}
