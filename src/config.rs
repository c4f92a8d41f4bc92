use crate::error::{Result, TsError};
use crate::format::ts::TS_PACKET_SIZE;
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest unit read from a capture file: ten TS packets.
pub const MIN_READ_UNIT: usize = TS_PACKET_SIZE * 10;
/// Size of one raw read from the capture file (~20KB).
pub const READ_BUFFER_SIZE: usize = MIN_READ_UNIT * 10;
/// Size of the circular buffer holding filtered stream data (~8MB).
pub const CIRCULAR_BUFFER_SIZE: usize = MIN_READ_UNIT * 4000;
/// Headroom the producer keeps free ahead of the slowest reader (~2MB).
pub const PADDING_SIZE: usize = MIN_READ_UNIT * 1000;
/// How long a reader waits without any write progress before giving up.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);
/// Producer back-off after a read from the source produced nothing.
pub const BUFFER_UNDERRUN_SLEEP: Duration = Duration::from_millis(10);
/// Directory scanned for capture files when nothing else is configured.
pub const DEFAULT_STREAM_DIR: &str = "./Streams";

const CONFIG_PATHS: [&str; 2] = ["./tsfile.toml", "./tsfile_config.toml"];

/// Configuration of a [`FileTsStreamer`](crate::tuner::FileTsStreamer).
#[derive(Debug, Clone)]
pub struct StreamerConfig {
    /// Directory holding the capture files used for scanning.
    pub stream_dir: PathBuf,
    /// Capacity of the circular buffer in bytes.
    pub circular_buffer_size: usize,
    /// Headroom kept free so a burst write never tramples unread data.
    pub padding_size: usize,
    /// Bytes read from the file per producer iteration.
    pub read_buffer_size: usize,
    /// Reader stall timeout.
    pub read_timeout: Duration,
    /// Producer sleep on buffer underrun.
    pub underrun_sleep: Duration,
    /// Also admit the DVB EIT and SDT PIDs.
    pub enable_dvb: bool,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            stream_dir: PathBuf::from(DEFAULT_STREAM_DIR),
            circular_buffer_size: CIRCULAR_BUFFER_SIZE,
            padding_size: PADDING_SIZE,
            read_buffer_size: READ_BUFFER_SIZE,
            read_timeout: READ_TIMEOUT,
            underrun_sleep: BUFFER_UNDERRUN_SLEEP,
            enable_dvb: false,
        }
    }
}

impl StreamerConfig {
    /// Creates a configuration with the default sizing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the defaults, then applies environment variables and finally the
    /// first config file found in the working directory.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = env::var("TSFILE_STREAM_DIR") {
            config.stream_dir = PathBuf::from(dir);
        }
        if let Ok(value) = env::var("TSFILE_ENABLE_DVB") {
            config.apply("enable_dvb", &value);
        }
        if let Ok(value) = env::var("TSFILE_READ_TIMEOUT_MS") {
            config.apply("read_timeout_ms", &value);
        }

        for path in &CONFIG_PATHS {
            if let Ok(mut file) = File::open(path) {
                let mut content = String::new();
                if file.read_to_string(&mut content).is_ok() {
                    config.apply_file(&content);
                    break;
                }
            }
        }

        config
    }

    /// Applies `key = value` lines; unknown keys and comments are ignored.
    pub fn apply_file(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = parse_value(value);
                if !value.is_empty() {
                    self.apply(key.trim(), value);
                }
            }
        }
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "stream_dir" => self.stream_dir = PathBuf::from(value),
            "enable_dvb" => self.enable_dvb = matches!(value, "1" | "true" | "yes"),
            "read_timeout_ms" => {
                if let Ok(ms) = value.parse() {
                    self.read_timeout = Duration::from_millis(ms);
                }
            }
            "circular_buffer_size" => {
                if let Ok(size) = value.parse() {
                    self.circular_buffer_size = size;
                }
            }
            "padding_size" => {
                if let Ok(size) = value.parse() {
                    self.padding_size = size;
                }
            }
            _ => log::debug!("Ignoring unknown config key {}", key),
        }
    }

    /// Sets the directory scanned for capture files.
    pub fn with_stream_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stream_dir = dir.into();
        self
    }

    /// Sets the circular buffer capacity and padding.
    pub fn with_buffer_sizes(mut self, capacity: usize, padding: usize) -> Self {
        self.circular_buffer_size = capacity;
        self.padding_size = padding;
        self
    }

    /// Sets the size of each raw file read.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Sets the reader stall timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the producer underrun sleep.
    pub fn with_underrun_sleep(mut self, sleep: Duration) -> Self {
        self.underrun_sleep = sleep;
        self
    }

    /// Enables or disables the DVB table PIDs.
    pub fn with_dvb(mut self, enable: bool) -> Self {
        self.enable_dvb = enable;
        self
    }

    /// Checks that the sizing can actually stream.
    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 || self.read_buffer_size % TS_PACKET_SIZE != 0 {
            return Err(TsError::InvalidRequest(format!(
                "read buffer size {} is not a positive multiple of {}",
                self.read_buffer_size, TS_PACKET_SIZE
            )));
        }
        if self.padding_size >= self.circular_buffer_size {
            return Err(TsError::InvalidRequest(format!(
                "padding {} must be smaller than the buffer capacity {}",
                self.padding_size, self.circular_buffer_size
            )));
        }
        if self.read_buffer_size > self.padding_size {
            return Err(TsError::InvalidRequest(format!(
                "read buffer size {} exceeds the padding {}",
                self.read_buffer_size, self.padding_size
            )));
        }
        Ok(())
    }

    /// Resolves a capture file name against the stream directory.
    pub fn stream_file(&self, filename: &str) -> PathBuf {
        self.stream_dir.join(filename)
    }
}

/// Strips quotes from a value, or a trailing `# comment` from a bare one.
fn parse_value(raw: &str) -> &str {
    let raw = raw.trim();
    for quote in ['"', '\''] {
        if let Some(rest) = raw.strip_prefix(quote) {
            return match rest.find(quote) {
                Some(end) => &rest[..end],
                None => rest,
            };
        }
    }
    match raw.find('#') {
        Some(start) => raw[..start].trim_end(),
        None => raw,
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# tsfile configuration
# Directory holding MPEG-2 TS capture files
stream_dir = "./Streams"

# Admit DVB EIT/SDT tables in addition to PAT and ATSC PSIP
enable_dvb = false

# Reader stall timeout in milliseconds
read_timeout_ms = 10000
"#;
        std::fs::write(path, template)?;
    }
    Ok(())
}
