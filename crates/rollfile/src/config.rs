//! Writer configuration.
//!
//! A [`Config`] is assembled once, validated, and then shared read-only by the
//! writer, its rotation manager and its background finishers. It can be built
//! three ways:
//!
//! - builder methods on [`Config`] (`Config::new("/var/log/app", "app").with_compress(true)`)
//! - a sequence of [`WriterOption`] mutators applied to the defaults
//! - a JSON document (`Config::from_json_file`)

use crate::error::{WriterError, WriterResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default flush threshold for the buffered writer.
pub const DEFAULT_BUFFER_THRESHOLD: usize = 8 * 1024;

/// Default time tag appended to historical file names.
pub const DEFAULT_TIME_TAG_FORMAT: &str = "%Y%m%d%H%M%S";

/// Write strategy used by the writer returned from the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterMode {
    /// No synchronization. Safe for a single producer only.
    None,
    /// Every write and rotation runs under one mutex.
    #[default]
    Lock,
    /// Writes are queued and performed by a background thread.
    Async,
    /// Writes are batched in memory and flushed past a threshold.
    Buffer,
}

impl WriterMode {
    /// Returns the configuration name of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lock => "lock",
            Self::Async => "async",
            Self::Buffer => "buffer",
        }
    }
}

impl fmt::Display for WriterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriterMode {
    type Err = WriterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "lock" => Ok(Self::Lock),
            "async" => Ok(Self::Async),
            "buffer" => Ok(Self::Buffer),
            other => Err(WriterError::invalid_config(format!(
                "unknown writer mode: {other:?}"
            ))),
        }
    }
}

/// When the policy manager asks for a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// Never rotate on its own; only explicit triggers rotate.
    #[default]
    Never,
    /// Rotate at every [`RotationPeriod`] boundary.
    Time,
    /// Rotate once the active file reaches `rotation_size` bytes.
    Size,
}

/// Period boundary used by [`RotationPolicy::Time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPeriod {
    /// Start of every minute.
    Minutely,
    /// Start of every hour.
    Hourly,
    /// Local midnight.
    #[default]
    Daily,
}

/// Configuration for a rolling writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the active and historical files.
    pub log_path: PathBuf,

    /// Base name of the log file, without extension.
    pub file_name: String,

    /// Extension of the active file. Empty means no extension.
    pub file_extension: String,

    /// `chrono` format string used to tag historical files.
    pub time_tag_format: String,

    /// Which rotation policy the built-in manager evaluates.
    pub rotation_policy: RotationPolicy,

    /// Boundary for time based rotation.
    pub rotation_period: RotationPeriod,

    /// Threshold in bytes for size based rotation.
    ///
    /// JSON accepts either a number of bytes or a string such as `"64MB"`.
    #[serde(deserialize_with = "deserialize_size")]
    pub rotation_size: u64,

    /// How often, in milliseconds, size based rotation checks the file.
    pub size_check_interval_ms: u64,

    /// Gzip historical files after rotation.
    pub compress: bool,

    /// Number of historical files to keep (0 = keep everything).
    pub max_remain: usize,

    /// Write strategy.
    pub writer_mode: WriterMode,

    /// Buffered writer flush threshold in bytes.
    pub buffer_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("./log"),
            file_name: "log".to_string(),
            file_extension: "log".to_string(),
            time_tag_format: DEFAULT_TIME_TAG_FORMAT.to_string(),
            rotation_policy: RotationPolicy::Never,
            rotation_period: RotationPeriod::Daily,
            rotation_size: 64 * 1024 * 1024, // 64 MB
            size_check_interval_ms: 1000,
            compress: false,
            max_remain: 0, // keep everything
            writer_mode: WriterMode::Lock,
            buffer_threshold: DEFAULT_BUFFER_THRESHOLD,
        }
    }
}

impl Config {
    /// Creates a configuration for `<log_path>/<file_name>.log` with default values.
    #[must_use]
    pub fn new(log_path: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            log_path: log_path.into(),
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    /// Builds a configuration by applying `options` to the defaults, in order.
    #[must_use]
    pub fn from_options(options: impl IntoIterator<Item = WriterOption>) -> Self {
        let mut config = Self::default();
        for option in options {
            option.apply(&mut config);
        }
        config
    }

    /// Parses a JSON document. Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::ConfigParse`] if the JSON is malformed or holds
    /// an unknown writer mode or policy.
    pub fn from_json_str(json: &str) -> WriterResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> WriterResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks that the configuration can back a writer.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::InvalidConfig`] if:
    /// - `log_path` or `file_name` is empty
    /// - buffer mode is selected with a zero threshold
    /// - size rotation is selected with a zero size
    pub fn validate(&self) -> WriterResult<()> {
        if self.log_path.as_os_str().is_empty() {
            return Err(WriterError::invalid_config("log path is empty"));
        }
        if self.file_name.trim().is_empty() {
            return Err(WriterError::invalid_config("file name is empty"));
        }
        if self.writer_mode == WriterMode::Buffer && self.buffer_threshold == 0 {
            return Err(WriterError::invalid_config(
                "buffer threshold must be greater than zero",
            ));
        }
        if self.rotation_policy == RotationPolicy::Size && self.rotation_size == 0 {
            return Err(WriterError::invalid_config(
                "rotation size must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Returns true if historical files are subject to retention.
    #[must_use]
    pub const fn retention_enabled(&self) -> bool {
        self.max_remain > 0
    }

    /// Interval between size checks.
    #[must_use]
    pub const fn size_check_interval(&self) -> Duration {
        Duration::from_millis(self.size_check_interval_ms)
    }

    /// Sets the log directory.
    #[must_use]
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Sets the base file name.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Sets the file extension.
    #[must_use]
    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    /// Sets the time tag format of historical names.
    #[must_use]
    pub fn with_time_tag_format(mut self, format: impl Into<String>) -> Self {
        self.time_tag_format = format.into();
        self
    }

    /// Rotates at every `period` boundary.
    #[must_use]
    pub const fn with_time_rotation(mut self, period: RotationPeriod) -> Self {
        self.rotation_policy = RotationPolicy::Time;
        self.rotation_period = period;
        self
    }

    /// Rotates once the active file reaches `bytes`.
    #[must_use]
    pub const fn with_size_rotation(mut self, bytes: u64) -> Self {
        self.rotation_policy = RotationPolicy::Size;
        self.rotation_size = bytes;
        self
    }

    /// Sets how often size rotation checks the active file.
    #[must_use]
    pub const fn with_size_check_interval(mut self, interval: Duration) -> Self {
        self.size_check_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Enables or disables gzip compression of historical files.
    #[must_use]
    pub const fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Keeps at most `count` historical files (0 = unbounded).
    #[must_use]
    pub const fn with_max_remain(mut self, count: usize) -> Self {
        self.max_remain = count;
        self
    }

    /// Selects the write strategy.
    #[must_use]
    pub const fn with_writer_mode(mut self, mode: WriterMode) -> Self {
        self.writer_mode = mode;
        self
    }

    /// Sets the buffered writer flush threshold.
    #[must_use]
    pub const fn with_buffer_threshold(mut self, bytes: usize) -> Self {
        self.buffer_threshold = bytes;
        self
    }
}

/// A named mutation applied to a [`Config`].
///
/// Options are applied in order, so later options win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterOption {
    /// Sets [`Config::log_path`].
    LogPath(PathBuf),
    /// Sets [`Config::file_name`].
    FileName(String),
    /// Sets [`Config::file_extension`].
    FileExtension(String),
    /// Sets [`Config::time_tag_format`].
    TimeTagFormat(String),
    /// Rotates at every period boundary.
    TimeRotation(RotationPeriod),
    /// Rotates when the file reaches the given number of bytes.
    SizeRotation(u64),
    /// Sets how often size rotation checks the file.
    SizeCheckInterval(Duration),
    /// Enables compression of historical files.
    Compress,
    /// Sets [`Config::max_remain`].
    MaxRemain(usize),
    /// Sets [`Config::writer_mode`].
    Mode(WriterMode),
    /// Sets [`Config::buffer_threshold`].
    BufferThreshold(usize),
}

impl WriterOption {
    /// Applies this option to `config`.
    pub fn apply(self, config: &mut Config) {
        match self {
            Self::LogPath(path) => config.log_path = path,
            Self::FileName(name) => config.file_name = name,
            Self::FileExtension(ext) => config.file_extension = ext,
            Self::TimeTagFormat(format) => config.time_tag_format = format,
            Self::TimeRotation(period) => {
                config.rotation_policy = RotationPolicy::Time;
                config.rotation_period = period;
            }
            Self::SizeRotation(bytes) => {
                config.rotation_policy = RotationPolicy::Size;
                config.rotation_size = bytes;
            }
            Self::SizeCheckInterval(interval) => {
                config.size_check_interval_ms = interval.as_millis() as u64;
            }
            Self::Compress => config.compress = true,
            Self::MaxRemain(count) => config.max_remain = count,
            Self::Mode(mode) => config.writer_mode = mode,
            Self::BufferThreshold(bytes) => config.buffer_threshold = bytes,
        }
    }
}

/// Parses a human readable size such as `512`, `4KB`, `64mb` or `1G`.
///
/// Units are powers of 1024.
///
/// # Errors
///
/// Returns [`WriterError::InvalidConfig`] if the number or unit is not recognized.
pub fn parse_size(input: &str) -> WriterResult<u64> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| WriterError::invalid_config(format!("invalid size: {input:?}")))?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1024,
        "m" | "mb" => 1024 * 1024,
        "g" | "gb" => 1024 * 1024 * 1024,
        _ => {
            return Err(WriterError::invalid_config(format!(
                "invalid size unit: {input:?}"
            )))
        }
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| WriterError::invalid_config(format!("size overflows: {input:?}")))
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeRepr {
        Bytes(u64),
        Text(String),
    }

    match SizeRepr::deserialize(deserializer)? {
        SizeRepr::Bytes(bytes) => Ok(bytes),
        SizeRepr::Text(text) => parse_size(&text).map_err(serde::de::Error::custom),
    }
}
