//! # rollfile
//!
//! Rotating file writer.
//!
//! This crate provides:
//! - Four write strategies (unsynchronized, locked, asynchronous, buffered)
//!   behind one [`RollingWriter`] trait
//! - Time and size based rotation with rename retries
//! - Bounded retention of historical files, oldest deleted first
//! - Background gzip compression of rotated files
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rollfile::{new_writer_from_config, Config, WriterMode};
//!
//! let config = Config::new("./log", "app")
//!     .with_writer_mode(WriterMode::Async)
//!     .with_max_remain(7)
//!     .with_compress(true);
//! let writer = new_writer_from_config(config)?;
//! writer.write(b"hello\n")?;
//! writer.close()?;
//! # Ok::<(), rollfile::WriterError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod compress;
pub mod config;
pub mod error;
pub mod factory;
mod finisher;
pub mod manager;
pub mod naming;
pub mod retention;
pub mod writer;

pub use compress::compress_rotated;
pub use config::{
    parse_size, Config, RotationPeriod, RotationPolicy, WriterMode, WriterOption,
    DEFAULT_BUFFER_THRESHOLD, DEFAULT_TIME_TAG_FORMAT,
};
pub use error::{WriterError, WriterResult};
pub use factory::{
    new_writer, new_writer_from_config, new_writer_from_config_file, new_writer_with_manager,
};
pub use manager::{Manager, ManualManager, PolicyManager, RotationTrigger};
pub use retention::RetentionQueue;
pub use writer::{
    AsyncWriter, BufferedWriter, LockedWriter, RollingWriter, Writer, CHUNK_SIZE, QUEUE_SIZE,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
