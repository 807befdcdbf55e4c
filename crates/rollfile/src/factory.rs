//! Writer construction.

use crate::config::{Config, WriterMode, WriterOption};
use crate::error::WriterResult;
use crate::manager::{Manager, PolicyManager};
use crate::writer::{AsyncWriter, BufferedWriter, LockedWriter, RollingWriter, Writer};
use std::path::Path;
use std::sync::Arc;

/// Builds the writer selected by `config.writer_mode`, rotating according to
/// `config.rotation_policy`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, or the log directory or
/// active file cannot be created.
pub fn new_writer_from_config(config: Config) -> WriterResult<Box<dyn RollingWriter>> {
    config.validate()?;
    let config = Arc::new(config);
    let manager = PolicyManager::start(Arc::clone(&config))?;
    build(config, Box::new(manager))
}

/// Builds a writer from named options applied to the default configuration.
///
/// # Errors
///
/// See [`new_writer_from_config`].
pub fn new_writer(options: impl IntoIterator<Item = WriterOption>) -> WriterResult<Box<dyn RollingWriter>> {
    new_writer_from_config(Config::from_options(options))
}

/// Builds a writer from a JSON configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or for any reason
/// listed in [`new_writer_from_config`].
pub fn new_writer_from_config_file(path: &Path) -> WriterResult<Box<dyn RollingWriter>> {
    new_writer_from_config(Config::from_json_file(path)?)
}

/// Builds a writer whose rotations are driven by a caller-supplied manager.
///
/// # Errors
///
/// See [`new_writer_from_config`].
pub fn new_writer_with_manager(
    config: impl Into<Arc<Config>>,
    manager: Box<dyn Manager>,
) -> WriterResult<Box<dyn RollingWriter>> {
    build(config.into(), manager)
}

fn build(config: Arc<Config>, manager: Box<dyn Manager>) -> WriterResult<Box<dyn RollingWriter>> {
    let mode = config.writer_mode;
    let base = Writer::open(config, manager)?;
    let writer: Box<dyn RollingWriter> = match mode {
        WriterMode::None => Box::new(base),
        WriterMode::Lock => Box::new(LockedWriter::new(base)),
        WriterMode::Async => Box::new(AsyncWriter::new(base)?),
        WriterMode::Buffer => Box::new(BufferedWriter::new(base)),
    };
    Ok(writer)
}
