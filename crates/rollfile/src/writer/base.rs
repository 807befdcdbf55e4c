//! Base writer and rotation protocol.

use super::RollingWriter;
use crate::config::{Config, WriterMode};
use crate::error::{WriterError, WriterResult};
use crate::finisher::Finisher;
use crate::manager::Manager;
use crate::naming;
use arc_swap::ArcSwapOption;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Immediate rename attempts before the delayed retry.
const RENAME_ATTEMPTS: usize = 3;

/// Delay before the last rename attempt.
const RENAME_RETRY_DELAY: Duration = Duration::from_millis(10);

/// The unsynchronized rolling writer, and the base of every other strategy.
///
/// Rotation replaces the active handle atomically, so concurrent writes never
/// observe a torn handle, but concurrent callers get no ordering guarantee
/// between each other. Use it from a single producer.
///
/// # Rotation
///
/// When the manager publishes a target name, the next write:
///
/// 1. renames the active file to the target (or `<target>.tmp` when
///    compressing), retrying briefly on failure
/// 2. opens a fresh active file and publishes it
/// 3. hands the old handle to a background finisher for compression and
///    retention
///
/// Rotation problems never fail a write:
///
/// - a failed rename is logged and writing continues on the active file
/// - if the fresh file cannot be opened, the renamed file is moved back
/// - if that fails too, writes go to the renamed file until a later write
///   manages to open the active file again, at which point the renamed file
///   is finished like any other rotation
pub struct Writer {
    config: Arc<Config>,
    abs_path: PathBuf,
    /// Empty once the writer is closed.
    file: ArcSwapOption<File>,
    fire: Receiver<PathBuf>,
    finisher: Arc<Finisher>,
    /// Serializes rotation and close. Never taken on the write path.
    ///
    /// Holds the target of a rotation whose file is still the current
    /// handle because the active file could not be reopened.
    rotation: Mutex<Option<PathBuf>>,
    /// Set while a stranded rotation waits for the next write to retry.
    recovery_due: AtomicBool,
    open_file: fn(&Path) -> io::Result<File>,
    _manager: Box<dyn Manager>,
}

/// Work a write must do before delivering its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rotation {
    /// Rotate the active file to the target.
    To(PathBuf),
    /// Retry opening the active file after a failed rotation.
    Recover,
}

impl Writer {
    /// Opens the active file described by `config` and starts listening to
    /// `manager` for rotations.
    ///
    /// The log directory is created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the directory or
    /// file cannot be created.
    pub fn open(config: Arc<Config>, manager: Box<dyn Manager>) -> WriterResult<Self> {
        config.validate()?;
        fs::create_dir_all(&config.log_path)?;

        let abs_path = naming::active_path(&config);
        let file = open_log_file(&abs_path)?;

        Ok(Self {
            fire: manager.fire(),
            finisher: Arc::new(Finisher::new(Arc::clone(&config))),
            abs_path,
            file: ArcSwapOption::from_pointee(file),
            rotation: Mutex::new(None),
            recovery_due: AtomicBool::new(false),
            open_file: open_log_file,
            config,
            _manager: manager,
        })
    }

    /// Configuration this writer was built from.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns true once the handle has been released by `close`.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.file.load().is_none()
    }

    /// Number of historical files held by retention, if retention is enabled.
    #[must_use]
    pub fn retained_files(&self) -> Option<usize> {
        self.finisher.retained()
    }

    /// Takes a pending rotation signal, or a due recovery, without blocking.
    pub(crate) fn poll_rotation(&self) -> Option<Rotation> {
        if let Ok(target) = self.fire.try_recv() {
            return Some(Rotation::To(target));
        }
        (self.recovery_due.load(Ordering::Relaxed)
            && self.recovery_due.swap(false, Ordering::AcqRel))
        .then_some(Rotation::Recover)
    }

    /// Performs the work returned by [`Writer::poll_rotation`].
    pub(crate) fn rotate(&self, rotation: Rotation) -> WriterResult<()> {
        match rotation {
            Rotation::To(target) => self.reopen(target),
            Rotation::Recover => {
                let mut stranded = self.rotation.lock();
                if self.is_closed() {
                    return Err(WriterError::Closed);
                }
                self.recover(&mut stranded);
                Ok(())
            }
        }
    }

    /// Rotates the active file to `target`.
    ///
    /// Only a closed writer makes this fail; rename and open failures are
    /// logged and leave a writable handle in place. While an earlier rotation
    /// is stranded, the request is folded into recovering it.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Closed`] if the writer has been closed.
    pub fn reopen(&self, target: PathBuf) -> WriterResult<()> {
        let mut stranded = self.rotation.lock();
        if self.is_closed() {
            return Err(WriterError::Closed);
        }
        if stranded.is_some() {
            self.recover(&mut stranded);
            return Ok(());
        }

        let target = naming::unique_target(&target);
        let renamed = if self.config.compress {
            naming::tmp_path(&target)
        } else {
            target.clone()
        };

        if let Err(err) = rename_with_retry(&self.abs_path, &renamed) {
            warn!(
                from = %self.abs_path.display(),
                to = %renamed.display(),
                error = %err,
                "rotation rename failed, continuing with the active file"
            );
            return Ok(());
        }

        let fresh = match (self.open_file)(&self.abs_path) {
            Ok(file) => file,
            Err(err) => {
                self.undo_rename(&renamed, target, &mut stranded, &err);
                return Ok(());
            }
        };

        if let Some(old) = self.file.swap(Some(Arc::new(fresh))) {
            self.finisher.spawn(old, target.clone());
        }
        debug!(target = %target.display(), "rotated log file");
        Ok(())
    }

    /// Moves the renamed file back after the fresh file failed to open.
    ///
    /// If it cannot be moved back, the rotation is left stranded: the current
    /// handle keeps writing to the renamed file and the next write retries.
    fn undo_rename(
        &self,
        renamed: &Path,
        target: PathBuf,
        stranded: &mut Option<PathBuf>,
        open_err: &io::Error,
    ) {
        match rename_with_retry(renamed, &self.abs_path) {
            Ok(()) => error!(
                path = %self.abs_path.display(),
                error = %open_err,
                "failed to open new log file after rotation, rotation skipped"
            ),
            Err(err) => {
                error!(
                    path = %self.abs_path.display(),
                    renamed = %renamed.display(),
                    open_error = %open_err,
                    error = %err,
                    "failed to open new log file and to restore the old one, writing to the renamed file"
                );
                *stranded = Some(target);
                self.recovery_due.store(true, Ordering::Release);
            }
        }
    }

    /// Opens the active file again and finishes the stranded rotation.
    fn recover(&self, stranded: &mut Option<PathBuf>) {
        let Some(target) = stranded.take() else {
            return;
        };

        match (self.open_file)(&self.abs_path) {
            Ok(fresh) => {
                if let Some(old) = self.file.swap(Some(Arc::new(fresh))) {
                    self.finisher.spawn(old, target.clone());
                }
                debug!(target = %target.display(), "recovered active log file");
            }
            Err(err) => {
                warn!(
                    path = %self.abs_path.display(),
                    error = %err,
                    "active log file still cannot be opened"
                );
                *stranded = Some(target);
                self.recovery_due.store(true, Ordering::Release);
            }
        }
    }

    /// Writes `buf` to the current handle.
    pub(crate) fn write_current(&self, buf: &[u8]) -> WriterResult<usize> {
        let current = self.file.load();
        match current.as_deref() {
            Some(mut file) => {
                file.write_all(buf)?;
                Ok(buf.len())
            }
            None => Err(WriterError::Closed),
        }
    }

    /// Releases the handle and waits for pending finishers.
    ///
    /// A stranded rotation is finished with the released handle.
    pub(crate) fn close_handle(&self) -> WriterResult<()> {
        let released = {
            let mut stranded = self.rotation.lock();
            let file = self.file.swap(None).ok_or(WriterError::Closed)?;
            match stranded.take() {
                Some(target) => {
                    self.finisher.spawn(file, target);
                    None
                }
                None => Some(file),
            }
        };

        let synced = released.map_or(Ok(()), |file| file.sync_all());
        self.finisher.wait_idle();
        synced.map_err(WriterError::from)
    }
}

impl RollingWriter for Writer {
    fn write(&self, buf: &[u8]) -> WriterResult<usize> {
        if let Some(rotation) = self.poll_rotation() {
            self.rotate(rotation)?;
        }
        self.write_current(buf)
    }

    fn flush(&self) -> WriterResult<()> {
        if self.is_closed() {
            return Err(WriterError::Closed);
        }
        Ok(())
    }

    fn close(&self) -> WriterResult<()> {
        self.close_handle()
    }

    fn mode(&self) -> WriterMode {
        WriterMode::None
    }

    fn path(&self) -> &Path {
        &self.abs_path
    }
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("path", &self.abs_path)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Opens `path` for appending, creating it if needed.
fn open_log_file(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(path)
}

/// Renames `from` to `to`, absorbing short-lived contention on the file.
fn rename_with_retry(from: &Path, to: &Path) -> io::Result<()> {
    for _ in 0..RENAME_ATTEMPTS {
        if fs::rename(from, to).is_ok() {
            return Ok(());
        }
    }
    thread::sleep(RENAME_RETRY_DELAY);
    fs::rename(from, to)
}
