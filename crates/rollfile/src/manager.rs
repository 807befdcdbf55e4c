//! Rotation signal sources.
//!
//! A [`Manager`] decides *when* a writer rotates and *what* the historical
//! file is called. It publishes the target path on a channel; writers only
//! ever poll that channel with a non-blocking `try_recv` before a write.
//!
//! - [`ManualManager`] rotates only when asked through a [`RotationTrigger`].
//! - [`PolicyManager`] evaluates [`RotationPolicy`] on a background thread.
//!
//! Signals are never queued behind each other: a manager drops a new signal
//! while one is still pending, so one pending signal means one rotation.

use crate::config::{Config, RotationPeriod, RotationPolicy};
use crate::error::{WriterError, WriterResult};
use crate::naming;
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Timelike};
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

/// Capacity of the rotation signal channel.
const SIGNAL_CAPACITY: usize = 1;

/// A source of rotation signals.
///
/// The writer keeps the manager alive for its own lifetime and reads
/// rotation targets from [`Manager::fire`].
pub trait Manager: Send + Sync {
    /// Returns the receiving end of the rotation signal channel.
    fn fire(&self) -> Receiver<PathBuf>;
}

/// A cloneable handle that requests rotations.
#[derive(Debug, Clone)]
pub struct RotationTrigger {
    tx: Sender<PathBuf>,
    config: Arc<Config>,
}

impl RotationTrigger {
    /// Requests a rotation to `target`.
    ///
    /// Returns false if a rotation is already pending or the writer is gone.
    pub fn rotate_to(&self, target: impl Into<PathBuf>) -> bool {
        send_signal(&self.tx, target.into())
    }

    /// Requests a rotation to a time-tagged historical name.
    pub fn rotate_now(&self) -> bool {
        self.rotate_to(naming::historical_path(&self.config, &Local::now()))
    }
}

/// A manager that rotates only on request.
///
/// Useful for external triggers such as `SIGHUP` handlers or `logrotate`
/// style tooling.
#[derive(Debug)]
pub struct ManualManager {
    trigger: RotationTrigger,
    rx: Receiver<PathBuf>,
}

impl ManualManager {
    /// Creates a manual manager naming files after `config`.
    pub fn new(config: Arc<Config>) -> Self {
        let (tx, rx) = bounded(SIGNAL_CAPACITY);
        Self {
            trigger: RotationTrigger { tx, config },
            rx,
        }
    }

    /// Returns a handle that can request rotations after the manager has
    /// been handed to a writer.
    #[must_use]
    pub fn trigger(&self) -> RotationTrigger {
        self.trigger.clone()
    }
}

impl Manager for ManualManager {
    fn fire(&self) -> Receiver<PathBuf> {
        self.rx.clone()
    }
}

/// A manager that evaluates the configured [`RotationPolicy`].
///
/// Time and size policies run on a dedicated thread that stops when the
/// manager is dropped.
pub struct PolicyManager {
    rx: Receiver<PathBuf>,
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PolicyManager {
    /// Starts evaluating `config.rotation_policy`.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy thread cannot be spawned.
    pub fn start(config: Arc<Config>) -> WriterResult<Self> {
        let (tx, rx) = bounded(SIGNAL_CAPACITY);
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let thread = match config.rotation_policy {
            RotationPolicy::Never => None,
            RotationPolicy::Time => Some(spawn_policy("rollfile-time-policy", move || {
                run_time_policy(&config, &tx, &stop_rx)
            })?),
            RotationPolicy::Size => Some(spawn_policy("rollfile-size-policy", move || {
                run_size_policy(&config, &tx, &stop_rx)
            })?),
        };

        Ok(Self {
            rx,
            stop: Some(stop_tx),
            thread,
        })
    }
}

impl Manager for PolicyManager {
    fn fire(&self) -> Receiver<PathBuf> {
        self.rx.clone()
    }
}

impl Drop for PolicyManager {
    fn drop(&mut self) {
        // Disconnecting the stop channel wakes the policy thread.
        drop(self.stop.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("rotation policy thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for PolicyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyManager")
            .field("running", &self.thread.is_some())
            .finish_non_exhaustive()
    }
}

fn spawn_policy<F>(name: &str, body: F) -> WriterResult<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(WriterError::from)
}

fn send_signal(tx: &Sender<PathBuf>, target: PathBuf) -> bool {
    match tx.try_send(target) {
        Ok(()) => true,
        Err(TrySendError::Full(target)) => {
            debug!(target = %target.display(), "rotation already pending, signal dropped");
            false
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

fn run_time_policy(config: &Config, tx: &Sender<PathBuf>, stop: &Receiver<()>) {
    let period = config.rotation_period;
    let now = Local::now();

    // A file left over from an earlier period is rotated straight away,
    // tagged with the period it was last written in.
    if let Some(modified) = active_modified(config) {
        if period_start(&modified, period) < period_start(&now, period) {
            debug!("active file predates the current period, rotating at startup");
            let tag = start_of_period(&modified, period);
            send_signal(tx, naming::historical_path(config, &tag));
        }
    }

    let mut clock = PeriodClock::new(&now, period);
    loop {
        let wait = (clock.boundary.clone() - Local::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        select! {
            recv(stop) -> _ => return,
            default(wait) => {
                if Local::now() < clock.boundary {
                    continue;
                }
                debug!(period = ?period, "rotation period elapsed");
                let ended = clock.advance();
                send_signal(tx, naming::historical_path(config, &ended));
            }
        }
    }
}

/// The period being written and the boundary that ends it.
struct PeriodClock<Tz: TimeZone> {
    period: RotationPeriod,
    began: DateTime<Tz>,
    boundary: DateTime<Tz>,
}

impl<Tz: TimeZone> PeriodClock<Tz> {
    fn new(now: &DateTime<Tz>, period: RotationPeriod) -> Self {
        Self {
            period,
            began: start_of_period(now, period),
            boundary: next_boundary(now, period),
        }
    }

    /// Moves on to the next period and returns the start of the one that
    /// ended, which is what its file is tagged with.
    fn advance(&mut self) -> DateTime<Tz> {
        let next = next_boundary(&self.boundary, self.period);
        let ended = std::mem::replace(&mut self.began, self.boundary.clone());
        self.boundary = next;
        ended
    }
}

fn run_size_policy(config: &Config, tx: &Sender<PathBuf>, stop: &Receiver<()>) {
    let path = naming::active_path(config);
    let interval = config.size_check_interval().max(Duration::from_millis(1));

    loop {
        select! {
            recv(stop) -> _ => return,
            default(interval) => {
                let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                if size >= config.rotation_size {
                    debug!(size, limit = config.rotation_size, "active file reached rotation size");
                    send_signal(tx, naming::historical_path(config, &Local::now()));
                }
            }
        }
    }
}

fn active_modified(config: &Config) -> Option<DateTime<Local>> {
    let modified = std::fs::metadata(naming::active_path(config))
        .and_then(|m| m.modified())
        .ok()?;
    Some(DateTime::<Local>::from(modified))
}

/// Start of the period containing `at`, in local wall-clock terms.
fn period_start<Tz: TimeZone>(at: &DateTime<Tz>, period: RotationPeriod) -> NaiveDateTime {
    let naive = at.naive_local();
    let start = match period {
        RotationPeriod::Minutely => naive.date().and_hms_opt(naive.hour(), naive.minute(), 0),
        RotationPeriod::Hourly => naive.date().and_hms_opt(naive.hour(), 0, 0),
        RotationPeriod::Daily => naive.date().and_hms_opt(0, 0, 0),
    };
    start.unwrap_or(naive)
}

/// Start of the period containing `at`, in `at`'s time zone.
fn start_of_period<Tz: TimeZone>(at: &DateTime<Tz>, period: RotationPeriod) -> DateTime<Tz> {
    at.timezone()
        .from_local_datetime(&period_start(at, period))
        .earliest()
        .unwrap_or_else(|| at.clone())
}

fn period_length(period: RotationPeriod) -> TimeDelta {
    match period {
        RotationPeriod::Minutely => TimeDelta::minutes(1),
        RotationPeriod::Hourly => TimeDelta::hours(1),
        RotationPeriod::Daily => TimeDelta::days(1),
    }
}

/// First period boundary strictly after `at`.
fn next_boundary<Tz: TimeZone>(at: &DateTime<Tz>, period: RotationPeriod) -> DateTime<Tz> {
    let step = period_length(period);
    let next = period_start(at, period) + step;
    at.timezone()
        .from_local_datetime(&next)
        .earliest()
        .unwrap_or_else(|| at.clone() + step)
}
