//! Background completion of rotations.
//!
//! Every rotation hands the replaced file handle and the historical target to
//! a short-lived thread that:
//!
//! 1. waits until no writer still holds the old handle, then syncs and closes it
//! 2. gzips `<target>.tmp` into `target` when compression is enabled
//! 3. records `target` in the retention queue, evicting the oldest file
//!
//! Compression of consecutive rotations may finish out of order, so step 3 is
//! taken in rotation order using tickets.

use crate::compress;
use crate::config::Config;
use crate::retention::RetentionQueue;
use parking_lot::{Condvar, Mutex};
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Poll interval while waiting for in-flight writes on a replaced handle.
const RELEASE_POLL: Duration = Duration::from_millis(1);

pub(crate) struct Finisher {
    config: Arc<Config>,
    retention: Option<RetentionQueue>,
    next_ticket: AtomicU64,
    turn: Mutex<u64>,
    turn_changed: Condvar,
    running: Mutex<Vec<JoinHandle<()>>>,
}

impl Finisher {
    pub(crate) fn new(config: Arc<Config>) -> Self {
        let retention = config
            .retention_enabled()
            .then(|| RetentionQueue::new(config.max_remain));
        Self {
            config,
            retention,
            next_ticket: AtomicU64::new(0),
            turn: Mutex::new(0),
            turn_changed: Condvar::new(),
            running: Mutex::new(Vec::new()),
        }
    }

    /// Finishes a rotation in the background.
    ///
    /// Must be called in rotation order; callers hold the rotation lock.
    pub(crate) fn spawn(self: &Arc<Self>, old: Arc<File>, target: PathBuf) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::AcqRel);
        let this = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("rollfile-finisher".to_string())
            .spawn(move || this.finish(ticket, old, target));

        match spawned {
            Ok(handle) => {
                let mut running = self.running.lock();
                running.retain(|handle| !handle.is_finished());
                running.push(handle);
            }
            // The closure was dropped with the failed spawn; release the
            // ticket so later rotations are not blocked behind it.
            Err(err) => {
                error!(error = %err, "failed to spawn rotation finisher");
                self.advance_turn(ticket);
            }
        }
    }

    /// Blocks until every finisher spawned so far has completed.
    pub(crate) fn wait_idle(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.running.lock());
        for handle in handles {
            if handle.join().is_err() {
                error!("rotation finisher panicked");
            }
        }
    }

    /// Number of historical files currently retained.
    pub(crate) fn retained(&self) -> Option<usize> {
        self.retention.as_ref().map(RetentionQueue::len)
    }

    fn finish(&self, ticket: u64, old: Arc<File>, target: PathBuf) {
        let turn = TurnGuard {
            finisher: self,
            ticket,
        };

        release_handle(old);

        if self.config.compress {
            if let Err(err) = compress::compress_rotated(&target) {
                error!(path = %target.display(), error = %err, "failed to compress rotated file");
                return;
            }
            debug!(path = %target.display(), "compressed rotated file");
        }

        if let Some(retention) = &self.retention {
            turn.wait();
            let evicted = retention.push(target);
            if !evicted.is_empty() {
                debug!(count = evicted.len(), "retention evicted historical files");
            }
        }
    }

    fn wait_for_turn(&self, ticket: u64) {
        let mut turn = self.turn.lock();
        while *turn != ticket {
            self.turn_changed.wait(&mut turn);
        }
    }

    fn advance_turn(&self, ticket: u64) {
        let mut turn = self.turn.lock();
        // A ticket is released exactly once; earlier tickets may still be
        // running, so wait for them before passing the turn on.
        while *turn != ticket {
            self.turn_changed.wait(&mut turn);
        }
        *turn += 1;
        self.turn_changed.notify_all();
    }
}

/// Passes the retention turn on when a finisher ends, on every path.
struct TurnGuard<'a> {
    finisher: &'a Finisher,
    ticket: u64,
}

impl TurnGuard<'_> {
    fn wait(&self) {
        self.finisher.wait_for_turn(self.ticket);
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.finisher.advance_turn(self.ticket);
    }
}

/// Waits for the last in-flight writer to drop `file`, then syncs it.
fn release_handle(mut file: Arc<File>) {
    let file = loop {
        match Arc::try_unwrap(file) {
            Ok(file) => break file,
            Err(shared) => {
                file = shared;
                thread::sleep(RELEASE_POLL);
            }
        }
    };
    if let Err(err) = file.sync_all() {
        warn!(error = %err, "failed to sync rotated file");
    }
}
