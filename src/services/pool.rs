//! Fixed-size worker pool for file-counting jobs.
//!
//! Workers consume a shared bounded channel until it is closed or the
//! cancellation flag fires. Enqueueing is strictly non-blocking: a full
//! channel hands the job back so the walker can run it inline instead of
//! stalling.

use crate::services::repo::Tally;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Capacity of the file-work channel.
pub(crate) const QUEUE_CAPACITY: usize = 100;

/// One file to count and merge into the shared tally.
#[derive(Debug)]
pub(crate) struct FileJob {
    pub path: PathBuf,
}

pub(crate) struct WorkerPool {
    tx: Sender<FileJob>,
    cancel: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `workers` threads consuming from a channel of `capacity`.
    pub fn spawn(workers: usize, capacity: usize, tally: Arc<Tally>) -> Self {
        let (tx, rx) = bounded::<FileJob>(capacity);
        let cancel = Arc::new(AtomicBool::new(false));

        let handles = (0..workers)
            .map(|_| {
                let rx = rx.clone();
                let cancel = Arc::clone(&cancel);
                let tally = Arc::clone(&tally);
                std::thread::spawn(move || worker_loop(&rx, &cancel, &tally))
            })
            .collect();

        Self {
            tx,
            cancel,
            handles,
        }
    }

    /// Non-blocking enqueue. A full or closed channel returns the job to
    /// the caller for inline processing.
    pub fn try_dispatch(&self, job: FileJob) -> Result<(), FileJob> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job) | TrySendError::Disconnected(job)) => Err(job),
        }
    }

    /// Tells workers to exit at the next loop head, without draining.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Closes the channel and waits for the workers to drain and exit.
    pub fn join(self) {
        drop(self.tx);

        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(rx: &Receiver<FileJob>, cancel: &AtomicBool, tally: &Tally) {
    while let Ok(job) = rx.recv() {
        if cancel.load(Ordering::Relaxed) {
            return;
        }

        tally.count_file(&job.path);
    }
}
