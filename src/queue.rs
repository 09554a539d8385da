//! Task queue: single-writer scheduler with disk-quota admission control.
//!
//! Submissions are cached under a TTL and fed through a bounded channel to
//! exactly one processor task, which serializes every clone-and-analysis.
//! Confining the budget mutations to that one writer is what keeps the
//! disk accounting sound without a lock around the budget fields; reads
//! from other tasks are advisory only.

use crate::clone::CloneDriver;
use crate::config::Config;
use crate::error::QueueError;
use crate::registry::LanguageRegistry;
use crate::services::{AnalyzerOptions, RepoAnalyzer, Report};
use crate::types::{TaskId, TaskStatus};
use human_bytes::human_bytes;
use ignore::WalkBuilder;
use moka::sync::Cache;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Hard floor of scratch space that must stay free.
pub const REQUIRED_FREE_BYTES: u64 = 100 * 1024 * 1024;

/// Prefix for clone scratch directories. Reconciliation only sums
/// first-level directories carrying it, so unrelated temp files are
/// never billed against the budget.
pub const SCRATCH_PREFIX: &str = "repotally-git";

/// Capacity of the submission channel. A full channel back-pressures the
/// submitting handler.
const TASK_CHANNEL_CAPACITY: usize = 20;

/// How long a task stays retrievable after its last insert.
const TASK_TTL: Duration = Duration::from_secs(3 * 60);

/// Everything a finished (or failed) task has to show for itself.
#[derive(Debug, Clone, Default)]
pub struct TaskOutcome {
    pub report: Option<Report>,
    pub error: Option<String>,
    pub fetch_duration: Duration,
    pub analysis_duration: Duration,
}

/// One submitted repository-analysis task.
///
/// Shared as `Arc<RepoTask>` between the processor (which writes) and the
/// HTTP pollers (which read). Status transitions are monotonic:
/// INIT → FETCH → ANALYZE → DONE, enforced with an atomic `fetch_max`.
#[derive(Debug)]
pub struct RepoTask {
    pub owner: String,
    pub name: String,
    pub size_bytes: u64,
    pub options: AnalyzerOptions,
    status: AtomicU8,
    outcome: Mutex<TaskOutcome>,
}

impl RepoTask {
    #[must_use]
    pub fn new(owner: String, name: String, size_bytes: u64, options: AnalyzerOptions) -> Self {
        Self {
            owner,
            name,
            size_bytes,
            options,
            status: AtomicU8::new(TaskStatus::Init.as_u8()),
            outcome: Mutex::new(TaskOutcome::default()),
        }
    }

    #[must_use]
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::Acquire)).unwrap_or(TaskStatus::Init)
    }

    fn advance(&self, status: TaskStatus) {
        self.status.fetch_max(status.as_u8(), Ordering::AcqRel);
    }

    #[must_use]
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }

    /// Snapshot of the task outcome.
    #[must_use]
    pub fn outcome(&self) -> TaskOutcome {
        self.lock_outcome().clone()
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lock_outcome().error.clone()
    }

    fn record_error(&self, message: String) {
        let mut outcome = self.lock_outcome();
        outcome.error = Some(message);
        outcome.report = None;
    }

    fn record_fetch(&self, duration: Duration) {
        self.lock_outcome().fetch_duration = duration;
    }

    fn record_report(&self, report: Report, duration: Duration) {
        let mut outcome = self.lock_outcome();
        outcome.report = Some(report);
        outcome.analysis_duration = duration;
    }

    fn lock_outcome(&self) -> std::sync::MutexGuard<'_, TaskOutcome> {
        // Lock poisoning recovery: continue with the inner data
        self.outcome.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Guarantees a task reaches DONE on every exit path of processing.
struct DoneGuard(Arc<RepoTask>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.advance(TaskStatus::Done);
    }
}

/// Disk budget. All calculations run against cheap in-memory counters;
/// `reconcile` corrects drift against the real filesystem after every
/// `sync_every` writes.
///
/// The atomics exist so handler threads can peek at capacity; only the
/// processor writes them.
struct DiskBudget {
    max_disk_bytes: u64,
    max_repo_bytes: u64,
    sync_every: u32,
    root_dir: PathBuf,
    free_bytes: AtomicI64,
    writing_count: AtomicU32,
}

impl DiskBudget {
    fn new(config: &Config) -> Self {
        Self {
            max_disk_bytes: config.max_disk_bytes,
            max_repo_bytes: config.max_repo_bytes,
            sync_every: config.sync_every,
            root_dir: config.scratch_dir.clone(),
            free_bytes: AtomicI64::new(config.max_disk_bytes as i64),
            writing_count: AtomicU32::new(0),
        }
    }

    /// Admission check: can a repository of `size_bytes` be written?
    fn admit(&self, size_bytes: u64) -> Result<(), QueueError> {
        let free = self.free_bytes.load(Ordering::Relaxed);

        tracing::debug!(
            total = %human_bytes(self.max_disk_bytes as f64),
            free = %human_bytes(free as f64),
            repo = %human_bytes(size_bytes as f64),
            "admission check"
        );

        if size_bytes > self.max_repo_bytes {
            return Err(QueueError::RepoTooLarge {
                size_bytes,
                limit_bytes: self.max_repo_bytes,
            });
        }

        if free < REQUIRED_FREE_BYTES as i64 {
            return Err(QueueError::DiskExhausted {
                free_bytes: free,
                required_bytes: REQUIRED_FREE_BYTES,
            });
        }

        if size_bytes > self.max_disk_bytes.saturating_sub(REQUIRED_FREE_BYTES) {
            return Err(QueueError::BudgetExceeded { size_bytes });
        }

        Ok(())
    }

    /// Books a completed write and reconciles when due.
    fn note_write(&self, size_bytes: u64) {
        self.free_bytes
            .fetch_sub(size_bytes as i64, Ordering::Relaxed);
        let written = self.writing_count.fetch_add(1, Ordering::Relaxed) + 1;

        if written >= self.sync_every {
            self.reconcile();
        }
    }

    /// Rewalks the scratch root and resets `free_bytes` to what the disk
    /// actually holds, clearing drift from failures and deletions.
    fn reconcile(&self) {
        let used = scratch_usage_bytes(&self.root_dir);
        self.free_bytes
            .store(self.max_disk_bytes as i64 - used as i64, Ordering::Relaxed);
        self.writing_count.store(0, Ordering::Relaxed);

        tracing::debug!(used = %human_bytes(used as f64), "scratch usage reconciled");
    }

    fn free_bytes(&self) -> i64 {
        self.free_bytes.load(Ordering::Relaxed)
    }
}

/// Sums file sizes under first-level scratch directories.
fn scratch_usage_bytes(root: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 0;
    };

    entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_dir()))
        .filter(|entry| entry.file_name().to_string_lossy().contains(SCRATCH_PREFIX))
        .map(|entry| dir_size_bytes(&entry.path()))
        .sum()
}

fn dir_size_bytes(dir: &Path) -> u64 {
    WalkBuilder::new(dir)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter_map(|entry| entry.metadata().ok().map(|meta| meta.len()))
        .sum()
}

/// Handle for submitting and looking up tasks.
pub struct TaskQueue {
    tx: mpsc::Sender<Arc<RepoTask>>,
    cache: Cache<TaskId, Arc<RepoTask>>,
    budget: Arc<DiskBudget>,
}

impl TaskQueue {
    /// Builds the queue and spawns its single processor task. Scratch
    /// usage is reconciled once up front so the very first admission sees
    /// real numbers.
    #[must_use]
    pub fn start(
        config: &Config,
        registry: Arc<LanguageRegistry>,
        cloner: Arc<dyn CloneDriver>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(TASK_CHANNEL_CAPACITY);
        let cache = Cache::builder().time_to_live(TASK_TTL).build();

        let budget = Arc::new(DiskBudget::new(config));
        budget.reconcile();

        let processor = Processor {
            rx,
            registry,
            cloner,
            budget: Arc::clone(&budget),
            parallel: config.use_file_workers,
        };
        tokio::spawn(processor.run());

        Self { tx, cache, budget }
    }

    /// Submits a task: fresh id, TTL-cached, enqueued in FIFO order.
    /// Awaits when the channel is full (accepted backpressure at the API
    /// edge).
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Closed` if the processor has shut down.
    pub async fn add(&self, task: RepoTask) -> Result<TaskId, QueueError> {
        let task = Arc::new(task);
        let id = TaskId::fresh();

        self.cache.insert(id, Arc::clone(&task));
        self.tx.send(task).await.map_err(|_| QueueError::Closed)?;

        Ok(id)
    }

    /// Looks a task up, unless it has been evicted or deleted.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<Arc<RepoTask>> {
        self.cache.get(id)
    }

    /// Removes a task from the cache.
    pub fn delete(&self, id: &TaskId) {
        self.cache.invalidate(id);
    }

    #[must_use]
    pub fn max_repo_bytes(&self) -> u64 {
        self.budget.max_repo_bytes
    }

    /// Advisory view of the remaining budget; only the processor's own
    /// reads are authoritative.
    #[must_use]
    pub fn free_bytes_hint(&self) -> i64 {
        self.budget.free_bytes()
    }
}

/// The single writer. Tasks are processed strictly in submission order;
/// at most one clone-and-analysis is in flight at any time.
struct Processor {
    rx: mpsc::Receiver<Arc<RepoTask>>,
    registry: Arc<LanguageRegistry>,
    cloner: Arc<dyn CloneDriver>,
    budget: Arc<DiskBudget>,
    parallel: bool,
}

impl Processor {
    async fn run(mut self) {
        while let Some(task) = self.rx.recv().await {
            self.process(task).await;
        }
    }

    async fn process(&self, task: Arc<RepoTask>) {
        let _done = DoneGuard(Arc::clone(&task));

        task.advance(TaskStatus::Fetch);

        if let Err(err) = self.budget.admit(task.size_bytes) {
            task.record_error(err.to_string());
            return;
        }

        // The scratch dir is removed on drop, on every exit path.
        let scratch = match tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&self.budget.root_dir)
        {
            Ok(dir) => dir,
            Err(err) => {
                task.record_error(format!("Scratch directory: {err}"));
                return;
            }
        };

        let cloner = Arc::clone(&self.cloner);
        let url = task.clone_url();
        let dest = scratch.path().to_path_buf();

        let fetch_started = Instant::now();
        let cloned = tokio::task::spawn_blocking(move || cloner.clone_repo(&url, &dest)).await;
        let fetch_duration = fetch_started.elapsed();

        match cloned {
            Ok(Ok(())) => task.record_fetch(fetch_duration),
            Ok(Err(err)) => {
                task.record_error(QueueError::Fetch(err).to_string());
                return;
            }
            Err(err) => {
                task.record_error(format!("Clone worker failed: {err}"));
                return;
            }
        }

        tracing::debug!(
            owner = %task.owner,
            repo = %task.name,
            elapsed_ms = fetch_duration.as_millis() as u64,
            "repository cloned"
        );

        self.budget.note_write(task.size_bytes);

        task.advance(TaskStatus::Analyze);

        let registry = Arc::clone(&self.registry);
        let options = task.options.clone();
        let parallel = self.parallel;
        let root = scratch.path().to_path_buf();

        let analyzed = tokio::task::spawn_blocking(move || {
            RepoAnalyzer::new(registry, &options).analyze(&root, parallel)
        })
        .await;

        match analyzed {
            Ok(Ok((report, duration))) => task.record_report(report, duration),
            Ok(Err(err)) => task.record_error(err.to_string()),
            Err(err) => task.record_error(format!("Analysis worker failed: {err}")),
        }
    }
}
