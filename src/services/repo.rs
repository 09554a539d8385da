//! Repository analyzer: tree walk, dispatch, concurrent aggregation.
//!
//! The walker prunes excluded directories, skips excluded files and counts
//! everything else. Small files are counted inline; in parallel mode large
//! files go onto the worker pool, falling back to inline when the pool's
//! channel is full so the walk never blocks.

use crate::error::AnalyzeError;
use crate::registry::{LanguageRegistry, OTHER_LANGUAGE, TOTAL_NAME};
use crate::services::exclude::{AnalyzerOptions, ExcludeFilter};
use crate::services::file::{self, FileCounts};
use crate::services::pool::{FileJob, WorkerPool, QUEUE_CAPACITY};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Files at or below this size are counted inline on the walking thread.
const INLINE_SIZE_BYTES: u64 = 20 * 1024;

/// Per-language counters, updated concurrently through atomic adds. The
/// map of aggregates is fully populated before the walk starts, so the
/// hot path never mutates the map itself.
#[derive(Debug, Default)]
struct LanguageAggregate {
    files: AtomicU32,
    lines: AtomicU32,
    blank: AtomicU32,
    comments: AtomicU32,
}

impl LanguageAggregate {
    fn add(&self, counts: &FileCounts) {
        self.files.fetch_add(counts.files, Ordering::Relaxed);
        self.lines.fetch_add(counts.lines, Ordering::Relaxed);
        self.blank.fetch_add(counts.blank, Ordering::Relaxed);
        self.comments.fetch_add(counts.comments, Ordering::Relaxed);
    }

    fn snapshot(&self, name: &str) -> LanguageTotals {
        LanguageTotals {
            name: name.to_string(),
            files: self.files.load(Ordering::Relaxed),
            lines: self.lines.load(Ordering::Relaxed),
            blank: self.blank.load(Ordering::Relaxed),
            comments: self.comments.load(Ordering::Relaxed),
        }
    }
}

/// Totals for one language across a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageTotals {
    pub name: String,
    pub files: u32,
    pub lines: u32,
    pub blank: u32,
    pub comments: u32,
}

/// Aggregated analysis report. `languages` holds only languages with at
/// least one file, sorted by lines descending, name ascending on ties;
/// the totals row is computed here and never appears in the sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub total_files: u32,
    pub total_lines: u32,
    pub total_blank: u32,
    pub total_comments: u32,
    pub languages: Vec<LanguageTotals>,
}

/// Shared state between the walker and the worker pool: the registry plus
/// one pre-populated aggregate per known language (and "Other").
pub(crate) struct Tally {
    registry: Arc<LanguageRegistry>,
    languages: HashMap<String, LanguageAggregate>,
}

impl Tally {
    pub(crate) fn new(registry: Arc<LanguageRegistry>) -> Self {
        let mut languages: HashMap<String, LanguageAggregate> = registry
            .all_languages()
            .map(|name| (name.to_string(), LanguageAggregate::default()))
            .collect();
        languages.insert(OTHER_LANGUAGE.to_string(), LanguageAggregate::default());

        Self {
            registry,
            languages,
        }
    }

    /// Counts one file and merges it into its language's aggregate.
    /// Files that cannot be opened are skipped silently.
    pub(crate) fn count_file(&self, path: &Path) {
        let Ok(counts) = file::analyze_path(&self.registry, path) else {
            return;
        };

        // The registry can only produce names that were pre-populated.
        if let Some(aggregate) = self.languages.get(counts.language.as_str()) {
            aggregate.add(&counts);
        }
    }

    /// Builds the final report: totals plus the sorted language rows.
    pub(crate) fn report(&self) -> Report {
        let mut report = Report::default();

        for (name, aggregate) in &self.languages {
            let totals = aggregate.snapshot(name);

            if totals.files == 0 || totals.name == TOTAL_NAME {
                continue;
            }

            report.total_files += totals.files;
            report.total_lines += totals.lines;
            report.total_blank += totals.blank;
            report.total_comments += totals.comments;
            report.languages.push(totals);
        }

        report
            .languages
            .sort_by(|a, b| b.lines.cmp(&a.lines).then_with(|| a.name.cmp(&b.name)));

        report
    }
}

/// Walks a cloned tree and produces a [`Report`].
pub struct RepoAnalyzer {
    registry: Arc<LanguageRegistry>,
    filter: Arc<ExcludeFilter>,
}

impl RepoAnalyzer {
    #[must_use]
    pub fn new(registry: Arc<LanguageRegistry>, options: &AnalyzerOptions) -> Self {
        Self {
            registry,
            filter: Arc::new(ExcludeFilter::new(options)),
        }
    }

    /// Analyzes the tree under `root`, measuring wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns `AnalyzeError::Walk` when the traversal itself fails;
    /// per-file open failures are absorbed.
    pub fn analyze(
        &self,
        root: &Path,
        parallel: bool,
    ) -> Result<(Report, Duration), AnalyzeError> {
        let started = Instant::now();
        let tally = Arc::new(Tally::new(Arc::clone(&self.registry)));

        let pool = parallel.then(|| {
            let workers = std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1);
            WorkerPool::spawn(workers, QUEUE_CAPACITY, Arc::clone(&tally))
        });

        let walked = self.walk(root, &tally, pool.as_ref());

        if let Some(pool) = pool {
            if walked.is_err() {
                pool.cancel();
            }
            pool.join();
        }

        walked?;

        Ok((tally.report(), started.elapsed()))
    }

    fn walk(
        &self,
        root: &Path,
        tally: &Arc<Tally>,
        pool: Option<&WorkerPool>,
    ) -> Result<(), AnalyzeError> {
        let filter = Arc::clone(&self.filter);

        let walker = WalkBuilder::new(root)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .filter_entry(move |entry| {
                let name = entry.file_name().to_string_lossy();

                if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    !filter.excludes_dir(&name)
                } else {
                    !filter.excludes_file(&name)
                }
            })
            .build();

        for entry in walker {
            let entry = entry.map_err(|err| AnalyzeError::Walk {
                path: root.to_path_buf(),
                reason: err.to_string(),
            })?;

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let size = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
            let path = entry.into_path();

            match pool {
                Some(pool) if size > INLINE_SIZE_BYTES => {
                    // Channel full: count inline rather than block the walk.
                    if let Err(job) = pool.try_dispatch(FileJob { path }) {
                        tally.count_file(&job.path);
                    }
                }
                _ => tally.count_file(&path),
            }
        }

        Ok(())
    }
}
