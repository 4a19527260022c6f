//! Batch runtime reducing many input files.

use super::reduction::DataReduction;
use crate::config::CorrectionParameters;
use crate::error::ReductionError;
use crate::orso::OrsoDocument;
use crate::provider::MetadataProvider;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Runtime as TokioRuntime;
use tokio::sync::Semaphore;

/// Configuration for the runtime.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Number of worker threads.
    pub worker_count: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
        }
    }
}

/// One input file with the configuration to reduce it with.
#[derive(Clone)]
pub struct ReductionJob {
    pub provider: Arc<dyn MetadataProvider>,
    pub parameters: Arc<CorrectionParameters>,
}

impl ReductionJob {
    pub fn new(provider: Arc<dyn MetadataProvider>, parameters: Arc<CorrectionParameters>) -> Self {
        Self {
            provider,
            parameters,
        }
    }

    /// Source file of this job.
    pub fn source(&self) -> &str {
        self.provider.file_path()
    }

    fn run(&self) -> Result<OrsoDocument, ReductionError> {
        DataReduction::new(self.provider.as_ref(), &self.parameters)?.document()
    }
}

/// Result of one job.
#[derive(Debug)]
pub struct JobOutcome {
    pub source: String,
    pub result: Result<OrsoDocument, ReductionError>,
}

/// Totals reported when an asynchronous batch ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Set when the batch stopped early through [`Runtime::cancel`].
    pub cancelled: bool,
}

/// Shared cancellation flag of a [`Runtime`].
#[derive(Clone, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Skip every job that has not started yet.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Main runtime for batch reduction.
pub struct Runtime {
    config: RuntimeConfig,
    /// Jobs waiting to be processed.
    pending: Vec<ReductionJob>,
    /// Tokio runtime for async execution.
    tokio_runtime: TokioRuntime,
    /// Cancellation flag, checked between jobs.
    cancelled: Arc<AtomicBool>,
}

impl Runtime {
    /// Create a new runtime.
    ///
    /// # Errors
    /// [`ReductionError::Runtime`] if the async runtime cannot be started.
    pub fn new(config: RuntimeConfig) -> Result<Self, ReductionError> {
        let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_count.max(1))
            .enable_all()
            .build()
            .map_err(|e| ReductionError::Runtime(e.to_string()))?;

        Ok(Self {
            config,
            pending: Vec::new(),
            tokio_runtime,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Add a job to be processed.
    pub fn add_job(&mut self, job: ReductionJob) {
        self.pending.push(job);
    }

    /// Add multiple jobs.
    pub fn add_jobs(&mut self, jobs: impl IntoIterator<Item = ReductionJob>) {
        self.pending.extend(jobs);
    }

    /// Get the number of pending jobs.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Reduce all pending jobs on a worker pool and wait for them.
    ///
    /// Outcomes are returned in the order jobs were added.
    pub fn run_sync(&mut self) -> Result<Vec<JobOutcome>, ReductionError> {
        self.cancelled.store(false, Ordering::SeqCst);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count)
            .build()
            .map_err(|e| ReductionError::Runtime(e.to_string()))?;

        let jobs: Vec<ReductionJob> = self.pending.drain(..).collect();
        log::info!(
            "reducing {} file(s) on {} worker(s)",
            jobs.len(),
            pool.current_num_threads()
        );

        Ok(pool.install(|| {
            jobs.par_iter()
                .map(|job| JobOutcome {
                    source: job.source().to_string(),
                    result: job.run(),
                })
                .collect()
        }))
    }

    /// Reduce all pending jobs in the background, reporting through callbacks.
    ///
    /// At most `worker_count` jobs run at once. `on_progress(completed, total)`
    /// and `on_document` fire once per finished job in the order jobs were
    /// added; `on_complete` fires once at the end. Jobs still waiting for a
    /// worker when the batch is cancelled are skipped.
    pub fn run_async<F, P, D>(&mut self, on_complete: F, on_progress: P, on_document: D)
    where
        F: FnOnce(BatchSummary) + Send + 'static,
        P: Fn(usize, usize) + Send + Sync + 'static,
        D: Fn(JobOutcome) + Send + Sync + 'static,
    {
        self.cancelled.store(false, Ordering::SeqCst);

        let jobs: Vec<ReductionJob> = self.pending.drain(..).collect();
        let total = jobs.len();
        let cancelled = Arc::clone(&self.cancelled);
        let workers = Arc::new(Semaphore::new(self.config.worker_count.max(1)));

        self.tokio_runtime.spawn(async move {
            let handles: Vec<_> = jobs
                .into_iter()
                .map(|job| {
                    let cancelled = Arc::clone(&cancelled);
                    let workers = Arc::clone(&workers);
                    let source = job.source().to_string();
                    let handle = tokio::spawn(async move {
                        let Ok(_permit) = workers.acquire_owned().await else {
                            return None;
                        };
                        if cancelled.load(Ordering::SeqCst) {
                            return None;
                        }
                        Some(
                            tokio::task::spawn_blocking(move || job.run())
                                .await
                                .unwrap_or_else(|e| Err(ReductionError::Runtime(e.to_string()))),
                        )
                    });
                    (source, handle)
                })
                .collect();

            let mut summary = BatchSummary::default();
            let mut completed = 0;
            for (source, handle) in handles {
                let result = match handle.await {
                    Ok(Some(result)) => result,
                    Ok(None) => {
                        summary.cancelled = true;
                        continue;
                    }
                    Err(e) => Err(ReductionError::Runtime(e.to_string())),
                };

                if result.is_ok() {
                    summary.succeeded += 1;
                } else {
                    summary.failed += 1;
                }
                completed += 1;
                on_progress(completed, total);
                on_document(JobOutcome { source, result });
            }

            log::info!(
                "batch finished: {} succeeded, {} failed{}",
                summary.succeeded,
                summary.failed,
                if summary.cancelled { ", cancelled" } else { "" }
            );
            on_complete(summary);
        });
    }

    /// Handle for cancelling from callbacks or other threads.
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken(Arc::clone(&self.cancelled))
    }

    /// Skip every job that has not started yet.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Drop pending jobs and clear cancellation.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::make_header;
    use crate::data::SlitData;
    use crate::provider::MemoryProvider;
    use ndarray::array;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    fn job(path: &str, detector: &str) -> ReductionJob {
        let provider = MemoryProvider::new(
            path,
            (*make_header()).clone(),
            SlitData::new(1.0, 0.5, -2000.0, -500.0),
            4.7,
        )
        .with_scan_column("theta", array![0.3, 0.6, 0.9])
        .with_column("mon1", array![100.0, 100.0, 100.0])
        .with_column("timer", array![1.0, 1.0, 1.0])
        .with_detector("det", array![50.0, 20.0, 5.0]);

        let mut parameters = CorrectionParameters::default();
        parameters.data_source.detector = detector.to_string();
        ReductionJob::new(Arc::new(provider), Arc::new(parameters))
    }

    fn config() -> RuntimeConfig {
        RuntimeConfig { worker_count: 2 }
    }

    #[test]
    fn test_run_sync_keeps_order() {
        let mut runtime = Runtime::new(config()).unwrap();
        runtime.add_jobs([job("a.dat", "det"), job("b.dat", "nope"), job("c.dat", "det")]);
        assert_eq!(runtime.pending_count(), 3);

        let outcomes = runtime.run_sync().unwrap();
        assert_eq!(runtime.pending_count(), 0);

        let sources: Vec<_> = outcomes.iter().map(|o| o.source.as_str()).collect();
        assert_eq!(sources, vec!["a.dat", "b.dat", "c.dat"]);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.as_ref().is_err_and(|e| e.is_config()));
        assert_eq!(outcomes[2].result.as_ref().unwrap().datasets.len(), 1);
    }

    #[test]
    fn test_run_async_callbacks() {
        let mut runtime = Runtime::new(config()).unwrap();
        runtime.add_jobs([job("a.dat", "det"), job("b.dat", "nope")]);

        let progress = Arc::new(Mutex::new(Vec::new()));
        let documents = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::channel();

        let progress_cb = Arc::clone(&progress);
        let documents_cb = Arc::clone(&documents);
        runtime.run_async(
            move |summary| tx.send(summary).unwrap(),
            move |done, total| progress_cb.lock().unwrap().push((done, total)),
            move |outcome| documents_cb.lock().unwrap().push(outcome.source),
        );

        let summary = rx.recv_timeout(Duration::from_secs(30)).unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                succeeded: 1,
                failed: 1,
                cancelled: false
            }
        );
        assert_eq!(*progress.lock().unwrap(), vec![(1, 2), (2, 2)]);
        assert_eq!(*documents.lock().unwrap(), vec!["a.dat", "b.dat"]);
    }

    #[test]
    fn test_cancel_skips_waiting_jobs() {
        let mut runtime = Runtime::new(RuntimeConfig { worker_count: 1 }).unwrap();
        let total = 20;
        runtime.add_jobs((0..total).map(|i| job(&format!("{i}.dat"), "det")));

        let documents = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::channel();
        let token = runtime.cancel_token();

        let documents_cb = Arc::clone(&documents);
        runtime.run_async(
            move |summary| tx.send(summary).unwrap(),
            |_, _| {},
            move |outcome| {
                token.cancel();
                documents_cb.lock().unwrap().push(outcome.source);
            },
        );

        let summary = rx.recv_timeout(Duration::from_secs(30)).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.failed, 0);

        let documents = documents.lock().unwrap();
        assert!(!documents.is_empty());
        assert!(documents.len() < total);
        assert_eq!(documents.len(), summary.succeeded);
        assert_eq!(documents[0], "0.dat");
    }

    #[test]
    fn test_cancel_token_shares_flag() {
        let runtime = Runtime::new(config()).unwrap();
        let token = runtime.cancel_token();
        assert!(!token.is_cancelled());
        runtime.cancel();
        assert!(token.is_cancelled());
    }
}
