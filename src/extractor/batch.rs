use crate::error::{FailureKind, Result, TextFetchError, UserFriendlyError};
use crate::extractor::{OutputManager, TextConverter};
use crate::fetcher::PageFetcher;
use crate::loader::UrlEntry;
use crate::ui::GracefulShutdown;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};

/// The unit of work for one URL: fetch, convert, write.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub entry: UrlEntry,
    pub output_path: PathBuf,
}

/// One failed job, as recorded in the batch report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFailure {
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a single job, sent from a worker to the aggregator.
#[derive(Debug)]
struct JobOutcome {
    url: String,
    result: std::result::Result<u64, (FailureKind, String)>,
}

/// Aggregated view of a running batch, updated once per completed job.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub jobs_completed: usize,
    pub total_jobs: usize,
    pub succeeded: usize,
    pub bytes_written: u64,
    pub current_url: Option<String>,
    pub start_time: Instant,
    pub failures: Vec<JobFailure>,
}

impl BatchProgress {
    pub fn new(total_jobs: usize) -> Self {
        Self {
            jobs_completed: 0,
            total_jobs,
            succeeded: 0,
            bytes_written: 0,
            current_url: None,
            start_time: Instant::now(),
            failures: Vec::new(),
        }
    }

    fn record(&mut self, outcome: JobOutcome) {
        self.jobs_completed += 1;
        self.current_url = Some(outcome.url.clone());

        match outcome.result {
            Ok(bytes) => {
                self.succeeded += 1;
                self.bytes_written += bytes;
            }
            Err((kind, message)) => {
                self.failures.push(JobFailure {
                    url: outcome.url,
                    kind,
                    message,
                });
            }
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn into_summary(self) -> BatchSummary {
        let duration = self.start_time.elapsed();
        BatchSummary {
            total: self.total_jobs,
            succeeded: self.succeeded,
            failed: self.failures.len(),
            bytes_written: self.bytes_written,
            duration,
            failures: self.failures,
        }
    }
}

/// Final counts for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes_written: u64,
    pub duration: Duration,
    pub failures: Vec<JobFailure>,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Bounded worker pool executing extraction jobs.
///
/// Workers pull jobs from a shared queue; every outcome flows over a
/// channel to a single aggregator owning the summary, so no lock guards
/// the shared counts.
pub struct BatchRunner {
    fetcher: Arc<PageFetcher>,
    converter: Arc<TextConverter>,
    workers: usize,
}

impl BatchRunner {
    pub fn new(fetcher: PageFetcher, converter: TextConverter, workers: usize) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            converter: Arc::new(converter),
            workers: workers.max(1),
        }
    }

    /// Run all jobs to completion and return the batch summary.
    ///
    /// A job failure never aborts the batch. Returns `Cancelled` when a
    /// shutdown request left jobs unprocessed; finished work stays on disk.
    pub async fn run(
        &self,
        jobs: Vec<ExtractionJob>,
        output_manager: OutputManager,
        shutdown: GracefulShutdown,
        progress_callback: Option<&dyn Fn(&BatchProgress)>,
    ) -> Result<BatchSummary> {
        let total_jobs = jobs.len();
        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
        let (tx, mut rx) = mpsc::unbounded_channel::<JobOutcome>();

        let worker_count = self.workers.min(total_jobs.max(1));
        let mut handles = Vec::with_capacity(worker_count);

        for _ in 0..worker_count {
            let queue = queue.clone();
            let tx = tx.clone();
            let fetcher = self.fetcher.clone();
            let converter = self.converter.clone();
            let output_manager = output_manager.clone();
            let shutdown = shutdown.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    if !shutdown.is_running() {
                        break;
                    }

                    let job = { queue.lock().await.pop_front() };
                    let Some(job) = job else { break };

                    let outcome = process_job(&fetcher, &converter, &output_manager, job).await;
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            }));
        }

        // The aggregator owns the summary; it sees the channel close once
        // every worker has dropped its sender.
        drop(tx);

        let mut progress = BatchProgress::new(total_jobs);
        while let Some(outcome) = rx.recv().await {
            progress.record(outcome);
            if let Some(callback) = progress_callback {
                callback(&progress);
            }
        }

        for handle in handles {
            let _ = handle.await;
        }

        if !shutdown.is_running() && progress.jobs_completed < total_jobs {
            return Err(TextFetchError::Cancelled);
        }

        Ok(progress.into_summary())
    }
}

async fn process_job(
    fetcher: &PageFetcher,
    converter: &TextConverter,
    output_manager: &OutputManager,
    job: ExtractionJob,
) -> JobOutcome {
    let result = run_job_steps(fetcher, converter, output_manager, &job).await;

    JobOutcome {
        url: job.entry.raw,
        result: result.map_err(|e| (e.failure_kind(), e.user_message())),
    }
}

async fn run_job_steps(
    fetcher: &PageFetcher,
    converter: &TextConverter,
    output_manager: &OutputManager,
    job: &ExtractionJob,
) -> Result<u64> {
    let page = fetcher.fetch(&job.entry.url).await?;
    let text = converter.convert(&page)?;
    output_manager.write_text(&job.output_path, &text).await
}
