//! Worker runner: drives workers from the job queue
//!
//! Listens on the queue and feeds jobs to a worker. A lost listener
//! connection is re-established with exponential backoff and jitter; a
//! shutdown signal stops the worker between jobs.

use futures::StreamExt;
use std::sync::Arc;
use tokio::{
    sync::watch,
    time::{sleep, Duration},
};

use super::base::Worker;
use super::retry::jittered_duration;
use crate::{queue::JobQueue, Result};

#[derive(Clone, Debug)]
pub struct WorkerRunnerConfig {
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
    pub reconnect_jitter_ratio: f64,
}

impl WorkerRunnerConfig {
    pub fn from_config(config: &crate::config::WorkerConfig) -> Self {
        Self {
            reconnect_initial: Duration::from_secs(config.reconnect_initial_seconds),
            reconnect_max: Duration::from_secs(config.reconnect_max_seconds),
            reconnect_jitter_ratio: config.reconnect_jitter_ratio,
        }
    }
}

impl Default for WorkerRunnerConfig {
    fn default() -> Self {
        Self {
            reconnect_initial: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(30),
            reconnect_jitter_ratio: 0.2,
        }
    }
}

/// Run a worker by listening to the job queue and processing jobs
pub async fn run_worker(worker: Arc<dyn Worker>, job_queue: Arc<dyn JobQueue>) -> Result<()> {
    run_worker_with_config(worker, job_queue, WorkerRunnerConfig::default(), None).await
}

pub async fn run_worker_with_config(
    worker: Arc<dyn Worker>,
    job_queue: Arc<dyn JobQueue>,
    runner_config: WorkerRunnerConfig,
    mut shutdown: Option<watch::Receiver<bool>>,
) -> Result<()> {
    let job_types: Vec<String> = worker
        .supported_job_types()
        .iter()
        .map(|s| s.to_string())
        .collect();

    tracing::info!(
        "{} listening for job types: {:?}",
        worker.name(),
        job_types
    );

    worker.start().await?;

    let mut reconnect_delay = runner_config.reconnect_initial;

    loop {
        if let Some(rx) = shutdown.as_ref() {
            if *rx.borrow() {
                tracing::info!("{} shutdown requested, stopping", worker.name());
                worker.stop().await?;
                return Ok(());
            }
        }

        // (Re)create the job stream; LISTEN/NOTIFY connections can drop, in
        // which case the stream ends and the listener must be re-established.
        let mut job_stream = match job_queue.listen(&job_types).await {
            Ok(stream) => {
                reconnect_delay = runner_config.reconnect_initial;
                stream
            }
            Err(e) => {
                tracing::error!(
                    "{} failed to create job listener: {} (reconnecting in {:?})",
                    worker.name(),
                    e,
                    reconnect_delay
                );
                let sleep_for =
                    jittered_duration(reconnect_delay, runner_config.reconnect_jitter_ratio);
                sleep(sleep_for).await;
                reconnect_delay = (reconnect_delay * 2).min(runner_config.reconnect_max);
                continue;
            }
        };

        loop {
            tokio::select! {
                _ = async {
                    if let Some(rx) = shutdown.as_mut() {
                        let _ = rx.changed().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    if let Some(rx) = shutdown.as_ref() {
                        if *rx.borrow() {
                            tracing::info!("{} shutdown requested, stopping", worker.name());
                            worker.stop().await?;
                            return Ok(());
                        }
                    }
                }
                next = job_stream.next() => {
                    match next {
                        Some(Ok(job)) => {
                            tracing::info!("{} received job {}", worker.name(), job.id);
                            if let Err(e) = worker.process_job(job).await {
                                tracing::error!("{} failed to process job: {}", worker.name(), e);
                            }
                        }
                        Some(Err(e)) => {
                            tracing::error!("{} error receiving job: {}", worker.name(), e);
                        }
                        None => break,
                    }
                }
            }
        }

        tracing::warn!(
            "{} job stream ended, reconnecting in {:?}",
            worker.name(),
            reconnect_delay
        );
        let sleep_for = jittered_duration(reconnect_delay, runner_config.reconnect_jitter_ratio);
        sleep(sleep_for).await;
        reconnect_delay = (reconnect_delay * 2).min(runner_config.reconnect_max);
    }
}

/// Spawn one task per worker, all fed from the same queue.
pub fn spawn_workers(
    workers: Vec<Box<dyn Worker>>,
    job_queue: Arc<dyn JobQueue>,
    runner_config: WorkerRunnerConfig,
    shutdown: Option<watch::Receiver<bool>>,
) -> Vec<tokio::task::JoinHandle<Result<()>>> {
    workers
        .into_iter()
        .map(|worker| {
            let worker_arc: Arc<dyn Worker> = Arc::from(worker);
            let queue = job_queue.clone();
            let cfg = runner_config.clone();
            let shutdown_rx = shutdown.clone();
            tokio::spawn(async move {
                run_worker_with_config(worker_arc, queue, cfg, shutdown_rx).await
            })
        })
        .collect()
}
