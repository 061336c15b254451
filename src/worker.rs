//! folio-worker - background worker process
//!
//! Listens on the job queue and maintains search vectors as records change.

use std::sync::Arc;
use tokio::sync::watch;

use folio::queue::{JobQueue, PostgresJobQueue};
use folio::services::IndexingService;
use folio::workers::{spawn_workers, SearchVectorWorker, Worker, WorkerRunnerConfig};
use folio::{db, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    let _guard = folio::logging::init_logging(&config.logging)?;

    tracing::info!("folio-worker starting");

    let pool = db::connect(&config.database).await?;
    db::run_migrations(&pool).await?;

    let job_queue: Arc<dyn JobQueue> = Arc::new(PostgresJobQueue::new(pool.clone()));
    let indexing_service = Arc::new(IndexingService::new(pool.clone(), config.search.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let workers: Vec<Box<dyn Worker>> = (0..config.worker.worker_count.max(1))
        .map(|_| {
            Box::new(SearchVectorWorker::new(
                job_queue.clone(),
                indexing_service.clone(),
                config.worker.retry.clone(),
            )) as Box<dyn Worker>
        })
        .collect();

    let handles = spawn_workers(
        workers,
        job_queue,
        WorkerRunnerConfig::from_config(&config.worker),
        Some(shutdown_rx),
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    for handle in handles {
        let _ = handle.await;
    }

    tracing::info!("folio-worker stopped");
    Ok(())
}
