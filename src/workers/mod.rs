//! Background workers

mod base;
mod retry;
mod runner;
mod search_vector_worker;

pub use base::Worker;
pub use retry::retry_with_backoff;
pub use runner::{run_worker, run_worker_with_config, spawn_workers, WorkerRunnerConfig};
pub use search_vector_worker::SearchVectorWorker;
