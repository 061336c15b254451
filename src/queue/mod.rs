//! Job queue abstraction for background processing
//!
//! Trait-based interface with a PostgreSQL implementation that uses
//! LISTEN/NOTIFY for prompt job pickup, plus an in-memory queue for tests
//! and immediate-mode tooling. Delivery is at-least-once; there is no
//! cancellation path - a dispatched job runs to completion or is marked
//! failed.

mod helpers;
mod inline;
mod models;
mod postgres;
mod traits;

pub use helpers::try_dequeue_job;
pub use inline::InlineJobQueue;
pub use models::*;
pub use postgres::PostgresJobQueue;
pub use traits::{JobQueue, JobStream};
