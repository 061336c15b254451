//! Domain models

mod record;

pub use record::{Record, RecordStatus};
