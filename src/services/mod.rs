//! Application services

pub mod indexing;
pub mod search;

pub use indexing::IndexingService;
