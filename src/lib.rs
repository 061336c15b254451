//! Folio - content-management backend core
//!
//! The request-driven query and search-indexing subsystem behind a
//! stories/documents CMS:
//! - Safe, composable predicates built from arbitrary filter/sort query
//!   parameters, including paths into each record's JSON attribute bag
//! - Weighted, multi-language full-text search vectors maintained
//!   incrementally by background jobs as records change

pub mod config;
pub mod db;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod models;
pub mod queue;
pub mod services;
pub mod workers;

pub use config::Config;
pub use error::{Error, Result};
