//! Request-driven search: path resolution, value coercion, schema
//! validation, predicate and ordering construction.

pub mod coerce;
pub mod params;
pub mod path;
pub mod query_builder;
pub mod schema;

pub use params::{ListParams, Warnings};
pub use query_builder::{BindValue, Glue, RecordQuery};
pub use schema::RecordSchema;
