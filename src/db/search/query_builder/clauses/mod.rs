//! Individual predicate clause builders
//!
//! Each builder validates its inputs before pushing any bind parameter, so a
//! failed clause leaves the bind list untouched.

mod filter;
mod overlap;

pub(in crate::db::search::query_builder) use filter::build_filter_clause;
pub(in crate::db::search::query_builder) use overlap::build_overlap_clause;
