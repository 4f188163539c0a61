//! xsbridge-text
//!
//! Tantivy-backed stand-in for the search daemon. Collections described by
//! `xsbridge-core` become tantivy indexes, in memory or under a directory.
pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::{TantivyClient, TantivyClientFactory};
pub use search::TantivySession;
