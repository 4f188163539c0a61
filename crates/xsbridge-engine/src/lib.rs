//! xsbridge-engine
//!
//! The search engine adapter: dispatches update/delete/clean/search for
//! searchable host entities to per-collection daemon clients and maps hits
//! back to entities.
pub mod adapter;
pub mod cache;

pub use adapter::SearchEngineAdapter;
pub use cache::ClientCache;
