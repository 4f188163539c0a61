//! xsbridge-core
//!
//! Types and contracts shared by the search adapter and its backends: the
//! collection schema descriptor, the query request value and the traits the
//! host model layer and the daemon client implement.
#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod query;
pub mod schema;
pub mod traits;
pub mod types;

pub use error::{Error, Result, SchemaError};
