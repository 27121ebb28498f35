//! Table administration
//!
//! Schema-changing calls (create, update, delete, list) with polling
//! that rides the same backoff schedule as throttle retry. Data-path
//! code never depends on this module.

mod errors;
mod tables;

pub use errors::{AdminError, AdminResult};
pub use tables::TableAdmin;
