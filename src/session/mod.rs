//! Per-user conversation state
//!
//! Each user owns exactly one [`Session`] holding the operation in progress
//! and the values collected so far. [`SessionManager`] hands out one lock per
//! user, so events for the same user are processed one at a time while
//! different users proceed in parallel.

mod manager;
mod operation;

pub use manager::{Session, SessionGuard, SessionManager, SessionStatus};
pub use operation::{Expects, Operation};
