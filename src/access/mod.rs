//! Access control model
//!
//! Folder access levels, the authorization policy built on their ordering,
//! the punitive ladder applied when an owner rejects an elevation request,
//! and the access-key format users redeem to join a folder.

mod key;
mod level;

pub use key::{AccessKey, KEY_PREFIX};
pub use level::{AccessLevel, Requirement};
