//! LinkKeeper - conversational bookmark folders
//!
//! LinkKeeper is a chat bot that files links into named folders. Each link
//! is stored under a short tag, folders can be shared through access keys,
//! and every elevation beyond read access is approved by the folder owner.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Telegram Bot API                               │
//! └───────────────┬──────────────────────────────────▲──────────────────┘
//!                 │ getUpdates (long poll)           │ sendMessage /
//!                 │                                  │ deleteMessage /
//! ┌───────────────▼──────────────────────────────────┴──────────────────┐
//! │                       Telegram Adapter                               │
//! │  - UpdateSource: batches of events, offset tracking                  │
//! │  - ChatGateway: messages, inline buttons, callback answers           │
//! └───────────────┬─────────────────────────────────────────────────────┘
//!                 │
//! ┌───────────────▼─────────────────────────────────────────────────────┐
//! │                       Consumer                                       │
//! │  - Fan a batch out by user, one task per user                        │
//! │  - Per-event deadline, idle session sweeping                         │
//! └───────────────┬─────────────────────────────────────────────────────┘
//!                 │
//! ┌───────────────▼─────────────────────────────────────────────────────┐
//! │                       Processor                                      │
//! │  - Classify input, drive the user's session                          │
//! │  - Folder, link and key flows, owner confirmation                    │
//! └───────┬───────────────────────────────────────────────┬─────────────┘
//!         │                                               │
//! ┌───────▼──────────────┐                     ┌──────────▼─────────────┐
//! │   Session Manager    │                     │   Storage (SQLite)     │
//! │  per-user locks      │                     │  folders, pages,       │
//! │                      │                     │  access, keys          │
//! └──────────────────────┘                     └────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`channels`]: Chat platform adapters
//! - [`consumer`]: Update polling and per-user dispatch
//! - [`processor`]: Conversation state machine
//! - [`session`]: Per-user conversation state
//! - [`access`]: Access levels and access keys
//! - [`storage`]: Persistent store
//! - [`config`]: Configuration management

pub mod access;
pub mod channels;
pub mod config;
pub mod consumer;
pub mod error;
pub mod processor;
pub mod session;
pub mod storage;

pub use config::BotConfig;
pub use error::{Error, Result};
