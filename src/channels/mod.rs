//! Chat platform adapters
//!
//! [`ChatGateway`] sends messages, buttons and callback acknowledgements;
//! [`UpdateSource`] produces inbound [`Event`]s. [`TelegramAdapter`] implements
//! both over the Telegram Bot API.

mod adapter;
#[cfg(test)]
pub(crate) mod mock;
mod telegram;

pub use adapter::{Button, Callback, ChatGateway, Event, UpdateSource};
pub use telegram::TelegramAdapter;
