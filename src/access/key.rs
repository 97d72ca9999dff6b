//! Access key codec
//!
//! A key is `KEY` followed by the 12-character folder id and the secret,
//! with no separators: `KEY|FOLDER_ID|SECRET`.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Prefix every access key starts with
pub const KEY_PREFIX: &str = "KEY";

#[allow(clippy::unwrap_used)]
fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^KEY([0-9a-f]{12})([A-Za-z0-9]{8,64})$").unwrap()
    })
}

/// A decoded access key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKey {
    pub folder_id: String,
    pub secret: String,
}

impl AccessKey {
    pub fn new(folder_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            folder_id: folder_id.into(),
            secret: secret.into(),
        }
    }

    /// Whether the text claims to be a key (it may still be malformed)
    pub fn is_key_like(text: &str) -> bool {
        text.len() > KEY_PREFIX.len() && text.starts_with(KEY_PREFIX)
    }

    /// Whether the text is a complete key: prefix, folder id and secret
    pub fn is_well_formed(text: &str) -> bool {
        key_pattern().is_match(text.trim())
    }

    /// Decode a key presented by a user
    pub fn decode(text: &str) -> Result<Self> {
        let caps = key_pattern()
            .captures(text.trim())
            .ok_or_else(|| Error::Payload("malformed access key".to_string()))?;
        Ok(Self::new(&caps[1], &caps[2]))
    }

    pub fn encode(&self) -> String {
        format!("{}{}{}", KEY_PREFIX, self.folder_id, self.secret)
    }
}
