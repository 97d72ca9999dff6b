//! Callback payload codec
//!
//! Every button the bot renders carries one of these, encoded as
//! `<kind>:<body>`. The encoded form always fits the platform's callback data
//! limit.

use crate::access::AccessLevel;
use crate::error::{Error, Result};

/// Callback data limit of the chat platform, in bytes
pub const MAX_PAYLOAD_LEN: usize = 64;

/// Fixed menu actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Back,
    CreateKey,
    DeleteKey,
    Members,
    /// Save the pending URL using the URL itself as tag
    WithoutTag,
}

impl MenuAction {
    fn token(self) -> &'static str {
        match self {
            MenuAction::Back => "back",
            MenuAction::CreateKey => "create_key",
            MenuAction::DeleteKey => "delete_key",
            MenuAction::Members => "members",
            MenuAction::WithoutTag => "no_tag",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "back" => MenuAction::Back,
            "create_key" => MenuAction::CreateKey,
            "delete_key" => MenuAction::DeleteKey,
            "members" => MenuAction::Members,
            "no_tag" => MenuAction::WithoutTag,
            _ => return None,
        })
    }
}

/// The owner's answer carried by a confirmation button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Grant this level as proposed
    Grant(AccessLevel),
    /// Demote from whatever level the user holds when the answer arrives
    Reject,
}

impl Verdict {
    const REJECT: &'static str = "reject";

    fn token(self) -> &'static str {
        match self {
            Verdict::Grant(level) => level.name(),
            Verdict::Reject => Self::REJECT,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            Self::REJECT => Some(Verdict::Reject),
            token => match AccessLevel::parse(token) {
                AccessLevel::Undefined => None,
                level => Some(Verdict::Grant(level)),
            },
        }
    }
}

/// Answer to a key redemption that needs the owner's approval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessProposal {
    pub folder_id: String,
    pub user_id: i64,
    pub verdict: Verdict,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Menu(MenuAction),
    Level(AccessLevel),
    Folder(String),
    Tag(String),
    Access(AccessProposal),
}

impl Payload {
    pub fn encode(&self) -> String {
        match self {
            Payload::Menu(action) => format!("op:{}", action.token()),
            Payload::Level(level) => format!("lvl:{}", level.name()),
            Payload::Folder(id) => format!("folder:{}", id),
            Payload::Tag(tag) => format!("tag:{}", truncate(tag, MAX_PAYLOAD_LEN - 4)),
            Payload::Access(p) => {
                let head = format!("ga:{}:{}:{}:", p.folder_id, p.user_id, p.verdict.token());
                let room = MAX_PAYLOAD_LEN.saturating_sub(head.len());
                format!("{}{}", head, truncate(&p.username, room))
            }
        }
    }

    pub fn decode(data: &str) -> Result<Self> {
        let malformed = || Error::Payload(format!("malformed callback data '{}'", data));
        let (kind, body) = data.split_once(':').ok_or_else(malformed)?;

        match kind {
            "op" => MenuAction::from_token(body)
                .map(Payload::Menu)
                .ok_or_else(malformed),
            "lvl" => match AccessLevel::parse(body) {
                AccessLevel::Undefined => Err(malformed()),
                level => Ok(Payload::Level(level)),
            },
            "folder" if !body.is_empty() => Ok(Payload::Folder(body.to_string())),
            "tag" if !body.is_empty() => Ok(Payload::Tag(body.to_string())),
            "ga" => {
                let mut parts = body.splitn(4, ':');
                let folder_id = parts.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;
                let user_id = parts
                    .next()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or_else(malformed)?;
                let verdict = parts
                    .next()
                    .and_then(Verdict::from_token)
                    .ok_or_else(malformed)?;
                Ok(Payload::Access(AccessProposal {
                    folder_id: folder_id.to_string(),
                    user_id,
                    verdict,
                    username: parts.next().unwrap_or_default().to_string(),
                }))
            }
            _ => Err(malformed()),
        }
    }

    /// Whether this is an access confirmation, which bypasses session state
    pub fn is_access(data: &str) -> bool {
        data.starts_with("ga:")
    }
}

/// Longest prefix of `s` within `max` bytes, cut on a char boundary
pub fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
