//! Access levels and authorization policy

use std::fmt;

/// A user's access level to one folder.
///
/// Variants are declared lowest first so the derived `Ord` gives
/// `Owner > Editor > Reader > Suspected > Banned > Undefined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessLevel {
    /// No grant. Never persisted.
    Undefined,
    /// Rejected twice; key redemption is refused.
    Banned,
    /// Rejected once; the next rejection bans.
    Suspected,
    Reader,
    Editor,
    Owner,
}

impl AccessLevel {
    /// Levels a key can be issued for, highest first (Editor down to Reader)
    pub const GRANTABLE: [AccessLevel; 2] = [AccessLevel::Editor, AccessLevel::Reader];

    /// Stable integer stored in the database
    pub fn as_i64(self) -> i64 {
        match self {
            AccessLevel::Undefined => 0,
            AccessLevel::Banned => 1,
            AccessLevel::Suspected => 2,
            AccessLevel::Reader => 3,
            AccessLevel::Editor => 4,
            AccessLevel::Owner => 5,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => AccessLevel::Banned,
            2 => AccessLevel::Suspected,
            3 => AccessLevel::Reader,
            4 => AccessLevel::Editor,
            5 => AccessLevel::Owner,
            _ => AccessLevel::Undefined,
        }
    }

    /// Display name, also used as the level token in callback payloads
    pub fn name(self) -> &'static str {
        match self {
            AccessLevel::Undefined => "Undefined",
            AccessLevel::Banned => "Banned",
            AccessLevel::Suspected => "Suspected",
            AccessLevel::Reader => "Reader",
            AccessLevel::Editor => "Editor",
            AccessLevel::Owner => "Owner",
        }
    }

    /// Parse a level token; unknown tokens map to `Undefined`
    pub fn parse(token: &str) -> Self {
        match token {
            "Banned" => AccessLevel::Banned,
            "Suspected" => AccessLevel::Suspected,
            "Reader" => AccessLevel::Reader,
            "Editor" => AccessLevel::Editor,
            "Owner" => AccessLevel::Owner,
            _ => AccessLevel::Undefined,
        }
    }

    /// Suspected or Banned
    pub fn is_punitive(self) -> bool {
        matches!(self, AccessLevel::Suspected | AccessLevel::Banned)
    }

    /// Whether a key may be issued for this level
    pub fn is_grantable(self) -> bool {
        Self::GRANTABLE.contains(&self)
    }

    /// Level applied when the owner rejects an elevation request.
    ///
    /// The ladder only goes down: anything above Suspected becomes
    /// Suspected, Suspected and Banned become Banned.
    pub fn demoted(self) -> Self {
        match self {
            AccessLevel::Suspected | AccessLevel::Banned => AccessLevel::Banned,
            _ => AccessLevel::Suspected,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Access a folder operation requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Viewing contents
    Read,
    /// Saving, deleting or renaming contents
    Edit,
    /// Key management and folder deletion
    Own,
}

impl Requirement {
    pub fn permits(self, level: AccessLevel) -> bool {
        match self {
            Requirement::Read => level >= AccessLevel::Reader,
            Requirement::Edit => level >= AccessLevel::Editor,
            Requirement::Own => level == AccessLevel::Owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_ordering() {
        assert!(AccessLevel::Owner > AccessLevel::Editor);
        assert!(AccessLevel::Editor > AccessLevel::Reader);
        assert!(AccessLevel::Reader > AccessLevel::Suspected);
        assert!(AccessLevel::Suspected > AccessLevel::Banned);
        assert!(AccessLevel::Banned > AccessLevel::Undefined);
        assert_eq!(
            AccessLevel::Reader.cmp(&AccessLevel::Reader),
            Ordering::Equal
        );
    }

    #[test]
    fn test_i64_roundtrip_and_unknown() {
        for lvl in [
            AccessLevel::Banned,
            AccessLevel::Suspected,
            AccessLevel::Reader,
            AccessLevel::Editor,
            AccessLevel::Owner,
        ] {
            assert_eq!(AccessLevel::from_i64(lvl.as_i64()), lvl);
        }
        assert_eq!(AccessLevel::from_i64(42), AccessLevel::Undefined);
        assert_eq!(AccessLevel::parse("editor"), AccessLevel::Undefined);
        assert_eq!(AccessLevel::parse("Editor"), AccessLevel::Editor);
    }

    #[test]
    fn test_grantable_levels() {
        assert_eq!(
            AccessLevel::GRANTABLE,
            [AccessLevel::Editor, AccessLevel::Reader]
        );
        assert!(!AccessLevel::Owner.is_grantable());
        assert!(!AccessLevel::Suspected.is_grantable());
    }

    #[test]
    fn test_demotion_ladder() {
        assert_eq!(AccessLevel::Undefined.demoted(), AccessLevel::Suspected);
        assert_eq!(AccessLevel::Reader.demoted(), AccessLevel::Suspected);
        assert_eq!(AccessLevel::Suspected.demoted(), AccessLevel::Banned);
        assert_eq!(AccessLevel::Banned.demoted(), AccessLevel::Banned);
    }

    #[test]
    fn test_requirements() {
        assert!(Requirement::Read.permits(AccessLevel::Reader));
        assert!(!Requirement::Read.permits(AccessLevel::Suspected));
        assert!(Requirement::Edit.permits(AccessLevel::Owner));
        assert!(!Requirement::Edit.permits(AccessLevel::Reader));
        assert!(Requirement::Own.permits(AccessLevel::Owner));
        assert!(!Requirement::Own.permits(AccessLevel::Editor));
    }
}
