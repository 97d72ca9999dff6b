//! The closed set of conversation operations

/// What a user is in the middle of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Nothing open; the next message starts something new
    Idle,
    ShowHelp,
    /// Waiting for the new folder's name
    CreateFolder,
    /// Waiting for the folder to rename
    ChooseFolderForRename,
    /// Waiting for the new name
    RenameFolder,
    ShowFolder,
    DeleteFolder,
    LeaveFolder,
    /// Waiting for the folder to delete a link from
    ChooseFolderForLinkDeletion,
    /// Waiting for the link (tag) to delete
    DeleteLink,
    /// A URL arrived; waiting for its tag
    ChooseTag,
    /// Tag known; waiting for the destination folder
    SaveLink,
    /// Folder choice, then the key menu of that folder
    KeyMenu,
    /// Waiting for the level of the key to create
    CreateKey,
    /// Waiting for the level of the key to delete
    DeleteKey,
    /// Waiting for feedback text
    Feedback,
}

/// Kind of input an operation waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expects {
    Nothing,
    Text,
    FolderChoice,
    TagChoice,
    LevelChoice,
    MenuChoice,
}

impl Operation {
    /// Where "go back" leads from this operation.
    ///
    /// Only the key-management screens have a previous screen; every other
    /// operation maps to itself.
    pub fn back(self) -> Operation {
        match self {
            Operation::CreateKey | Operation::DeleteKey => Operation::KeyMenu,
            Operation::KeyMenu => Operation::KeyMenu,
            other => other,
        }
    }

    pub fn expects(self) -> Expects {
        match self {
            Operation::Idle | Operation::ShowHelp => Expects::Nothing,
            Operation::CreateFolder | Operation::RenameFolder | Operation::Feedback => {
                Expects::Text
            }
            Operation::ChooseTag => Expects::Text,
            Operation::ChooseFolderForRename
            | Operation::ShowFolder
            | Operation::DeleteFolder
            | Operation::LeaveFolder
            | Operation::ChooseFolderForLinkDeletion
            | Operation::SaveLink => Expects::FolderChoice,
            Operation::DeleteLink => Expects::TagChoice,
            Operation::KeyMenu => Expects::MenuChoice,
            Operation::CreateKey | Operation::DeleteKey => Expects::LevelChoice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Operation; 16] = [
        Operation::Idle,
        Operation::ShowHelp,
        Operation::CreateFolder,
        Operation::ChooseFolderForRename,
        Operation::RenameFolder,
        Operation::ShowFolder,
        Operation::DeleteFolder,
        Operation::LeaveFolder,
        Operation::ChooseFolderForLinkDeletion,
        Operation::DeleteLink,
        Operation::ChooseTag,
        Operation::SaveLink,
        Operation::KeyMenu,
        Operation::CreateKey,
        Operation::DeleteKey,
        Operation::Feedback,
    ];

    #[test]
    fn test_back_table() {
        assert_eq!(Operation::CreateKey.back(), Operation::KeyMenu);
        assert_eq!(Operation::DeleteKey.back(), Operation::KeyMenu);
        assert_eq!(Operation::KeyMenu.back(), Operation::KeyMenu);

        for op in ALL {
            if !matches!(
                op,
                Operation::CreateKey | Operation::DeleteKey | Operation::KeyMenu
            ) {
                assert_eq!(op.back(), op, "{:?} should not move on back", op);
            }
        }
    }

    #[test]
    fn test_back_is_at_most_two_levels() {
        for op in ALL {
            assert_eq!(op.back().back(), op.back());
        }
    }

    #[test]
    fn test_expects() {
        assert_eq!(Operation::Idle.expects(), Expects::Nothing);
        assert_eq!(Operation::ChooseTag.expects(), Expects::Text);
        assert_eq!(Operation::SaveLink.expects(), Expects::FolderChoice);
        assert_eq!(Operation::DeleteLink.expects(), Expects::TagChoice);
        assert_eq!(Operation::CreateKey.expects(), Expects::LevelChoice);
    }
}
