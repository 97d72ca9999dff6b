//! User-facing copy
//!
//! Messages are sent with HTML parse mode, so anything user-supplied goes
//! through [`escape_html`] first.

use crate::access::AccessLevel;
use crate::session::Operation;
use crate::storage::{AccessGrant, FolderEntry};

pub const HELLO: &str = "Hi! I keep your links organised in folders.\n\n\
Send me any link to save it, or enter /help to see everything I can do.";

pub const HELP: &str = "Send me a link and I'll ask for a tag and a folder to save it in.\n\n\
/create_folder - create a new folder\n\
/show_folder - show the links in a folder\n\
/rename_folder - rename a folder\n\
/delete_folder - delete a folder with all its links\n\
/delete_link - delete a link from a folder\n\
/rnd - get a random saved link\n\
/keys - manage access keys of your folders\n\
/leave_folder - leave a folder shared with you\n\
/feedback - send feedback to the developers\n\
/cancel - abort the current operation\n\n\
To get access to someone's folder, send me the key they gave you.";

pub const UNKNOWN_COMMAND: &str = "Unknown command. Enter /help to see what I can do.";
pub const UNEXPECTED_INPUT: &str = "I didn't expect that.";
pub const NO_CURRENT_OPERATION: &str = "There is no operation in progress.";
pub const OPERATION_CANCELLED: &str = "Operation cancelled.";
pub const MENU_EXPIRED: &str = "This menu is no longer active.";

pub const CHOOSE_FOLDER: &str = "Choose a folder:";
pub const NO_FOLDERS: &str = "You don't have any folders yet. Create one with /create_folder.";
pub const EMPTY_FOLDER: &str = "This folder is empty.";
pub const NO_SAVED_PAGES: &str = "You don't have any saved links yet.";
pub const ENTER_FOLDER_NAME: &str = "Enter a name for the new folder.";
pub const ENTER_NEW_FOLDER_NAME: &str = "Enter a new name for the folder.";
pub const FOLDER_CREATED: &str = "Folder created.";
pub const FOLDER_RENAMED: &str = "Folder renamed.";
pub const FOLDER_DELETED: &str = "Folder deleted.";
pub const FOLDER_LEFT: &str = "You left the folder.";
pub const OWNER_CANNOT_LEAVE: &str = "You own this folder. Delete it with /delete_folder instead.";

pub const ENTER_TAG: &str = "Enter a tag for the link.";
pub const WITHOUT_TAG: &str = "without a tag";
pub const LONG_TAG: &str = "The tag is too long. Please enter a shorter one.";
pub const SAVED: &str = "Saved!";
pub const ALREADY_EXISTS: &str = "A link with this tag already exists in this folder.";
pub const CHOOSE_LINK: &str = "Choose the link to delete:";
pub const PAGE_DELETED: &str = "Link deleted.";

pub const INCORRECT_ACCESS: &str = "You don't have enough rights for this operation.";

pub const NO_KEYS: &str = "No keys";
pub const CREATE_KEY: &str = "Create key";
pub const DELETE_KEY: &str = "Delete key";
pub const MEMBERS: &str = "Members";
pub const BACK: &str = "« Back";
pub const CHOOSE_LEVEL: &str = "Choose access level:";
pub const KEY_DELETED: &str = "Key deleted.";
pub const NO_SUCH_KEY: &str = "There is no key for this access level.";

pub const INVALID_KEY: &str = "This key is not valid.";
pub const KEY_OWNER: &str = "You are the owner of this folder.";
pub const KEY_BANNED: &str = "Access to this folder is blocked.";
pub const ALREADY_MEMBER: &str = "You already have access to this folder.";
pub const REQUEST_SENT: &str = "Your request has been sent to the folder owner.";
pub const ACCESS_DENIED: &str = "Access denied.";
pub const OWNER_NEXT_REJECTION_BLOCKS: &str = "Request declined. If you decline this user again, \
they will be blocked and you won't receive their requests for this folder anymore.";
pub const USER_BLOCKED: &str = "The user is blocked.";
pub const YES: &str = "Yes";
pub const NO: &str = "No";

pub const ENTER_FEEDBACK: &str = "Write your feedback in one message.";
pub const THANKS_FOR_FEEDBACK: &str = "Thank you for your feedback!";

const CANCEL_HINT: &str = "or enter /cancel to abort the operation.";

/// Escape text for HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// `1. tag - value` lines
fn enumerated_join<'a>(items: impl IntoIterator<Item = (&'a str, String)>) -> String {
    items
        .into_iter()
        .enumerate()
        .map(|(i, (tag, value))| format!("{}. {} - {}", i + 1, tag, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Button label for a folder in a choice menu
pub fn folder_label(folder: &FolderEntry) -> String {
    if folder.shared {
        format!("{} (shared)", folder.name)
    } else {
        folder.name.clone()
    }
}

/// `<name>:\n\n1. tag - url`
pub fn folder_contents(name: &str, tags: &[String], urls: &[String]) -> String {
    let escaped: Vec<String> = tags.iter().map(|t| escape_html(t)).collect();
    let lines = enumerated_join(
        escaped
            .iter()
            .map(String::as_str)
            .zip(urls.iter().map(|u| escape_html(u))),
    );
    format!("{}:\n\n{}", escape_html(name), lines)
}

/// Existing keys of a folder, highest level first
pub fn key_list(keys: &[(AccessLevel, String)]) -> String {
    if keys.is_empty() {
        return NO_KEYS.to_string();
    }
    enumerated_join(
        keys.iter()
            .map(|(level, key)| (level.name(), format!("<code>{}</code>", escape_html(key)))),
    )
}

pub fn key_created(level: AccessLevel, key: &str) -> String {
    format!(
        "{} key created:\n<code>{}</code>",
        level.name(),
        escape_html(key)
    )
}

pub fn member_list(folder_name: &str, members: &[AccessGrant]) -> String {
    let lines = enumerated_join(members.iter().map(|m| {
        let who = if m.username.is_empty() {
            format!("id {}", m.user_id)
        } else {
            escape_html(&m.username)
        };
        (m.level.name(), who)
    }));
    format!("Members of {}:\n\n{}", escape_html(folder_name), lines)
}

pub fn folder_added(folder_name: &str) -> String {
    format!("Folder '{}' added.", escape_html(folder_name))
}

/// Prompt sent to the owner when someone redeems a key
pub fn confirm_access(username: &str, folder_name: &str, level: AccessLevel) -> String {
    format!(
        "Grant {} access to user '{}' for folder '{}'?",
        level.name(),
        escape_html(username),
        escape_html(folder_name)
    )
}

pub fn owner_granted(username: &str, folder_name: &str) -> String {
    format!(
        "User '{}' got access to folder '{}'.",
        escape_html(username),
        escape_html(folder_name)
    )
}

pub fn user_granted(folder_name: &str, level: AccessLevel) -> String {
    format!(
        "You got {} access to folder '{}'.",
        level.name(),
        escape_html(folder_name)
    )
}

pub fn feedback(username: &str, user_id: i64, text: &str) -> String {
    format!(
        "#feedback\n\nfrom {} ({})\n\n{}",
        escape_html(username),
        user_id,
        escape_html(text)
    )
}

/// Reply to free text while a flow waits for a button
pub fn unexpected_input(operation: Operation) -> String {
    let hint = match operation {
        Operation::CreateFolder => "Enter the name of the new folder",
        Operation::RenameFolder => "Enter the new name of the folder",
        Operation::ChooseTag => "Enter a tag for the link",
        Operation::Feedback => "Enter your feedback",
        Operation::ChooseFolderForRename => "Select the folder you want to rename",
        Operation::ChooseFolderForLinkDeletion => {
            "Select the folder where you want to delete the link"
        }
        Operation::DeleteLink => "Select the link you want to delete",
        Operation::ShowFolder => "Select the folder whose contents you want to see",
        Operation::DeleteFolder => "Select the folder you want to delete",
        Operation::LeaveFolder => "Select the folder you want to leave",
        Operation::SaveLink => "Select the folder to save the link to",
        Operation::KeyMenu => "Select an option in the menu",
        Operation::CreateKey | Operation::DeleteKey => "Select an access level",
        _ => return UNEXPECTED_INPUT.to_string(),
    };
    format!("{}\n\n{} {}", UNEXPECTED_INPUT, hint, CANCEL_HINT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_contents_format() {
        let text = folder_contents(
            "Recipes",
            &["Soup".to_string()],
            &["https://x.test/1".to_string()],
        );
        assert_eq!(text, "Recipes:\n\n1. Soup - https://x.test/1");
    }

    #[test]
    fn test_user_text_is_escaped() {
        let text = folder_contents(
            "<b>",
            &["a&b".to_string()],
            &["https://x.test/?a=1&b=2".to_string()],
        );
        assert_eq!(text, "&lt;b&gt;:\n\n1. a&amp;b - https://x.test/?a=1&amp;b=2");
    }

    #[test]
    fn test_key_list() {
        assert_eq!(key_list(&[]), NO_KEYS);
        assert_eq!(
            key_list(&[
                (AccessLevel::Editor, "KEYaaa".to_string()),
                (AccessLevel::Reader, "KEYbbb".to_string()),
            ]),
            "1. Editor - <code>KEYaaa</code>\n2. Reader - <code>KEYbbb</code>"
        );
    }

    #[test]
    fn test_folder_label_marks_shared() {
        let mut folder = FolderEntry {
            id: "0123456789ab".to_string(),
            name: "Recipes".to_string(),
            shared: false,
        };
        assert_eq!(folder_label(&folder), "Recipes");

        folder.shared = true;
        assert_eq!(folder_label(&folder), "Recipes (shared)");
    }

    #[test]
    fn test_unexpected_input_hints() {
        assert_eq!(unexpected_input(Operation::Idle), UNEXPECTED_INPUT);
        let hint = unexpected_input(Operation::DeleteFolder);
        assert!(hint.contains("Select the folder you want to delete"));
        assert!(hint.contains("/cancel"));
        assert!(unexpected_input(Operation::ChooseTag).contains("Enter a tag"));
    }
}
