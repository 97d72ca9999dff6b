//! Inbound text classification

use crate::access::AccessKey;

/// Known slash commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Random,
    CreateFolder,
    RenameFolder,
    ShowFolder,
    DeleteFolder,
    LeaveFolder,
    DeleteLink,
    Keys,
    Feedback,
    Cancel,
}

impl Command {
    pub const ALL: [Command; 12] = [
        Command::Start,
        Command::Help,
        Command::Random,
        Command::CreateFolder,
        Command::RenameFolder,
        Command::ShowFolder,
        Command::DeleteFolder,
        Command::LeaveFolder,
        Command::DeleteLink,
        Command::Keys,
        Command::Feedback,
        Command::Cancel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Start => "/start",
            Command::Help => "/help",
            Command::Random => "/rnd",
            Command::CreateFolder => "/create_folder",
            Command::RenameFolder => "/rename_folder",
            Command::ShowFolder => "/show_folder",
            Command::DeleteFolder => "/delete_folder",
            Command::LeaveFolder => "/leave_folder",
            Command::DeleteLink => "/delete_link",
            Command::Keys => "/keys",
            Command::Feedback => "/feedback",
            Command::Cancel => "/cancel",
        }
    }

    /// Parse `/name` or `/name@botname`
    pub fn parse(text: &str) -> Option<Self> {
        let name = text.split('@').next().unwrap_or(text);
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

/// What an inbound text message is, by priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    Url(&'a str),
    Key(&'a str),
    Cancel,
    Command(Command),
    UnknownCommand,
    Text(&'a str),
}

impl<'a> Input<'a> {
    pub fn classify(text: &'a str) -> Self {
        if is_url(text) {
            return Input::Url(text);
        }
        if AccessKey::is_well_formed(text) {
            return Input::Key(text);
        }
        if text.starts_with('/') {
            return match Command::parse(text) {
                Some(Command::Cancel) => Input::Cancel,
                Some(command) => Input::Command(command),
                None => Input::UnknownCommand,
            };
        }
        Input::Text(text)
    }
}

/// Absolute URL with a host
pub fn is_url(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    reqwest::Url::parse(text)
        .map(|url| url.host_str().is_some_and(|host| !host.is_empty()))
        .unwrap_or(false)
}
