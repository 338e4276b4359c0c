//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to manage sessions without sending a prompt to the
//! backend.

/// Which session a command refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRef {
    /// 1-based position in the session list as last printed.
    Index(usize),
    /// A session id.
    Id(String),
}

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Start a new (draft) session.
    New,

    /// Print the session list.
    List,

    /// Reload the session list from the backend.
    Refresh,

    /// Open a listed session and show its history.
    Open(SessionRef),

    /// Delete a session.
    Delete(SessionRef),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a prompt.
///
/// # Examples
///
/// ```
/// # use chatterbox::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/open 2").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::New,
        "list" | "ls" => ChatCommand::List,
        "refresh" => ChatCommand::Refresh,
        "open" => match argument.map(parse_session_ref) {
            Some(target) => ChatCommand::Open(target),
            None => ChatCommand::Invalid("/open requires a list number or session id".to_string()),
        },
        "delete" | "rm" => match argument.map(parse_session_ref) {
            Some(target) => ChatCommand::Delete(target),
            None => {
                ChatCommand::Invalid("/delete requires a list number or session id".to_string())
            }
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        other => ChatCommand::Invalid(format!("unknown command /{other}; try /help")),
    };

    Some(result)
}

fn parse_session_ref(argument: &str) -> SessionRef {
    match argument.parse::<usize>() {
        Ok(index) if index > 0 => SessionRef::Index(index),
        _ => SessionRef::Id(argument.to_string()),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new chat
  /list                  List saved chats
  /refresh               Reload the chat list from the server
  /open <n|id>           Open a chat by list number or id
  /delete <n|id>         Delete a chat by list number or id
  /help                  Show this help message
  /quit                  Exit the chat
Anything else is sent as a message."#
}
