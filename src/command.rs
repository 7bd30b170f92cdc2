//! Line command parser
//!
//! Turns one input line into a [`Command`]. Parsing is total: every string
//! maps to either a command or "no command" (`None`).

use crate::types::{RegistryName, SENTINEL};

/// Broadcast keyword
pub const ALL: &str = "/all";
/// Active user listing keyword
pub const WHO: &str = "/who";
/// Usage keyword
pub const HELP: &str = "/help";
/// Disconnect keyword
pub const QUIT: &str = "/quit";

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/all <text>`; text may be empty
    Broadcast(String),
    /// `@<name> <text>`
    PrivateMessage { target: RegistryName, text: String },
    /// `/who`
    Who,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Any other first word
    Unknown(String),
    /// Blank line
    Empty,
}

/// Parse a single line.
///
/// Returns `None` for a private-message token with no text (`@name`),
/// which callers ignore.
pub fn parse(line: &str) -> Option<Command> {
    if line.is_empty() {
        return Some(Command::Empty);
    }

    let (head, rest) = split_first_word(line);

    if line.starts_with(SENTINEL) {
        return match rest {
            Some(text) if !text.is_empty() => Some(Command::PrivateMessage {
                target: RegistryName(head.to_string()),
                text: text.to_string(),
            }),
            _ => None,
        };
    }

    let text = rest.unwrap_or_default();
    let cmd = match head {
        "" => Command::Empty,
        ALL => Command::Broadcast(text.to_string()),
        WHO => Command::Who,
        HELP => Command::Help,
        QUIT => Command::Quit,
        other => Command::Unknown(other.to_string()),
    };
    Some(cmd)
}

/// Split at the first whitespace run: `(first word, remainder)`.
fn split_first_word(line: &str) -> (&str, Option<&str>) {
    match line.find(char::is_whitespace) {
        Some(idx) => {
            let (head, rest) = line.split_at(idx);
            (head, Some(rest.trim_start()))
        }
        None => (line, None),
    }
}
