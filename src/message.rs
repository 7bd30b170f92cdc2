//! Server → client texts
//!
//! Every line the server emits is rendered from a [`Notice`], so the
//! wire texts live in one place.

use std::fmt;

use crate::command::{ALL, HELP, QUIT};
use crate::types::SENTINEL;

/// Server → Client notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice<'a> {
    /// Name prompt
    EnterName,
    /// Proposed name contains the sentinel
    NameContainsSentinel,
    /// Proposed name is held by another session
    NameAlreadyUsed(&'a str),
    /// Sent to a session once its name is accepted
    Welcome(&'a str),
    /// Join announcement
    Joined(&'a str),
    /// Leave announcement
    Leaving(&'a str),
    /// Chat line, broadcast or private
    Chat { from: &'a str, text: &'a str },
    /// Usage text
    Usage,
    /// Inactivity closure
    Inactive { idle_secs: u64, max_secs: u64 },
    /// Name negotiation ran out of tries
    NegotiationFailed,
}

impl fmt::Display for Notice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::EnterName => write!(f, "Enter your name."),
            Notice::NameContainsSentinel => {
                write!(f, "The name should not contain {} character", SENTINEL)
            }
            Notice::NameAlreadyUsed(name) => write!(f, "The user name :{} is already used.", name),
            Notice::Welcome(name) => write!(
                f,
                "Welcome {} to our chat room.\nTo leave enter {} in a new line.",
                name, QUIT
            ),
            Notice::Joined(name) => {
                write!(f, "*** A new user {} entered the chat room !!! ***", name)
            }
            Notice::Leaving(name) => {
                write!(f, "*** The user {} is leaving the chat room !!! ***", name)
            }
            Notice::Chat { from, text } => write!(f, "<{}> {}", from, text),
            Notice::Usage => {
                write!(f, "Usage:\n\n")?;
                writeln!(f, "{} to send message to all users.", ALL)?;
                writeln!(
                    f,
                    "{}user name to send message to given user. Private message",
                    SENTINEL
                )?;
                writeln!(f, "{} to exit from chat", QUIT)?;
                writeln!(f, "{} to print this help info", HELP)
            }
            Notice::Inactive {
                idle_secs,
                max_secs,
            } => write!(
                f,
                "You have been inactive for :{} and maximum allowed is {} seconds.\n\
                 Closing connection to chat server",
                idle_secs, max_secs
            ),
            Notice::NegotiationFailed => {
                write!(f, "Assigning user name unsuccessful. Closing connection.")
            }
        }
    }
}
