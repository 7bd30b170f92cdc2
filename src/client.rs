//! Client struct definition
//!
//! The registry's view of a connected session: identity, name and the
//! outbound line channel feeding its writer task.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::types::{RegistryName, SessionId};

/// Connected client information
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this session
    pub id: SessionId,
    /// Registered name (None until name negotiation succeeds)
    pub name: Option<RegistryName>,
    /// Server → Client line channel
    pub sender: mpsc::UnboundedSender<String>,
}

impl Client {
    /// Create a new, unnamed client with the given ID and sender channel
    pub fn new(id: SessionId, sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            name: None,
            sender,
        }
    }

    /// Queue a line for this client without waiting.
    ///
    /// Fails only if the client's writer is gone.
    pub fn deliver(&self, line: String) -> Result<(), SendError> {
        self.sender
            .send(line)
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Get the display name for this client
    ///
    /// Returns the name without sentinel if set, otherwise "Unknown".
    pub fn display_name(&self) -> &str {
        self.name
            .as_ref()
            .map(RegistryName::display_name)
            .unwrap_or("Unknown")
    }

    /// Check if this client has completed name negotiation
    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    /// Check if this client holds the given registry name
    pub fn is_named(&self, name: &RegistryName) -> bool {
        self.name.as_ref() == Some(name)
    }
}
