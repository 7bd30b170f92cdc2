//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `SessionId`: UUID-based unique session identifier
//! - `Slot`: position of a session in the fixed-capacity registry
//! - `RegistryName`: sentinel-prefixed unique name key

use uuid::Uuid;

/// Reserved character marking private-message targets.
///
/// Never allowed inside a user-supplied name.
pub const SENTINEL: char = '@';

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe session identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry slot index, stable for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(pub usize);

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registered name key (`@` followed by the display name)
///
/// Private messages address sessions by this key, so a target token
/// parsed from input is already a `RegistryName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryName(pub String);

impl RegistryName {
    /// Build the registry key for a raw display name
    pub fn from_display_name(name: &str) -> Self {
        Self(format!("{}{}", SENTINEL, name))
    }

    /// The display name without the sentinel prefix
    pub fn display_name(&self) -> &str {
        self.0.strip_prefix(SENTINEL).unwrap_or(self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegistryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
