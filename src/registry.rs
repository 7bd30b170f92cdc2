//! Session registry
//!
//! Fixed-capacity slot table of connected clients. Owns name uniqueness
//! and broadcast enumeration. Not synchronized itself: the
//! [`ChatServer`](crate::server::ChatServer) actor is its only owner.

use tracing::debug;

use crate::client::Client;
use crate::error::{AppError, NameRejection};
use crate::types::{RegistryName, SessionId, Slot, SENTINEL};

/// Default number of concurrent sessions
pub const DEFAULT_CAPACITY: usize = 10;

/// Slot-indexed table of connected clients
#[derive(Debug)]
pub struct SessionRegistry {
    slots: Vec<Option<Client>>,
}

impl SessionRegistry {
    /// Create an empty registry with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Place a client in the first free slot.
    pub fn register(&mut self, client: Client) -> Result<Slot, AppError> {
        let capacity = self.capacity();
        let Some(index) = self.slots.iter().position(Option::is_none) else {
            return Err(AppError::CapacityExceeded { capacity });
        };

        debug!("Session {} registered in slot {}", client.id, index);
        self.slots[index] = Some(client);
        Ok(Slot(index))
    }

    /// Clear every slot holding `id`, returning the removed client.
    ///
    /// Idempotent: unregistering an absent session is a no-op.
    pub fn unregister(&mut self, id: SessionId) -> Option<Client> {
        let mut removed = None;
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|c| c.id == id) {
                removed = slot.take();
            }
        }
        removed
    }

    pub fn get(&self, id: SessionId) -> Option<&Client> {
        self.occupied().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: SessionId) -> Option<&mut Client> {
        self.slots.iter_mut().flatten().find(|c| c.id == id)
    }

    /// First client registered under `name`, in slot order
    pub fn lookup_by_name(&self, name: &RegistryName) -> Option<&Client> {
        self.occupied().find(|c| c.is_named(name))
    }

    pub fn is_name_taken(&self, name: &RegistryName) -> bool {
        self.lookup_by_name(name).is_some()
    }

    /// Validate `raw_name` and assign it to the session `id`.
    ///
    /// The uniqueness check and the assignment happen under the same
    /// `&mut self` borrow, so two sessions can never claim one name.
    pub fn claim_name(
        &mut self,
        id: SessionId,
        raw_name: &str,
    ) -> Result<RegistryName, NameRejection> {
        let raw_name = raw_name.trim();
        if raw_name.contains(SENTINEL) {
            return Err(NameRejection::ContainsSentinel);
        }

        let name = RegistryName::from_display_name(raw_name);
        if self.is_name_taken(&name) {
            return Err(NameRejection::AlreadyTaken(raw_name.to_string()));
        }

        // An unknown id has no slot to name; treat it like a lost race.
        let Some(client) = self.get_mut(id) else {
            return Err(NameRejection::AlreadyTaken(raw_name.to_string()));
        };
        client.name = Some(name.clone());
        Ok(name)
    }

    /// Display names of every named session, in slot order
    pub fn list_active_names(&self) -> Vec<String> {
        self.occupied()
            .filter(|c| c.has_name())
            .map(|c| c.display_name().to_string())
            .collect()
    }

    /// Named sessions other than `exclude`, in slot order
    pub fn broadcast_targets(&self, exclude: SessionId) -> impl Iterator<Item = &Client> {
        self.occupied()
            .filter(move |c| c.id != exclude && c.has_name())
    }

    fn occupied(&self) -> impl Iterator<Item = &Client> {
        self.slots.iter().flatten()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
