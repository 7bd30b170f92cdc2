//! ChatServer Actor implementation
//!
//! The single owner of the [`SessionRegistry`]. Sessions talk to it through
//! a [`RegistryHandle`]; since every command is processed to completion
//! before the next one, each registry operation (including the compound
//! private-message delivery) is atomic with respect to all others.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::client::Client;
use crate::error::{AppError, NameRejection};
use crate::message::Notice;
use crate::registry::SessionRegistry;
use crate::router;
use crate::types::{RegistryName, SessionId, Slot};

/// Channel buffer size for registry commands
pub const COMMAND_BUFFER_SIZE: usize = 256;

/// Commands sent from sessions to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Reserve a slot for a new connection
    Connect {
        session_id: SessionId,
        sender: mpsc::UnboundedSender<String>,
        reply: oneshot::Sender<Result<Slot, AppError>>,
    },
    /// Claim a display name; announces the join on success
    ClaimName {
        session_id: SessionId,
        raw_name: String,
        reply: oneshot::Sender<Result<RegistryName, NameRejection>>,
    },
    /// Names of all named sessions
    ListNames {
        reply: oneshot::Sender<Vec<String>>,
    },
    /// Send a line to every other named session
    Broadcast {
        session_id: SessionId,
        text: String,
    },
    /// Send a line to one named session, echoing it to the sender
    Private {
        session_id: SessionId,
        target: RegistryName,
        text: String,
    },
    /// Free the session's slot, optionally announcing the departure
    Leave {
        session_id: SessionId,
        announce: bool,
    },
}

/// The main ChatServer actor
///
/// Processes commands from sessions until every handle is dropped.
pub struct ChatServer {
    registry: SessionRegistry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with `capacity` session slots
    pub fn new(receiver: mpsc::Receiver<ServerCommand>, capacity: usize) -> Self {
        Self {
            registry: SessionRegistry::new(capacity),
            receiver,
        }
    }

    /// Spawn the actor on the current runtime and return its handle
    pub fn spawn(capacity: usize) -> RegistryHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        tokio::spawn(ChatServer::new(cmd_rx, capacity).run());
        RegistryHandle::new(cmd_tx)
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!(
            "ChatServer started with {} slots",
            self.registry.capacity()
        );

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect {
                session_id,
                sender,
                reply,
            } => {
                let result = self.registry.register(Client::new(session_id, sender));
                debug!(
                    "Connect {}: {:?}, {} of {} slots used",
                    session_id,
                    result.as_ref().ok(),
                    self.registry.len(),
                    self.registry.capacity()
                );
                let _ = reply.send(result);
            }
            ServerCommand::ClaimName {
                session_id,
                raw_name,
                reply,
            } => {
                let result = self.handle_claim_name(session_id, &raw_name);
                let _ = reply.send(result);
            }
            ServerCommand::ListNames { reply } => {
                let _ = reply.send(self.registry.list_active_names());
            }
            ServerCommand::Broadcast { session_id, text } => {
                let reached = router::deliver_to_all(&self.registry, session_id, &text);
                debug!("Broadcast from {} reached {} sessions", session_id, reached);
            }
            ServerCommand::Private {
                session_id,
                target,
                text,
            } => {
                if let Err(e) = router::deliver_private(&self.registry, session_id, &target, &text)
                {
                    debug!("Dropped private message from {}: {}", session_id, e);
                }
            }
            ServerCommand::Leave {
                session_id,
                announce,
            } => {
                self.handle_leave(session_id, announce);
            }
        }
    }

    /// Assign a name, greet the claimant and announce the join to the rest
    fn handle_claim_name(
        &mut self,
        session_id: SessionId,
        raw_name: &str,
    ) -> Result<RegistryName, NameRejection> {
        let name = self.registry.claim_name(session_id, raw_name)?;
        let shown = name.display_name();

        info!("Session {} joined as '{}'", session_id, shown);

        if let Some(client) = self.registry.get(session_id) {
            router::deliver_to(client, &Notice::Welcome(shown).to_string());
        }
        router::deliver_to_all(
            &self.registry,
            session_id,
            &Notice::Joined(shown).to_string(),
        );

        Ok(name)
    }

    /// Announce (if named and requested) and free the slot
    fn handle_leave(&mut self, session_id: SessionId, announce: bool) {
        if announce {
            if let Some(client) = self.registry.get(session_id).filter(|c| c.has_name()) {
                let line = Notice::Leaving(client.display_name()).to_string();
                router::deliver_to_all(&self.registry, session_id, &line);
            }
        }

        if let Some(client) = self.registry.unregister(session_id) {
            info!(
                "Session {} ('{}') left, {} sessions remain",
                session_id,
                client.display_name(),
                self.registry.len()
            );
        }
    }
}

/// Cloneable capability for talking to the ChatServer actor
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<ServerCommand>,
}

impl RegistryHandle {
    pub fn new(sender: mpsc::Sender<ServerCommand>) -> Self {
        Self { sender }
    }

    async fn send(&self, cmd: ServerCommand) -> Result<(), AppError> {
        self.sender.send(cmd).await.map_err(|_| AppError::ChannelSend)
    }

    /// Reserve a slot for a new connection (the capacity gate)
    pub async fn register(
        &self,
        session_id: SessionId,
        sender: mpsc::UnboundedSender<String>,
    ) -> Result<Slot, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServerCommand::Connect {
            session_id,
            sender,
            reply,
        })
        .await?;
        rx.await.map_err(|_| AppError::ChannelSend)?
    }

    /// Claim a display name for the session
    pub async fn claim_name(
        &self,
        session_id: SessionId,
        raw_name: &str,
    ) -> Result<RegistryName, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServerCommand::ClaimName {
            session_id,
            raw_name: raw_name.to_string(),
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| AppError::ChannelSend)??)
    }

    /// Display names of all named sessions, in slot order
    pub async fn list_active_names(&self) -> Result<Vec<String>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServerCommand::ListNames { reply }).await?;
        rx.await.map_err(|_| AppError::ChannelSend)
    }

    pub async fn broadcast(&self, session_id: SessionId, text: String) -> Result<(), AppError> {
        self.send(ServerCommand::Broadcast { session_id, text }).await
    }

    pub async fn private_message(
        &self,
        session_id: SessionId,
        target: RegistryName,
        text: String,
    ) -> Result<(), AppError> {
        self.send(ServerCommand::Private {
            session_id,
            target,
            text,
        })
        .await
    }

    /// Unregister the session; announces the departure when `announce` is set
    pub async fn leave(&self, session_id: SessionId, announce: bool) -> Result<(), AppError> {
        self.send(ServerCommand::Leave {
            session_id,
            announce,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn join(
        handle: &RegistryHandle,
        name: &str,
    ) -> (SessionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SessionId::new();
        handle.register(id, tx).await.unwrap();
        handle.claim_name(id, name).await.unwrap();
        (id, rx)
    }

    #[tokio::test]
    async fn test_register_until_full() {
        let handle = ChatServer::spawn(2);
        let (tx, _rx) = mpsc::unbounded_channel();

        assert_eq!(handle.register(SessionId::new(), tx.clone()).await.unwrap(), Slot(0));
        assert_eq!(handle.register(SessionId::new(), tx.clone()).await.unwrap(), Slot(1));
        assert!(matches!(
            handle.register(SessionId::new(), tx).await,
            Err(AppError::CapacityExceeded { capacity: 2 })
        ));
    }

    #[tokio::test]
    async fn test_claim_name_welcomes_and_announces() {
        let handle = ChatServer::spawn(10);
        let (_a, mut ra) = join(&handle, "A").await;
        assert_eq!(ra.recv().await.unwrap(), Notice::Welcome("A").to_string());

        let (_b, mut rb) = join(&handle, "B").await;
        assert_eq!(rb.recv().await.unwrap(), Notice::Welcome("B").to_string());
        assert_eq!(ra.recv().await.unwrap(), Notice::Joined("B").to_string());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let handle = ChatServer::spawn(10);
        let (_a, _ra) = join(&handle, "Artur").await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let id = SessionId::new();
        handle.register(id, tx).await.unwrap();
        assert!(matches!(
            handle.claim_name(id, "Artur").await,
            Err(AppError::NameRejected(NameRejection::AlreadyTaken(_)))
        ));
    }

    #[tokio::test]
    async fn test_leave_announces_and_frees_name() {
        let handle = ChatServer::spawn(10);
        let (a, mut ra) = join(&handle, "A").await;
        let (_b, mut rb) = join(&handle, "B").await;
        ra.recv().await.unwrap();
        ra.recv().await.unwrap();
        rb.recv().await.unwrap();

        handle.leave(a, true).await.unwrap();
        assert_eq!(rb.recv().await.unwrap(), Notice::Leaving("A").to_string());
        assert_eq!(handle.list_active_names().await.unwrap(), vec!["B"]);

        // Second leave is a no-op
        handle.leave(a, true).await.unwrap();
        assert_eq!(handle.list_active_names().await.unwrap(), vec!["B"]);
    }
}
