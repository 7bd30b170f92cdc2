//! Per-connection session
//!
//! Drives one participant from name negotiation to disconnect:
//! `Connecting → NegotiatingName → Active → Closed`. The session never
//! touches other sessions directly; everything shared goes through the
//! [`RegistryHandle`].

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Duration, Instant};
use tokio_util::codec::LinesCodecError;
use tracing::{debug, info, warn};

use crate::command::{self, Command};
use crate::config::ServerConfig;
use crate::error::{AppError, NameRejection};
use crate::message::Notice;
use crate::server::RegistryHandle;
use crate::types::{RegistryName, SessionId, Slot};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    NegotiatingName,
    Active,
    /// Terminal
    Closed,
}

/// Result of one deadline-bounded read
enum Read {
    Line(String),
    /// Deadline elapsed with no input
    Idle,
    /// Peer closed the stream
    Closed,
}

/// One connected participant
pub struct Session {
    id: SessionId,
    slot: Slot,
    raw_name: Option<String>,
    registry_name: Option<RegistryName>,
    state: SessionState,
    server: RegistryHandle,
    /// Feeds this connection's writer task
    outbound: mpsc::UnboundedSender<String>,
    config: Arc<ServerConfig>,
}

impl Session {
    /// Create a session for a connection that already holds `slot`
    pub fn new(
        id: SessionId,
        slot: Slot,
        server: RegistryHandle,
        outbound: mpsc::UnboundedSender<String>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            id,
            slot,
            raw_name: None,
            registry_name: None,
            state: SessionState::Connecting,
            server,
            outbound,
            config,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Display name, once negotiated
    pub fn raw_name(&self) -> Option<&str> {
        self.raw_name.as_deref()
    }

    pub fn registry_name(&self) -> Option<&RegistryName> {
        self.registry_name.as_ref()
    }

    /// Run the session to completion.
    ///
    /// Always ends in `Closed` with the slot released, whatever the outcome.
    pub async fn run<L>(mut self, mut lines: L) -> Result<(), AppError>
    where
        L: Stream<Item = Result<String, LinesCodecError>> + Unpin,
    {
        self.state = SessionState::NegotiatingName;
        let result = self.drive(&mut lines).await;
        self.close().await;
        result
    }

    async fn drive<L>(&mut self, lines: &mut L) -> Result<(), AppError>
    where
        L: Stream<Item = Result<String, LinesCodecError>> + Unpin,
    {
        match self.negotiate_name(lines).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!("Session {} went away during name negotiation", self.id);
                return Ok(());
            }
            Err(AppError::NameNegotiationExhausted { tries }) => {
                self.send(Notice::NegotiationFailed).await?;
                return Err(AppError::NameNegotiationExhausted { tries });
            }
            Err(e) => return Err(e),
        }

        self.state = SessionState::Active;
        self.main_loop(lines).await
    }

    /// Prompt for a name until one is accepted or the try budget runs out.
    ///
    /// `Ok(None)` means the peer disconnected or stayed silent past the
    /// read deadline.
    pub(crate) async fn negotiate_name<L>(
        &mut self,
        lines: &mut L,
    ) -> Result<Option<RegistryName>, AppError>
    where
        L: Stream<Item = Result<String, LinesCodecError>> + Unpin,
    {
        let tries = self.config.max_name_tries;

        for _ in 0..tries {
            self.send(Notice::EnterName).await?;

            let line = match self.read_line(lines).await? {
                Read::Line(line) => line,
                Read::Idle | Read::Closed => return Ok(None),
            };

            match self.server.claim_name(self.id, &line).await {
                Ok(name) => {
                    self.raw_name = Some(name.display_name().to_string());
                    self.registry_name = Some(name.clone());
                    return Ok(Some(name));
                }
                Err(AppError::NameRejected(reason)) => {
                    debug!("Session {} name rejected: {}", self.id, reason);
                    match &reason {
                        NameRejection::ContainsSentinel => {
                            self.send(Notice::NameContainsSentinel).await?
                        }
                        NameRejection::AlreadyTaken(name) => {
                            self.send(Notice::NameAlreadyUsed(name)).await?
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::NameNegotiationExhausted { tries })
    }

    async fn main_loop<L>(&mut self, lines: &mut L) -> Result<(), AppError>
    where
        L: Stream<Item = Result<String, LinesCodecError>> + Unpin,
    {
        loop {
            let started = Instant::now();
            let line = match self.read_line(lines).await? {
                Read::Line(line) => line,
                Read::Idle => return self.close_inactive(started.elapsed()).await,
                Read::Closed => {
                    debug!("Session {} closed by peer", self.id);
                    return Ok(());
                }
            };
            let idle = started.elapsed();

            if let Some(cmd) = command::parse(&line) {
                if !self.dispatch(cmd).await? {
                    return Ok(());
                }
            }

            if idle >= self.config.max_inactive {
                return self.close_inactive(idle).await;
            }
        }
    }

    /// Execute one command. Returns `false` when the session should end.
    async fn dispatch(&mut self, cmd: Command) -> Result<bool, AppError> {
        let from = self.raw_name.clone().unwrap_or_default();

        match cmd {
            Command::Who => {
                let names = self.server.list_active_names().await?;
                self.send_line(names.join("\n")).await?;
            }
            Command::PrivateMessage { target, text } => {
                let line = Notice::Chat { from: &from, text: &text }.to_string();
                self.server.private_message(self.id, target, line).await?;
            }
            Command::Broadcast(text) => {
                let line = Notice::Chat { from: &from, text: &text }.to_string();
                self.server.broadcast(self.id, line).await?;
            }
            Command::Help => self.send(Notice::Usage).await?,
            Command::Quit => {
                info!("Session {} ('{}') quit", self.id, from);
                return Ok(false);
            }
            Command::Unknown(token) => {
                debug!("Session {} sent unknown command '{}'", self.id, token);
            }
            Command::Empty => {}
        }

        Ok(true)
    }

    async fn close_inactive(&mut self, idle: Duration) -> Result<(), AppError> {
        let idle_secs = idle.as_secs();
        let max_secs = self.config.max_inactive.as_secs();

        info!(
            "{} have been inactive for {}s (max {}s), closing session {}",
            self.raw_name.as_deref().unwrap_or("Unknown"),
            idle_secs,
            max_secs,
            self.id
        );
        self.send(Notice::Inactive {
            idle_secs,
            max_secs,
        })
        .await
    }

    /// Enter `Closed`: release the slot, announcing the departure if active
    async fn close(&mut self) {
        let announce = self.state == SessionState::Active;
        self.state = SessionState::Closed;

        if let Err(e) = self.server.leave(self.id, announce).await {
            warn!("Session {} could not leave registry: {}", self.id, e);
        }
    }

    async fn read_line<L>(&self, lines: &mut L) -> Result<Read, AppError>
    where
        L: Stream<Item = Result<String, LinesCodecError>> + Unpin,
    {
        match time::timeout(self.config.read_timeout, lines.next()).await {
            Err(_) => Ok(Read::Idle),
            Ok(None) => Ok(Read::Closed),
            Ok(Some(Ok(line))) => Ok(Read::Line(line)),
            Ok(Some(Err(e))) => Err(e.into()),
        }
    }

    async fn send(&self, notice: Notice<'_>) -> Result<(), AppError> {
        self.send_line(notice.to_string()).await
    }

    async fn send_line(&self, line: String) -> Result<(), AppError> {
        self.outbound
            .send(line)
            .map_err(|_| AppError::ChannelSend)
    }
}
