//! Multi-user line chat server library
//!
//! A tokio-based TCP chat server speaking a newline-delimited text
//! protocol. Participants pick a unique name, then exchange broadcast
//! (`/all`) and private (`@name`) messages.
//!
//! # Commands
//! - `/all <text>` - message every other participant
//! - `@<name> <text>` - private message, echoed back to the sender
//! - `/who` - list participants
//! - `/help` - usage text
//! - `/quit` - leave the chat
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the single owner of the fixed-capacity `SessionRegistry`
//! - Each connection runs a `Session` task talking to it via `RegistryHandle`
//! - A per-connection writer task drains the session's outbound lines
//! - No locks needed - all registry access goes through message passing
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use relay_chat::{handle_connection, ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(ServerConfig::default());
//!     let listener = TcpListener::bind(config.bind_addr).await.unwrap();
//!     let registry = ChatServer::spawn(config.max_sessions);
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(stream, registry.clone(), config.clone()));
//!     }
//! }
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use command::{parse, Command};
pub use config::ServerConfig;
pub use error::{AppError, ConfigError, NameRejection, SendError};
pub use handler::handle_connection;
pub use message::Notice;
pub use registry::SessionRegistry;
pub use server::{ChatServer, RegistryHandle, ServerCommand};
pub use session::{Session, SessionState};
pub use types::{RegistryName, SessionId, Slot, SENTINEL};
