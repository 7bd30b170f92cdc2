//! Relay Chat Server - Entry Point
//!
//! Starts the TCP listener and ChatServer actor, accepting connections.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use relay_chat::server::COMMAND_BUFFER_SIZE;
use relay_chat::{handle_connection, AppError, ChatServer, RegistryHandle, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=relay_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("relay_chat=info")),
        )
        .init();

    // Bind address from the command line, limits from CHAT_* variables
    let config = Arc::new(ServerConfig::from_env()?);

    // Start TCP listener
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Chat server listening on {}", config.bind_addr);

    // Create ChatServer actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
    let server = ChatServer::new(cmd_rx, config.max_sessions);
    tokio::spawn(server.run());
    let registry = RegistryHandle::new(cmd_tx);

    info!("ChatServer actor started");

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let registry = registry.clone();
                let config = Arc::clone(&config);

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    match handle_connection(stream, registry, config).await {
                        Ok(()) => {}
                        Err(AppError::CapacityExceeded { capacity }) => {
                            info!(
                                "Rejected {}: all {} slots in use, try later",
                                addr, capacity
                            );
                        }
                        Err(e @ AppError::NameNegotiationExhausted { .. }) => {
                            info!("Closed {}: {}", addr, e);
                        }
                        Err(e) => {
                            error!("Connection handler error for {}: {}", addr, e);
                        }
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
