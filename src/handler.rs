//! Connection handler
//!
//! Gates a new connection on registry capacity, sets up line framing and
//! the writer task, then runs the [`Session`] to completion.

use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::server::RegistryHandle;
use crate::session::Session;
use crate::types::SessionId;

/// How long a closed session's queued lines may take to reach the peer
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle a new connection
///
/// Returns `AppError::CapacityExceeded` without constructing a session when
/// the registry is full; the stream is shut down in that case.
pub async fn handle_connection<S>(
    mut stream: S,
    server: RegistryHandle,
    config: Arc<ServerConfig>,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let session_id = SessionId::new();

    // Channel for server -> client lines
    let (line_tx, line_rx) = mpsc::unbounded_channel::<String>();

    let slot = match server.register(session_id, line_tx.clone()).await {
        Ok(slot) => slot,
        Err(e) => {
            let _ = stream.shutdown().await;
            return Err(e);
        }
    };
    info!("Session {} connected in slot {}", session_id, slot);

    let (reader, writer) = tokio::io::split(stream);
    let lines = FramedRead::new(
        reader,
        LinesCodec::new_with_max_length(config.max_line_length),
    );

    // Spawn write task (lines -> stream); ends once every sender is dropped
    let mut write_task = tokio::spawn(write_lines(writer, line_rx));

    let result = Session::new(session_id, slot, server, line_tx, config)
        .run(lines)
        .await;

    // A peer that stopped reading must not keep the socket alive
    if time::timeout(DRAIN_TIMEOUT, &mut write_task).await.is_err() {
        warn!(
            "Session {} output not drained within {:?}, dropping it",
            session_id, DRAIN_TIMEOUT
        );
        write_task.abort();
    }
    info!("Session {} disconnected", session_id);

    result
}

async fn write_lines<W>(writer: W, mut line_rx: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    while let Some(line) = line_rx.recv().await {
        if let Err(e) = sink.send(line).await {
            debug!("Write failed, ending write task: {}", e);
            break;
        }
    }

    let _ = SinkExt::<String>::close(&mut sink).await;
    debug!("Write task ended");
}
