//! Message router
//!
//! Best-effort delivery on top of registry lookups. A failed delivery is
//! the recipient's problem: it is logged and never reported back to the
//! sender or allowed to stop a fan-out.

use tracing::{debug, warn};

use crate::client::Client;
use crate::error::AppError;
use crate::registry::SessionRegistry;
use crate::types::{RegistryName, SessionId};

/// Queue one line for one client. Returns whether it was accepted.
pub fn deliver_to(client: &Client, text: &str) -> bool {
    match client.deliver(text.to_string()) {
        Ok(()) => true,
        Err(e) => {
            warn!("Delivery to {} failed: {}", client.id, e);
            false
        }
    }
}

/// Deliver to every named session except `exclude`.
///
/// Returns the number of recipients that accepted the line.
pub fn deliver_to_all(registry: &SessionRegistry, exclude: SessionId, text: &str) -> usize {
    registry
        .broadcast_targets(exclude)
        .filter(|client| deliver_to(client, text))
        .count()
}

/// Deliver `text` to the session named `target` and echo it to `from`.
///
/// A sender never matches itself as a target.
pub fn deliver_private(
    registry: &SessionRegistry,
    from: SessionId,
    target: &RegistryName,
    text: &str,
) -> Result<(), AppError> {
    let Some(recipient) = registry
        .broadcast_targets(from)
        .find(|c| c.is_named(target))
    else {
        return Err(AppError::UnresolvedTarget(target.to_string()));
    };

    debug!("Private message {} -> {}", from, recipient.id);
    deliver_to(recipient, text);

    if let Some(sender) = registry.get(from) {
        deliver_to(sender, text);
    }
    Ok(())
}
