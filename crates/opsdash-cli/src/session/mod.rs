//! Session wiring for CLI commands.

pub mod storage;

use tokio::sync::broadcast::Receiver;

use opsdash_core::SessionEvent;

use crate::output;

/// Tell the user to log in again if the session ended during a command.
///
/// Returns true if an expiry was reported.
pub fn report_expiry(events: &mut Receiver<SessionEvent>) -> bool {
    let mut expired = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Expired { reason } = event {
            tracing::debug!(%reason, "Session expired");
            expired = true;
        }
    }

    if expired {
        output::error("Session expired. Run 'opsdash login' again.");
    }
    expired
}
