//! Waiting for the game process.

use std::time::Duration;

use tracing::debug;
use wildsplit_core::ProcessHandle;
use wildsplit_core::memory::layout::timing::ATTACH_RETRY_MS;

use crate::shutdown::ShutdownSignal;

/// Delay before resolving again after a failed resolution
pub const RESOLUTION_RETRY: Duration = Duration::from_secs(3);

/// Poll for a process named `name` until it appears.
///
/// Returns `None` if shutdown was signaled.
pub fn wait_for_process(name: &str, shutdown: &ShutdownSignal) -> Option<ProcessHandle> {
    loop {
        if shutdown.is_shutdown() {
            return None;
        }

        match ProcessHandle::find_and_open(name) {
            Ok(process) => return Some(process),
            Err(e) => debug!("{}", e),
        }

        // Wait before retry (interruptible)
        if shutdown.wait(Duration::from_millis(ATTACH_RETRY_MS)) {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::StopReason;

    #[test]
    fn test_wait_returns_on_shutdown() {
        let shutdown = ShutdownSignal::new();
        shutdown.trigger(StopReason::Interrupted);
        assert!(wait_for_process("wildsplit-no-such-process", &shutdown).is_none());
    }
}
