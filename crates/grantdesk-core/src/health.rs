//! Background health probing
//!
//! Probes the remote store on a fixed interval for as long as the monitor
//! is alive. The task holds only a weak reference, so it also ends on its
//! own once the workspace is gone.

use crate::controller::Workspace;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to the probing task; dropping it stops probing
#[derive(Debug)]
pub struct HealthMonitor {
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start probing at the workspace's configured interval
    ///
    /// The first probe runs immediately.
    #[must_use]
    pub fn spawn(workspace: &Arc<Workspace>) -> Self {
        let interval = workspace.config().health_interval();
        Self::spawn_with_interval(workspace, interval)
    }

    /// Start probing at an explicit interval
    #[must_use]
    pub fn spawn_with_interval(workspace: &Arc<Workspace>, interval: Duration) -> Self {
        let workspace = Arc::downgrade(workspace);
        let handle = tokio::spawn(probe_loop(workspace, interval));
        Self { handle }
    }

    /// Whether the task is still running
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop probing
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn probe_loop(workspace: Weak<Workspace>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(workspace) = workspace.upgrade() else {
            tracing::debug!("workspace dropped, health monitor exiting");
            return;
        };
        let connected = workspace.probe_health().await;
        tracing::trace!(connected, "health probe completed");
    }
}
