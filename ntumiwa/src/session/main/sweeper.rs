use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::manager::SessionManager;

/// Handle to the background task that removes expired sessions.
///
/// The task runs until [`SweeperHandle::shutdown`] is called or the handle is dropped.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Session sweeper task failed");
        }
    }
}

/// Starts sweeping the store every `gc_interval`. The first sweep happens one interval
/// after the call.
pub fn spawn_sweeper(manager: Arc<SessionManager>) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let period = manager.config().gc_interval;

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        tracing::info!(interval = ?period, "Session sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match manager.sweep().await {
                        Ok(0) => {}
                        Ok(removed) => tracing::debug!(removed, "Swept expired sessions"),
                        Err(e) => tracing::error!(error = %e, "Session sweep failed"),
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Session sweeper stopped");
    });

    SweeperHandle { shutdown_tx, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::config::SessionConfig;
    use crate::session::store::{InMemorySessionStore, SessionStore};
    use crate::session::types::Session;
    use chrono::{TimeDelta, Utc};
    use std::time::Duration;

    fn manager(store: Arc<InMemorySessionStore>, gc: Duration) -> Arc<SessionManager> {
        let config = SessionConfig::new("sid", &[3u8; 32])
            .unwrap()
            .with_idle_expiration(TimeDelta::minutes(1))
            .with_gc_interval(gc);
        Arc::new(SessionManager::new(config, store))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_sessions() {
        // Given an idle session in the store
        let store = Arc::new(InMemorySessionStore::new());
        let mut idle = Session::new().unwrap();
        idle.last_activity_at = Utc::now() - TimeDelta::minutes(2);
        store.write(&idle).await.unwrap();

        let sweeper = spawn_sweeper(manager(store.clone(), Duration::from_secs(60)));

        // When one interval elapses
        tokio::time::sleep(Duration::from_secs(61)).await;

        // Then the sweeper has removed it
        assert!(store.is_empty().await);
        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_shutdown() {
        let store = Arc::new(InMemorySessionStore::new());
        let sweeper = spawn_sweeper(manager(store.clone(), Duration::from_secs(3600)));

        // Returns promptly even though the next tick is an hour away
        tokio::time::timeout(Duration::from_secs(1), sweeper.shutdown())
            .await
            .expect("sweeper did not stop");
    }
}
