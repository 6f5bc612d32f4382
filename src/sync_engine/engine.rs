use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::DriveApi;
use crate::logging::LogManager;
use crate::sync_engine::types::{StateUpdate, SyncStats, WatchResponse};

/// Wait after a failed long-poll before the next attempt.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(1000);

/// Long-poll client for `/watch`.
///
/// Exactly one request is in flight at any time; the next one starts only
/// after the previous resolved, so updates reach the callback in the order
/// the server produced them. The loop never gives up on errors and ends only
/// when its cancellation token fires.
pub struct SyncEngine<A: DriveApi> {
    api: Arc<A>,
    log: Arc<LogManager>,
    backoff: Duration,
    cancel: CancellationToken,
}

impl<A: DriveApi> SyncEngine<A> {
    pub fn new(api: Arc<A>, log: Arc<LogManager>, cancel: CancellationToken) -> Self {
        Self {
            api,
            log,
            backoff: DEFAULT_BACKOFF,
            cancel,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn run(&self, mut on_update: impl FnMut(StateUpdate)) -> SyncStats {
        let mut stats = SyncStats::default();

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                outcome = self.api.watch() => outcome,
            };

            match outcome {
                Ok(WatchResponse::Update(update)) => {
                    stats.updates += 1;
                    on_update(update);
                }
                // server held the request without news; poll again right away
                Ok(WatchResponse::NoUpdate) => stats.idle_cycles += 1,
                Err(e) => {
                    stats.failures += 1;
                    self.log.warn(
                        &format!("watch failed ({}): {e}; retrying in {:?}", e.code(), self.backoff),
                        None,
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.backoff) => {}
                    }
                }
            }
        }

        self.log.info(
            &format!(
                "sync loop stopped after {} updates, {} idle polls, {} failures",
                stats.updates, stats.idle_cycles, stats.failures
            ),
            None,
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{failure, named_snapshot, update_with, ScriptedApi};

    fn engine(api: Arc<ScriptedApi>, cancel: CancellationToken) -> SyncEngine<ScriptedApi> {
        SyncEngine::new(api, Arc::new(LogManager::new(100)), cancel)
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_update_repolls_immediately_without_reconcile() {
        let api = Arc::new(ScriptedApi::new());
        let cancel = CancellationToken::new();
        api.script_watch([Ok(WatchResponse::NoUpdate), Ok(WatchResponse::NoUpdate)], cancel.clone());

        let mut seen = 0;
        let stats = engine(api.clone(), cancel).run(|_| seen += 1).await;

        assert_eq!(seen, 0);
        assert_eq!(stats.idle_cycles, 2);
        let polls = api.watch_instants();
        assert_eq!(polls.len(), 3);
        assert_eq!(polls[1], polls[0]);
        assert_eq!(polls[2], polls[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_backs_off_one_second() {
        let api = Arc::new(ScriptedApi::new());
        let cancel = CancellationToken::new();
        api.script_watch(
            [Err(failure()), Err(failure()), Ok(WatchResponse::NoUpdate)],
            cancel.clone(),
        );

        let stats = engine(api.clone(), cancel).run(|_| {}).await;

        assert_eq!(stats.failures, 2);
        let polls = api.watch_instants();
        assert_eq!(polls.len(), 4);
        assert!(polls[1] - polls[0] >= Duration::from_millis(1000));
        assert!(polls[2] - polls[1] >= Duration::from_millis(1000));
        // no backoff after an empty cycle
        assert_eq!(polls[3], polls[2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_delivered_in_order() {
        let api = Arc::new(ScriptedApi::new());
        let cancel = CancellationToken::new();
        api.script_watch(
            ["a", "b", "c"].map(|c| Ok(WatchResponse::Update(update_with(named_snapshot(), c)))),
            cancel.clone(),
        );

        let mut clients = Vec::new();
        let stats = engine(api, cancel).run(|u| clients.push(u.client)).await;

        assert_eq!(clients, vec!["a", "b", "c"]);
        assert_eq!(stats.updates, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let api = Arc::new(ScriptedApi::new());
        let cancel = CancellationToken::new();
        // a separate token keeps the script from cancelling the loop itself
        api.script_watch([Err(failure())], CancellationToken::new());

        let engine = engine(api.clone(), cancel.clone()).with_backoff(Duration::from_secs(60));
        let handle = tokio::spawn(async move { engine.run(|_| {}).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        let stats = handle.await.unwrap();

        assert_eq!(stats.failures, 1);
        assert_eq!(api.watch_instants().len(), 1);
    }
}
