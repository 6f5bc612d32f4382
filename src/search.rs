//! Repository search with keystroke debouncing.
//!
//! Every keystroke bumps a pending counter and schedules a check after the
//! quiet period. A check only searches if it brings the counter back to
//! zero, i.e. no keystroke came in after the one that scheduled it. The
//! search then uses whatever the input holds at that moment.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::api::DriveApi;
use crate::logging::LogManager;
use crate::sync_engine::types::SearchResults;
use crate::upload::REPO_SCHEME;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);
pub const MIN_QUERY_LEN: usize = 2;
pub const DEFAULT_SEARCH_ITEMS: usize = 25;

pub const SELECT_TITLE: &str = "Load cartridge?";
pub const SELECT_QUESTION: &str =
    "Confirm & click the load button of the drive into which you want to load.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub min_len: usize,
    pub items: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_len: MIN_QUERY_LEN,
            items: DEFAULT_SEARCH_ITEMS,
        }
    }
}

/// A confirmed search hit waiting for the next slot action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    reference: String,
}

impl PendingSelection {
    pub fn from_hit(hit: &str) -> Self {
        Self {
            reference: format!("{REPO_SCHEME}{hit}"),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

/// State shared between the debouncer and its scheduled checks.
struct Shared<A: DriveApi> {
    api: Arc<A>,
    log: Arc<LogManager>,
    settings: SearchSettings,
    pending: AtomicUsize,
    input: watch::Sender<String>,
    results: watch::Sender<Option<SearchResults>>,
    cancel: CancellationToken,
}

impl<A: DriveApi> Shared<A> {
    async fn search(&self, term: &str) -> Option<SearchResults> {
        if term.chars().count() < self.settings.min_len {
            return None;
        }

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            outcome = self.api.search(term, self.settings.items) => outcome,
        };

        match outcome {
            Ok(mut results) => {
                results.hits.retain(|h| !h.is_empty());
                self.log.info(
                    &format!("search '{term}': {} total hits", results.total),
                    None,
                );
                self.results.send_replace(Some(results.clone()));
                Some(results)
            }
            Err(e) => {
                self.log.error(&format!("search '{term}' failed: {e}"), None);
                None
            }
        }
    }
}

pub struct SearchDebouncer<A: DriveApi> {
    shared: Arc<Shared<A>>,
}

impl<A: DriveApi> SearchDebouncer<A> {
    pub fn new(
        api: Arc<A>,
        log: Arc<LogManager>,
        settings: SearchSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                log,
                settings,
                pending: AtomicUsize::new(0),
                input: watch::Sender::new(String::new()),
                results: watch::Sender::new(None),
                cancel,
            }),
        }
    }

    /// Records the current input value and schedules a quiet-period check.
    /// Must be called from within a tokio runtime.
    pub fn keystroke(&self, value: impl Into<String>) {
        self.shared.input.send_replace(value.into());
        self.shared.pending.fetch_add(1, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shared.cancel.cancelled() => return,
                _ = tokio::time::sleep(shared.settings.debounce) => {}
            }

            if shared.pending.fetch_sub(1, Ordering::SeqCst) != 1 {
                return;
            }

            let term = shared.input.borrow().clone();
            shared.search(&term).await;
        });
    }

    /// Searches immediately, bypassing the quiet period.
    pub async fn search_now(&self, term: &str) -> Option<SearchResults> {
        self.shared.input.send_replace(term.to_string());
        self.shared.search(term).await
    }

    pub fn input(&self) -> String {
        self.shared.input.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SearchResults>> {
        self.shared.results.subscribe()
    }

    pub fn latest_results(&self) -> Option<SearchResults> {
        self.shared.results.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedApi;
    use tokio::time::{sleep, Instant};

    fn debouncer(api: Arc<ScriptedApi>, cancel: CancellationToken) -> SearchDebouncer<ScriptedApi> {
        SearchDebouncer::new(api, Arc::new(LogManager::new(100)), SearchSettings::default(), cancel)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_search() {
        let api = Arc::new(ScriptedApi::new());
        let search = debouncer(api.clone(), CancellationToken::new());
        let start = Instant::now();

        search.keystroke("ma");
        sleep(Duration::from_millis(100)).await;
        search.keystroke("man");
        sleep(Duration::from_millis(100)).await;
        search.keystroke("mani");
        sleep(Duration::from_millis(500)).await;
        search.keystroke("manic");
        sleep(Duration::from_millis(2000)).await;

        let searches = api.searches();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].0, "manic");
        // quiet period measured from the last keystroke at 700ms
        assert_eq!(searches[0].1 - start, Duration::from_millis(1300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_keystrokes_search_each_time() {
        let api = Arc::new(ScriptedApi::new());
        let search = debouncer(api.clone(), CancellationToken::new());

        search.keystroke("ze");
        sleep(Duration::from_millis(700)).await;
        search.keystroke("zed");
        sleep(Duration::from_millis(700)).await;

        let terms: Vec<String> = api.searches().into_iter().map(|s| s.0).collect();
        assert_eq!(terms, vec!["ze", "zed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_suppressed() {
        let api = Arc::new(ScriptedApi::new());
        let search = debouncer(api.clone(), CancellationToken::new());

        search.keystroke("m");
        sleep(Duration::from_millis(1000)).await;
        assert!(api.searches().is_empty());
        assert_eq!(search.search_now("").await, None);
        assert!(api.searches().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_scheduled_checks() {
        let api = Arc::new(ScriptedApi::new());
        let cancel = CancellationToken::new();
        let search = debouncer(api.clone(), cancel.clone());

        search.keystroke("jetpac");
        sleep(Duration::from_millis(300)).await;
        cancel.cancel();
        sleep(Duration::from_millis(1000)).await;
        assert!(api.searches().is_empty());
    }

    #[tokio::test]
    async fn test_results_published_without_empty_hits() {
        let api = Arc::new(ScriptedApi::new());
        api.set_search_results(SearchResults {
            total: 2,
            hits: vec!["ql/Zkul.mdv".into(), "".into(), "zx/Zynaps.z80".into()],
        });
        let search = debouncer(api.clone(), CancellationToken::new());
        let rx = search.subscribe();

        let results = search.search_now("z").await;
        assert!(results.is_none());

        let results = search.search_now("zy").await.unwrap();
        assert_eq!(results.hits, vec!["ql/Zkul.mdv", "zx/Zynaps.z80"]);
        assert_eq!(rx.borrow().as_ref().map(|r| r.total), Some(2));
        assert_eq!(search.input(), "zy");
    }

    #[test]
    fn test_pending_selection_reference() {
        let sel = PendingSelection::from_hit("spectrum/Jetpac.z80");
        assert_eq!(sel.reference(), "repo://spectrum/Jetpac.z80");
    }
}
