//! Client session.
//!
//! Owns everything a connected front end needs: the rendered UI state, the
//! pending search selection, mapping selectors and the auxiliary config
//! values. Each piece lives in a `watch` channel so front ends can follow
//! changes, and every write is a synchronous closure. No write spans an
//! await point.
//!
//! All background work (the sync loop, debounce checks) hangs off the
//! session's cancellation token, which is cancelled when the session drops.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::api::{DriveApi, HttpDriveApi};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::input_validation::{clamp_rumble_level, verify_image_file};
use crate::logging::LogManager;
use crate::mapping::{MappingView, SlotChoice};
use crate::prompt::UserPrompt;
use crate::reconciler::{reconcile, UiState};
use crate::search::{PendingSelection, SearchDebouncer, SELECT_QUESTION, SELECT_TITLE};
use crate::sync_engine::types::{SearchResults, SlotIndex, StateUpdate, SyncStats};
use crate::sync_engine::SyncEngine;
use crate::upload::{LoadRequest, UploadOrchestrator, UploadOutcome};

pub const UNLOAD_TITLE: &str = "Unload cartridge?";
pub const UNLOAD_QUESTION: &str = "Unsaved changes will be lost!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Drives,
    Files,
    Search,
    Config,
}

/// Result of pressing a slot's action control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotTrigger {
    /// A pending search selection was loaded by reference.
    Reference(UploadOutcome),
    /// Nothing pending; the front end should let the operator pick a file.
    PickFile,
    /// Control is disabled; the pending selection, if any, stays.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    pub slot: SlotIndex,
    pub text: String,
}

impl FileListing {
    pub fn display(&self) -> String {
        format!("drive {}: {}", self.slot, self.text.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Selectors are locked by the server.
    Blocked,
    /// Operator declined the confirmation.
    Declined,
    Sent { start: u8, end: u8 },
}

pub struct Session<A: DriveApi> {
    api: Arc<A>,
    config: ClientConfig,
    log: Arc<LogManager>,
    ui: Arc<watch::Sender<UiState>>,
    pending: watch::Sender<Option<PendingSelection>>,
    view: watch::Sender<View>,
    mapping: watch::Sender<MappingView>,
    files: watch::Sender<Option<FileListing>>,
    rumble: watch::Sender<Option<u8>>,
    version: watch::Sender<String>,
    uploads: UploadOrchestrator<A>,
    search: SearchDebouncer<A>,
    cancel: CancellationToken,
}

impl Session<HttpDriveApi> {
    /// Session against a live server.
    pub fn connect(config: ClientConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let api = HttpDriveApi::new(&config.server)
            .with_context(|| format!("Cannot use server {}", config.server))?;
        Ok(Self::new(Arc::new(api), config))
    }
}

impl<A: DriveApi> Session<A> {
    pub fn new(api: Arc<A>, config: ClientConfig) -> Self {
        let log = Arc::new(LogManager::new(config.max_log_lines));
        let ui = Arc::new(watch::Sender::new(UiState::default()));
        let cancel = CancellationToken::new();

        let uploads = UploadOrchestrator::new(api.clone(), ui.clone(), log.clone());
        let search = SearchDebouncer::new(
            api.clone(),
            log.clone(),
            config.search_settings(),
            cancel.clone(),
        );

        Self {
            api,
            config,
            log,
            ui,
            pending: watch::Sender::new(None),
            view: watch::Sender::new(View::Drives),
            mapping: watch::Sender::new(MappingView::default()),
            files: watch::Sender::new(None),
            rumble: watch::Sender::new(None),
            version: watch::Sender::new(String::new()),
            uploads,
            search,
            cancel,
        }
    }

    pub fn log(&self) -> &Arc<LogManager> {
        &self.log
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn ui(&self) -> UiState {
        self.ui.borrow().clone()
    }

    pub fn subscribe_ui(&self) -> watch::Receiver<UiState> {
        self.ui.subscribe()
    }

    pub fn view(&self) -> View {
        *self.view.borrow()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<View> {
        self.view.subscribe()
    }

    pub fn show(&self, view: View) {
        self.view.send_replace(view);
    }

    pub fn pending_selection(&self) -> Option<PendingSelection> {
        self.pending.borrow().clone()
    }

    pub fn mapping(&self) -> MappingView {
        self.mapping.borrow().clone()
    }

    pub fn file_listing(&self) -> Option<FileListing> {
        self.files.borrow().clone()
    }

    pub fn rumble_level(&self) -> Option<u8> {
        *self.rumble.borrow()
    }

    pub fn version_label(&self) -> String {
        self.version.borrow().clone()
    }

    /// Renders a snapshot. Overrides any optimistic state.
    pub fn apply(&self, update: &StateUpdate) {
        self.ui.send_modify(|state| *state = reconcile(state, update));
    }

    /// One-shot fetches that paint the first frame before the sync loop's
    /// first response. Failures are logged; the sync loop catches up later.
    pub async fn initialize(&self) {
        match self.api.list_drives().await {
            Ok(drives) => self.apply(&StateUpdate::from_drives(drives)),
            Err(e) => self.log.error(&format!("initial drive list failed: {e}"), None),
        }

        match self.api.client_status().await {
            Ok(client) => self.apply(&StateUpdate::from_client(client)),
            Err(e) => self.log.error(&format!("initial client status failed: {e}"), None),
        }

        if let Err(e) = self.refresh_mapping().await {
            self.log.error(&format!("drive mapping unavailable: {e}"), None);
        }
        if let Err(e) = self.refresh_rumble().await {
            self.log.error(&format!("rumble level unavailable: {e}"), None);
        }
        if let Err(e) = self.refresh_version().await {
            self.log.error(&format!("version unavailable: {e}"), None);
        }
    }

    /// Runs the long-poll loop until the session is cancelled.
    pub async fn run_sync(&self) -> SyncStats {
        let engine = SyncEngine::new(self.api.clone(), self.log.clone(), self.cancel.clone())
            .with_backoff(self.config.backoff());
        engine.run(|update| self.apply(&update)).await
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Slot action control pressed. A pending search selection is consumed
    /// here, whatever happens to the load afterwards.
    pub async fn trigger_slot(&self, slot: SlotIndex) -> SlotTrigger {
        if !self.ui.borrow().slot(slot).action_enabled {
            return SlotTrigger::Disabled;
        }

        // read and clear in one step
        match self.pending.send_replace(None) {
            Some(selection) => {
                let request = LoadRequest::from_reference(slot, selection.reference());
                SlotTrigger::Reference(self.uploads.upload(request).await)
            }
            None => SlotTrigger::PickFile,
        }
    }

    /// Loads a local image file picked by the operator.
    pub async fn load_file(&self, slot: SlotIndex, path: &Path) -> anyhow::Result<UploadOutcome> {
        verify_image_file(path)?;
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.load_bytes(slot, &filename, bytes).await)
    }

    pub async fn load_bytes(&self, slot: SlotIndex, filename: &str, bytes: Vec<u8>) -> UploadOutcome {
        self.uploads
            .upload(LoadRequest::from_file(slot, filename, bytes))
            .await
    }

    /// Search input changed.
    pub fn search_input(&self, value: impl Into<String>) {
        self.search.keystroke(value);
    }

    /// Search button pressed.
    pub async fn search_now(&self, term: &str) -> Option<SearchResults> {
        self.search.search_now(term).await
    }

    pub fn search_results(&self) -> Option<SearchResults> {
        self.search.latest_results()
    }

    pub fn subscribe_search(&self) -> watch::Receiver<Option<SearchResults>> {
        self.search.subscribe()
    }

    /// Operator clicked a search hit. Confirming makes it the pending
    /// selection and returns to the drive list; declining clears any
    /// earlier selection.
    pub async fn select_search_result(&self, hit: &str, prompt: &impl UserPrompt) -> bool {
        if prompt.confirm(SELECT_TITLE, SELECT_QUESTION).await {
            self.pending.send_replace(Some(PendingSelection::from_hit(hit)));
            self.show(View::Drives);
            self.log.info(&format!("selected '{hit}' for loading"), None);
            true
        } else {
            self.pending.send_replace(None);
            false
        }
    }

    pub fn cancel_selection(&self) {
        self.pending.send_replace(None);
    }

    pub async fn list_files(&self, slot: SlotIndex) -> ClientResult<FileListing> {
        let text = self.api.list_files(slot).await.inspect_err(|e| {
            self.log.error(&format!("listing failed: {e}"), Some(slot.get()))
        })?;
        let listing = FileListing { slot, text };
        self.files.send_replace(Some(listing.clone()));
        self.show(View::Files);
        Ok(listing)
    }

    /// Returns false when the operator declined.
    pub async fn unload(&self, slot: SlotIndex, prompt: &impl UserPrompt) -> ClientResult<bool> {
        if !prompt.confirm(UNLOAD_TITLE, UNLOAD_QUESTION).await {
            return Ok(false);
        }

        let result = self.api.unload(slot).await;
        self.show(View::Drives);
        match result {
            Ok(reply) => {
                self.log.info(&format!("unload requested: {}", reply.trim()), Some(slot.get()));
                Ok(true)
            }
            Err(e) => {
                self.log.error(&format!("unload failed: {e}"), Some(slot.get()));
                Err(e)
            }
        }
    }

    /// Asks the server to re-detect the attached client.
    pub async fn resync(&self) -> ClientResult<()> {
        self.api
            .resync()
            .await
            .inspect_err(|e| self.log.error(&format!("client resync failed: {e}"), None))?;
        self.log.info("client resync requested", None);
        Ok(())
    }

    pub async fn refresh_mapping(&self) -> ClientResult<MappingView> {
        let state = self.api.get_mapping().await?;
        self.mapping.send_modify(|view| view.apply_server(&state));
        Ok(self.mapping())
    }

    pub fn select_map_start(&self, choice: SlotChoice) -> bool {
        self.mapping.send_if_modified(|view| view.select_start(choice))
    }

    pub fn select_map_end(&self, choice: SlotChoice) -> bool {
        self.mapping.send_if_modified(|view| view.select_end(choice))
    }

    /// Submits the selected hardware range after confirmation.
    pub async fn commit_mapping(&self, prompt: &impl UserPrompt) -> ClientResult<CommitOutcome> {
        let commit = self.mapping.borrow().commit();
        let Some((title, question)) = commit.confirmation() else {
            return Ok(CommitOutcome::Blocked);
        };

        if !prompt.confirm(title, question).await {
            return Ok(CommitOutcome::Declined);
        }

        // selectors and lock may have changed while the dialog was up
        let commit = self.mapping.borrow().commit();
        let Some((start, end)) = commit.range() else {
            return Ok(CommitOutcome::Blocked);
        };

        let reply = self
            .api
            .set_mapping(start, end)
            .await
            .inspect_err(|e| self.log.error(&format!("mapping update failed: {e}"), None))?;
        self.log.info(reply.trim(), None);
        self.refresh_mapping().await?;
        Ok(CommitOutcome::Sent { start, end })
    }

    pub async fn refresh_rumble(&self) -> ClientResult<Option<u8>> {
        let level = self.api.get_rumble().await?.rumble.map(clamp_rumble_level);
        self.rumble.send_replace(level);
        Ok(level)
    }

    /// Sets the rumble level, clamped to 0..=255. Returns the level sent.
    pub async fn set_rumble(&self, level: i64) -> ClientResult<u8> {
        let level = clamp_rumble_level(level);
        self.api
            .set_rumble(level)
            .await
            .inspect_err(|e| self.log.error(&format!("setting rumble failed: {e}"), None))?;
        self.rumble.send_replace(Some(level));
        self.log.info(&format!("rumble level set to {level}"), None);
        Ok(level)
    }

    pub async fn refresh_version(&self) -> ClientResult<String> {
        let version = self.api.version().await?.trim().to_string();
        self.version.send_replace(version.clone());
        Ok(version)
    }
}

impl<A: DriveApi> Drop for Session<A> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
