//! Image loads into drive slots.
//!
//! A load flips the slot to "loading" and disables its control before the
//! request goes out. Nothing here turns it back: the next snapshot from the
//! sync loop is the only thing that clears the loading state, whether the
//! request succeeded or not.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::DriveApi;
use crate::format::{self, Compressor, ImageFormat};
use crate::logging::LogManager;
use crate::reconciler::{Icon, SlotView, UiState, LOADING_LABEL};
use crate::sync_engine::types::SlotIndex;

/// Prefix of repository references handed over by search selection.
pub const REPO_SCHEME: &str = "repo://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPayload {
    /// Raw image bytes from a local file.
    Bytes(Vec<u8>),
    /// Server-side repository reference, sent as the body with `ref=true`.
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub slot: SlotIndex,
    pub name: String,
    pub format: ImageFormat,
    pub compressor: Compressor,
    pub payload: LoadPayload,
}

impl LoadRequest {
    pub fn from_file(slot: SlotIndex, filename: &str, bytes: Vec<u8>) -> Self {
        let fc = format::resolve(filename);
        Self {
            slot,
            name: format::display_name(filename),
            format: fc.format,
            compressor: fc.compressor,
            payload: LoadPayload::Bytes(bytes),
        }
    }

    pub fn from_reference(slot: SlotIndex, reference: &str) -> Self {
        let fc = format::resolve(reference);
        Self {
            slot,
            name: format::display_name(reference),
            format: fc.format,
            compressor: fc.compressor,
            payload: LoadPayload::Reference(reference.to_string()),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.payload, LoadPayload::Reference(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Server accepted the request.
    Sent,
    /// Request failed; the slot stays in loading until the next snapshot.
    Failed,
    /// Slot control was disabled, nothing was sent.
    Skipped,
}

/// Switches `slot` to loading and disables its control. Returns false when
/// the control was already disabled (busy, hardware, or a load in flight).
pub fn mark_loading(ui: &watch::Sender<UiState>, slot: SlotIndex) -> bool {
    ui.send_if_modified(|state| {
        let view = state.slot_mut(slot);
        if !view.action_enabled {
            return false;
        }
        *view = SlotView {
            icon: Icon::Loading,
            label: LOADING_LABEL.to_string(),
            action_enabled: false,
        };
        true
    })
}

pub struct UploadOrchestrator<A: DriveApi> {
    api: Arc<A>,
    ui: Arc<watch::Sender<UiState>>,
    log: Arc<LogManager>,
}

impl<A: DriveApi> UploadOrchestrator<A> {
    pub fn new(api: Arc<A>, ui: Arc<watch::Sender<UiState>>, log: Arc<LogManager>) -> Self {
        Self { api, ui, log }
    }

    /// Single-flight per slot: a second trigger while the first is pending
    /// finds the control disabled and is skipped.
    pub async fn upload(&self, request: LoadRequest) -> UploadOutcome {
        let slot = request.slot;
        if !mark_loading(&self.ui, slot) {
            self.log.warn("drive not accepting loads right now", Some(slot.get()));
            return UploadOutcome::Skipped;
        }

        self.log.info(
            &format!(
                "loading '{}' (type={}, compressor={}, ref={})",
                request.name,
                request.format.as_str(),
                request.compressor.as_str(),
                request.is_reference()
            ),
            Some(slot.get()),
        );

        match self.api.load(&request).await {
            Ok(reply) => {
                self.log.info(&format!("load accepted: {}", reply.trim()), Some(slot.get()));
                UploadOutcome::Sent
            }
            Err(e) => {
                self.log.error(&format!("load failed: {e}"), Some(slot.get()));
                UploadOutcome::Failed
            }
        }
    }
}
