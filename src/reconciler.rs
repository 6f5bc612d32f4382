//! Projection of server snapshots onto rendered slot state.
//!
//! Nothing here is authoritative: every field of [`UiState`] is recomputed
//! from the latest [`StateUpdate`], except labels of busy slots without a
//! name, which keep whatever the previous frame showed.

use serde::{Deserialize, Serialize};

use crate::sync_engine::types::{
    ClientIdentity, DriveState, DriveStatus, SlotIndex, StateUpdate, DRIVE_COUNT,
};

pub const LOADING_LABEL: &str = "< loading >";
pub const HARDWARE_LABEL: &str = "< h/w drive >";
pub const UNFORMATTED_LABEL: &str = "< unformatted >";
pub const DISCONNECTED_LABEL: &str = "disconn.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Icon {
    #[default]
    Empty,
    Idle,
    Busy,
    Hardware,
    Unformatted,
    WriteProtected,
    Modified,
    Connected,
    Disconnected,
    Loading,
    Locked,
    Unlocked,
}

impl Icon {
    /// Icon theme class.
    pub fn class(&self) -> &'static str {
        match self {
            Icon::Empty => "bi-none",
            Icon::Idle => "bi-app",
            Icon::Busy => "bi-caret-right-square",
            Icon::Hardware => "bi-gear",
            Icon::Unformatted => "bi-hr",
            Icon::WriteProtected => "bi-lock",
            Icon::Modified => "bi-app-indicator",
            Icon::Connected => "bi-plug-fill",
            Icon::Disconnected => "bi-plug",
            Icon::Loading => "bi-hourglass-split",
            Icon::Locked => "bi-lock-fill",
            Icon::Unlocked => "bi-unlock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub icon: Icon,
    pub label: String,
    pub action_enabled: bool,
}

impl Default for SlotView {
    fn default() -> Self {
        Self {
            icon: Icon::Empty,
            label: String::new(),
            action_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientView {
    pub icon: Icon,
    pub label: String,
}

impl Default for ClientView {
    fn default() -> Self {
        Self {
            icon: Icon::Disconnected,
            label: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UiState {
    pub client: ClientView,
    pub slots: [SlotView; DRIVE_COUNT],
}

impl UiState {
    pub fn slot(&self, slot: SlotIndex) -> &SlotView {
        &self.slots[slot.offset()]
    }

    pub fn slot_mut(&mut self, slot: SlotIndex) -> &mut SlotView {
        &mut self.slots[slot.offset()]
    }
}

/// Status icon with modified > write protected > unformatted precedence,
/// applied to idle slots only.
pub fn display_icon(drive: &DriveState) -> Icon {
    match drive.status {
        DriveStatus::Idle if drive.modified => Icon::Modified,
        DriveStatus::Idle if drive.write_protected => Icon::WriteProtected,
        DriveStatus::Idle if !drive.formatted => Icon::Unformatted,
        DriveStatus::Idle => Icon::Idle,
        DriveStatus::Empty => Icon::Empty,
        DriveStatus::Busy => Icon::Busy,
        DriveStatus::Hardware => Icon::Hardware,
    }
}

/// Label for a slot, or `None` when the previous label stays up (busy slot
/// whose name the server has not reported yet).
pub fn display_label(drive: &DriveState) -> Option<String> {
    if drive.name.is_empty() && drive.status == DriveStatus::Busy {
        return None;
    }

    let label = if drive.formatted {
        drive.name.clone()
    } else if drive.status == DriveStatus::Hardware {
        HARDWARE_LABEL.to_string()
    } else {
        UNFORMATTED_LABEL.to_string()
    };
    Some(label)
}

fn project_slot(old: &SlotView, drive: &DriveState) -> SlotView {
    SlotView {
        icon: display_icon(drive),
        label: display_label(drive).unwrap_or_else(|| old.label.clone()),
        action_enabled: drive.accepts_action(),
    }
}

fn project_client(old: &ClientView, update: &StateUpdate) -> ClientView {
    match update.client() {
        ClientIdentity::NoUpdate => old.clone(),
        ClientIdentity::Disconnected => ClientView {
            icon: Icon::Disconnected,
            label: DISCONNECTED_LABEL.to_string(),
        },
        ClientIdentity::Connected(name) => ClientView {
            icon: Icon::Connected,
            label: name.to_string(),
        },
    }
}

/// Renders `update` on top of `old`. Any optimistic loading state in `old`
/// is overwritten when the update carries drives.
pub fn reconcile(old: &UiState, update: &StateUpdate) -> UiState {
    let client = project_client(&old.client, update);

    let slots = match &update.drives {
        Some(drives) => {
            let drives = drives.as_array();
            std::array::from_fn(|i| project_slot(&old.slots[i], &drives[i]))
        }
        None => old.slots.clone(),
    };

    UiState { client, slots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_engine::types::{ClientSnapshot, DriveSnapshot};

    fn idle(name: &str) -> DriveState {
        DriveState {
            status: DriveStatus::Idle,
            formatted: true,
            write_protected: false,
            modified: false,
            name: name.to_string(),
        }
    }

    fn snapshot_with(slot: usize, drive: DriveState) -> DriveSnapshot {
        let mut drives: [DriveState; DRIVE_COUNT] = Default::default();
        drives[slot] = drive;
        DriveSnapshot::new(drives)
    }

    #[test]
    fn test_modified_wins_precedence() {
        let d = DriveState {
            status: DriveStatus::Idle,
            formatted: false,
            write_protected: true,
            modified: true,
            name: String::new(),
        };
        assert_eq!(display_icon(&d), Icon::Modified);

        let d = DriveState { modified: false, ..d };
        assert_eq!(display_icon(&d), Icon::WriteProtected);

        let d = DriveState { write_protected: false, ..d };
        assert_eq!(display_icon(&d), Icon::Unformatted);
    }

    #[test]
    fn test_precedence_only_for_idle() {
        let d = DriveState {
            status: DriveStatus::Busy,
            modified: true,
            ..Default::default()
        };
        assert_eq!(display_icon(&d), Icon::Busy);
    }

    #[test]
    fn test_busy_slot_keeps_label_and_disables_action() {
        let first = reconcile(&UiState::default(), &StateUpdate::from_drives(snapshot_with(3, idle("Tasword"))));
        assert_eq!(first.slots[3].label, "Tasword");
        assert!(first.slots[3].action_enabled);

        let busy = DriveState {
            status: DriveStatus::Busy,
            ..Default::default()
        };
        let second = reconcile(&first, &StateUpdate::from_drives(snapshot_with(3, busy)));
        assert_eq!(second.slots[3].label, "Tasword");
        assert!(!second.slots[3].action_enabled);
        assert_eq!(second.slots[3].icon, Icon::Busy);
    }

    #[test]
    fn test_labels() {
        let hw = DriveState {
            status: DriveStatus::Hardware,
            ..Default::default()
        };
        assert_eq!(display_label(&hw).as_deref(), Some(HARDWARE_LABEL));

        let blank = DriveState {
            status: DriveStatus::Idle,
            ..Default::default()
        };
        assert_eq!(display_label(&blank).as_deref(), Some(UNFORMATTED_LABEL));

        let empty = DriveState::default();
        assert_eq!(display_label(&empty).as_deref(), Some(UNFORMATTED_LABEL));
    }

    #[test]
    fn test_client_updates() {
        let base = UiState::default();

        let connected = reconcile(&base, &StateUpdate::from_client(ClientSnapshot::new("Spectrum")));
        assert_eq!(connected.client.icon, Icon::Connected);
        assert_eq!(connected.client.label, "Spectrum");

        let unchanged = reconcile(&connected, &StateUpdate::default());
        assert_eq!(unchanged.client, connected.client);

        let gone = reconcile(&connected, &StateUpdate::from_client(ClientSnapshot::new("<unknown>")));
        assert_eq!(gone.client.icon, Icon::Disconnected);
        assert_eq!(gone.client.label, DISCONNECTED_LABEL);
    }

    #[test]
    fn test_snapshot_overrides_loading() {
        let mut state = UiState::default();
        let slot = SlotIndex::new(2).unwrap();
        *state.slot_mut(slot) = SlotView {
            icon: Icon::Loading,
            label: LOADING_LABEL.to_string(),
            action_enabled: false,
        };

        let next = reconcile(&state, &StateUpdate::from_drives(snapshot_with(1, idle("Psion Chess"))));
        assert_eq!(next.slot(slot).icon, Icon::Idle);
        assert_eq!(next.slot(slot).label, "Psion Chess");
        assert!(next.slot(slot).action_enabled);
    }

    #[test]
    fn test_icon_classes() {
        assert_eq!(Icon::Loading.class(), "bi-hourglass-split");
        assert_eq!(Icon::Modified.class(), "bi-app-indicator");
        assert_eq!(Icon::Disconnected.class(), "bi-plug");
    }
}
