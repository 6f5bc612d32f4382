//! Hardware drive range selection.
//!
//! The range is picked with two selectors, start and end, each offering
//! slots 1..=8 plus an "off" choice. Rather than rejecting a bad range on
//! submit, [`solve`] disables every option that would make `start > end`,
//! so the selectors can only ever show a contiguous range or off.

use serde::{Deserialize, Serialize};

use crate::reconciler::Icon;
use crate::sync_engine::types::{MappingState, DRIVE_COUNT};

pub const ENABLE_TITLE: &str = "Enable hardware drives";
pub const ENABLE_QUESTION: &str = "Specifying the wrong number of hardware drives will cause \
problems. If you set too many, you will block virtual drives, if you set too few, the excess \
hardware drives will conflict with virtual drives, causing bus contention. Proceed?";
pub const DISABLE_TITLE: &str = "Disable hardware drives";
pub const DISABLE_QUESTION: &str = "Proceed?";

/// Value of one range selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlotChoice {
    #[default]
    Off,
    Slot(u8),
}

impl SlotChoice {
    /// Server values below 1 mean off.
    pub fn from_server(ix: i32) -> Self {
        match u8::try_from(ix) {
            Ok(n) if (1..=DRIVE_COUNT as u8).contains(&n) => SlotChoice::Slot(n),
            _ => SlotChoice::Off,
        }
    }

    pub fn to_server(self) -> u8 {
        match self {
            SlotChoice::Off => 0,
            SlotChoice::Slot(n) => n,
        }
    }

    pub fn label(self) -> String {
        match self {
            SlotChoice::Off => "-".to_string(),
            SlotChoice::Slot(n) => n.to_string(),
        }
    }
}

/// Per-option disable flags, index 0 is slot 1.
pub type OptionMask = [bool; DRIVE_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    pub primary_disabled: OptionMask,
    pub secondary_disabled: OptionMask,
    pub secondary: SlotChoice,
}

/// Recomputes selector options after `primary` changed.
///
/// Turning the primary off turns the secondary off too and clears all
/// disables. Otherwise an off secondary collapses onto the primary, and
/// options on either side that would invert the range are disabled.
pub fn solve(primary: SlotChoice, secondary: SlotChoice, primary_is_start: bool) -> Solution {
    let p = match primary {
        SlotChoice::Off => {
            return Solution {
                primary_disabled: [false; DRIVE_COUNT],
                secondary_disabled: [false; DRIVE_COUNT],
                secondary: SlotChoice::Off,
            }
        }
        SlotChoice::Slot(p) => p,
    };

    let s = match secondary {
        SlotChoice::Off => p,
        SlotChoice::Slot(s) => s,
    };

    let mut primary_disabled = [false; DRIVE_COUNT];
    let mut secondary_disabled = [false; DRIVE_COUNT];

    for i in 1..=DRIVE_COUNT as u8 {
        let ix = usize::from(i) - 1;
        if primary_is_start {
            primary_disabled[ix] = i > s;
            secondary_disabled[ix] = i < p;
        } else {
            primary_disabled[ix] = i < s;
            secondary_disabled[ix] = i > p;
        }
    }

    Solution {
        primary_disabled,
        secondary_disabled,
        secondary: SlotChoice::Slot(s),
    }
}

/// Rendered state of the mapping selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingView {
    pub start: SlotChoice,
    pub end: SlotChoice,
    pub start_disabled: OptionMask,
    pub end_disabled: OptionMask,
    pub locked: bool,
    pub icon: Icon,
}

impl Default for MappingView {
    fn default() -> Self {
        Self {
            start: SlotChoice::Off,
            end: SlotChoice::Off,
            start_disabled: [false; DRIVE_COUNT],
            end_disabled: [false; DRIVE_COUNT],
            locked: false,
            icon: Icon::Unlocked,
        }
    }
}

/// What a commit would send, and which confirmation it needs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingCommit {
    /// Selectors are frozen by the server.
    Blocked,
    Enable { start: u8, end: u8 },
    Disable,
}

impl MappingCommit {
    pub fn confirmation(&self) -> Option<(&'static str, &'static str)> {
        match self {
            MappingCommit::Blocked => None,
            MappingCommit::Enable { .. } => Some((ENABLE_TITLE, ENABLE_QUESTION)),
            MappingCommit::Disable => Some((DISABLE_TITLE, DISABLE_QUESTION)),
        }
    }

    /// `(start, end)` query values.
    pub fn range(&self) -> Option<(u8, u8)> {
        match self {
            MappingCommit::Blocked => None,
            MappingCommit::Enable { start, end } => Some((*start, *end)),
            MappingCommit::Disable => Some((0, 0)),
        }
    }
}

impl MappingView {
    /// Applies the server's view of the mapping.
    pub fn apply_server(&mut self, state: &MappingState) {
        self.start = SlotChoice::from_server(state.start);
        self.end = SlotChoice::from_server(state.end);
        self.locked = state.locked;

        if state.locked {
            self.icon = Icon::Locked;
        } else {
            self.icon = Icon::Unlocked;
            self.run_solver(true);
        }
    }

    /// User picked a start value. Ignored while locked.
    pub fn select_start(&mut self, choice: SlotChoice) -> bool {
        if self.locked {
            return false;
        }
        self.start = choice;
        self.run_solver(true);
        true
    }

    /// User picked an end value. Ignored while locked.
    pub fn select_end(&mut self, choice: SlotChoice) -> bool {
        if self.locked {
            return false;
        }
        self.end = choice;
        self.run_solver(false);
        true
    }

    fn run_solver(&mut self, start_changed: bool) {
        if start_changed {
            let solution = solve(self.start, self.end, true);
            self.end = solution.secondary;
            self.start_disabled = solution.primary_disabled;
            self.end_disabled = solution.secondary_disabled;
        } else {
            let solution = solve(self.end, self.start, false);
            self.start = solution.secondary;
            self.end_disabled = solution.primary_disabled;
            self.start_disabled = solution.secondary_disabled;
        }
    }

    pub fn commit(&self) -> MappingCommit {
        if self.locked {
            return MappingCommit::Blocked;
        }
        match (self.start, self.end) {
            (SlotChoice::Slot(start), SlotChoice::Slot(end)) => MappingCommit::Enable { start, end },
            _ => MappingCommit::Disable,
        }
    }
}
