use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ClientError;

/// Number of addressable drive slots exposed by the server.
pub const DRIVE_COUNT: usize = 8;

/// Client identity the server reports when no device is attached.
pub const UNKNOWN_CLIENT: &str = "<unknown>";

/// 1-based drive slot, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct SlotIndex(u8);

impl SlotIndex {
    pub fn new(n: i64) -> Result<Self, ClientError> {
        if (1..=DRIVE_COUNT as i64).contains(&n) {
            Ok(Self(n as u8))
        } else {
            Err(ClientError::InvalidSlot(n))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Position inside a snapshot.
    pub fn offset(self) -> usize {
        usize::from(self.0) - 1
    }

    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (1..=DRIVE_COUNT as u8).map(SlotIndex)
    }
}

impl TryFrom<i64> for SlotIndex {
    type Error = ClientError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<SlotIndex> for u8 {
    fn from(slot: SlotIndex) -> u8 {
        slot.0
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriveStatus {
    #[default]
    Empty,
    Idle,
    Busy,
    Hardware,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DriveState {
    pub status: DriveStatus,
    #[serde(default)]
    pub formatted: bool,
    #[serde(default)]
    pub write_protected: bool,
    #[serde(default)]
    pub modified: bool,
    #[serde(default)]
    pub name: String,
}

impl DriveState {
    /// Busy and hardware slots cannot take a load/unload action.
    pub fn accepts_action(&self) -> bool {
        !matches!(self.status, DriveStatus::Busy | DriveStatus::Hardware)
    }
}

/// Full state of all slots, replaced as a unit on every update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(try_from = "Vec<DriveState>", into = "Vec<DriveState>")]
pub struct DriveSnapshot([DriveState; DRIVE_COUNT]);

impl DriveSnapshot {
    pub fn new(drives: [DriveState; DRIVE_COUNT]) -> Self {
        Self(drives)
    }

    pub fn get(&self, slot: SlotIndex) -> &DriveState {
        &self.0[slot.offset()]
    }

    pub fn as_array(&self) -> &[DriveState; DRIVE_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &DriveState)> {
        SlotIndex::all().zip(self.0.iter())
    }
}

impl TryFrom<Vec<DriveState>> for DriveSnapshot {
    type Error = ClientError;

    fn try_from(drives: Vec<DriveState>) -> Result<Self, Self::Error> {
        let len = drives.len();
        <[DriveState; DRIVE_COUNT]>::try_from(drives)
            .map(Self)
            .map_err(|_| ClientError::InvalidSnapshot(len))
    }
}

impl From<DriveSnapshot> for Vec<DriveState> {
    fn from(snapshot: DriveSnapshot) -> Self {
        snapshot.0.into()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ClientSnapshot {
    #[serde(default)]
    pub client: String,
}

/// Interpretation of the reported client string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIdentity<'a> {
    NoUpdate,
    Disconnected,
    Connected(&'a str),
}

impl<'a> ClientIdentity<'a> {
    pub fn parse(client: &'a str) -> Self {
        match client {
            "" => ClientIdentity::NoUpdate,
            UNKNOWN_CLIENT => ClientIdentity::Disconnected,
            other => ClientIdentity::Connected(other),
        }
    }
}

impl ClientSnapshot {
    pub fn new(client: impl Into<String>) -> Self {
        Self { client: client.into() }
    }

    pub fn identity(&self) -> ClientIdentity<'_> {
        ClientIdentity::parse(&self.client)
    }
}

/// Combined update as delivered by the long-poll endpoint. Also used for the
/// initial paint, where each one-shot fetch fills in only one half.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StateUpdate {
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub drives: Option<DriveSnapshot>,
}

impl StateUpdate {
    pub fn from_drives(drives: DriveSnapshot) -> Self {
        Self { client: String::new(), drives: Some(drives) }
    }

    pub fn from_client(client: ClientSnapshot) -> Self {
        Self { client: client.client, drives: None }
    }

    pub fn client(&self) -> ClientIdentity<'_> {
        ClientIdentity::parse(&self.client)
    }
}

/// Outcome of one long-poll round trip that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchResponse {
    Update(StateUpdate),
    NoUpdate,
}

/// Hardware drive range as reported by `/map`. Values below 1 mean off.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MappingState {
    #[serde(default)]
    pub start: i32,
    #[serde(default)]
    pub end: i32,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SearchResults {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub hits: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RumbleConfig {
    #[serde(default)]
    pub rumble: Option<i64>,
}

/// Counters returned when the sync loop is cancelled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SyncStats {
    pub updates: u64,
    pub idle_cycles: u64,
    pub failures: u64,
}
