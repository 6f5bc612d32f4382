pub mod engine;
pub mod types;

pub use engine::{SyncEngine, DEFAULT_BACKOFF};
pub use types::{
    ClientSnapshot, DriveSnapshot, DriveState, DriveStatus, MappingState, SlotIndex, StateUpdate,
    SyncStats, WatchResponse,
};
