//! Scripted `DriveApi` double shared by the unit and session tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::DriveApi;
use crate::error::{ClientError, ClientResult};
use crate::sync_engine::types::{
    ClientSnapshot, DriveSnapshot, DriveState, DriveStatus, MappingState, RumbleConfig,
    SearchResults, SlotIndex, StateUpdate, WatchResponse, DRIVE_COUNT,
};
use crate::upload::LoadRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListDrives,
    ClientStatus,
    Watch(Instant),
    Load(LoadRequest),
    ListFiles(SlotIndex),
    Unload(SlotIndex),
    Resync,
    GetMapping,
    SetMapping(u8, u8),
    GetRumble,
    SetRumble(u8),
    Search { term: String, items: usize, at: Instant },
    Version,
}

pub fn idle_drive(name: &str) -> DriveState {
    DriveState {
        status: DriveStatus::Idle,
        formatted: true,
        write_protected: false,
        modified: false,
        name: name.to_string(),
    }
}

/// Snapshot with every slot idle and named `slot N`.
pub fn named_snapshot() -> DriveSnapshot {
    DriveSnapshot::new(std::array::from_fn::<_, DRIVE_COUNT, _>(|i| {
        idle_drive(&format!("slot {}", i + 1))
    }))
}

pub fn update_with(drives: DriveSnapshot, client: &str) -> StateUpdate {
    StateUpdate {
        client: client.to_string(),
        drives: Some(drives),
    }
}

pub fn failure() -> ClientError {
    ClientError::UnexpectedStatus {
        endpoint: "watch".to_string(),
        status: 500,
    }
}

pub struct ScriptedApi {
    calls: Mutex<Vec<Call>>,
    watch_script: Mutex<VecDeque<ClientResult<WatchResponse>>>,
    cancel_when_dry: Mutex<Option<CancellationToken>>,
    drives: Mutex<DriveSnapshot>,
    client: Mutex<String>,
    mapping: Mutex<MappingState>,
    rumble: Mutex<Option<i64>>,
    search_results: Mutex<SearchResults>,
    files: Mutex<String>,
    fail_loads: AtomicBool,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            watch_script: Mutex::new(VecDeque::new()),
            cancel_when_dry: Mutex::new(None),
            drives: Mutex::new(named_snapshot()),
            client: Mutex::new("<unknown>".to_string()),
            mapping: Mutex::new(MappingState::default()),
            rumble: Mutex::new(None),
            search_results: Mutex::new(SearchResults::default()),
            files: Mutex::new(String::new()),
            fail_loads: AtomicBool::new(false),
        }
    }

    /// Queues `/watch` outcomes. Once they run out, `token` is cancelled and
    /// further polls hang.
    pub fn script_watch(
        &self,
        outcomes: impl IntoIterator<Item = ClientResult<WatchResponse>>,
        token: CancellationToken,
    ) {
        self.watch_script.lock().unwrap().extend(outcomes);
        *self.cancel_when_dry.lock().unwrap() = Some(token);
    }

    pub fn set_client(&self, client: &str) {
        *self.client.lock().unwrap() = client.to_string();
    }

    pub fn set_drives(&self, drives: DriveSnapshot) {
        *self.drives.lock().unwrap() = drives;
    }

    pub fn set_mapping_state(&self, state: MappingState) {
        *self.mapping.lock().unwrap() = state;
    }

    pub fn set_rumble_level(&self, level: Option<i64>) {
        *self.rumble.lock().unwrap() = level;
    }

    pub fn set_search_results(&self, results: SearchResults) {
        *self.search_results.lock().unwrap() = results;
    }

    pub fn set_files(&self, listing: &str) {
        *self.files.lock().unwrap() = listing.to_string();
    }

    pub fn fail_loads(&self) {
        self.fail_loads.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn watch_instants(&self) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Watch(at) => Some(at),
                _ => None,
            })
            .collect()
    }

    pub fn searches(&self) -> Vec<(String, Instant)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Search { term, at, .. } => Some((term, at)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DriveApi for ScriptedApi {
    async fn list_drives(&self) -> ClientResult<DriveSnapshot> {
        self.record(Call::ListDrives);
        Ok(self.drives.lock().unwrap().clone())
    }

    async fn client_status(&self) -> ClientResult<ClientSnapshot> {
        self.record(Call::ClientStatus);
        Ok(ClientSnapshot::new(self.client.lock().unwrap().clone()))
    }

    async fn watch(&self) -> ClientResult<WatchResponse> {
        self.record(Call::Watch(Instant::now()));
        let next = self.watch_script.lock().unwrap().pop_front();
        match next {
            Some(outcome) => outcome,
            None => {
                let token = self.cancel_when_dry.lock().unwrap().clone();
                if let Some(token) = token {
                    token.cancel();
                }
                std::future::pending().await
            }
        }
    }

    async fn load(&self, request: &LoadRequest) -> ClientResult<String> {
        self.record(Call::Load(request.clone()));
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(ClientError::UnexpectedStatus {
                endpoint: format!("drive/{}", request.slot),
                status: 422,
            });
        }
        Ok("loaded".to_string())
    }

    async fn list_files(&self, slot: SlotIndex) -> ClientResult<String> {
        self.record(Call::ListFiles(slot));
        Ok(self.files.lock().unwrap().clone())
    }

    async fn unload(&self, slot: SlotIndex) -> ClientResult<String> {
        self.record(Call::Unload(slot));
        Ok("unloaded".to_string())
    }

    async fn resync(&self) -> ClientResult<String> {
        self.record(Call::Resync);
        Ok(String::new())
    }

    async fn get_mapping(&self) -> ClientResult<MappingState> {
        self.record(Call::GetMapping);
        Ok(*self.mapping.lock().unwrap())
    }

    async fn set_mapping(&self, start: u8, end: u8) -> ClientResult<String> {
        self.record(Call::SetMapping(start, end));
        *self.mapping.lock().unwrap() = MappingState {
            start: i32::from(start),
            end: i32::from(end),
            locked: false,
        };
        Ok(format!("mapped hardware drives: start={start}, end={end}"))
    }

    async fn get_rumble(&self) -> ClientResult<RumbleConfig> {
        self.record(Call::GetRumble);
        Ok(RumbleConfig {
            rumble: *self.rumble.lock().unwrap(),
        })
    }

    async fn set_rumble(&self, level: u8) -> ClientResult<String> {
        self.record(Call::SetRumble(level));
        Ok("configuring".to_string())
    }

    async fn search(&self, term: &str, items: usize) -> ClientResult<SearchResults> {
        self.record(Call::Search {
            term: term.to_string(),
            items,
            at: Instant::now(),
        });
        Ok(self.search_results.lock().unwrap().clone())
    }

    async fn version(&self) -> ClientResult<String> {
        self.record(Call::Version);
        Ok("v0.4.0-test\n".to_string())
    }
}
