pub mod api;
pub mod config;
pub mod error;
pub mod error_codes;
pub mod format;
pub mod input_validation;
pub mod logging;
pub mod mapping;
pub mod prompt;
pub mod reconciler;
pub mod search;
pub mod session;
pub mod sync_engine;
pub mod upload;

#[cfg(test)]
mod test_support;


pub use api::{DriveApi, HttpDriveApi};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use logging::{LogEntry, LogLevel, LogManager};
pub use prompt::{AutoConfirm, TerminalPrompt, UserPrompt};
pub use reconciler::{Icon, UiState};
pub use session::{CommitOutcome, FileListing, Session, SlotTrigger, View};
pub use sync_engine::types::SlotIndex;
pub use upload::UploadOutcome;

/// Version of this client, from Cargo.toml.
pub fn get_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
