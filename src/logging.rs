use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// Default maximum number of log lines to keep in memory
pub const DEFAULT_MAX_LOG_LINES: usize = 10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    /// Drive slot the entry concerns, if any.
    pub slot: Option<u8>,
}

/// Operator log. Keeps the most recent entries for display and forwards
/// every entry to the `log` facade.
pub struct LogManager {
    entries: Mutex<VecDeque<LogEntry>>,
    max_lines: usize,
    next_id: AtomicU64,
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOG_LINES)
    }
}

impl LogManager {
    pub fn new(max_lines: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_lines.min(1024))),
            max_lines,
            next_id: AtomicU64::new(1),
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn log(&self, level: LogLevel, message: &str, slot: Option<u8>) {
        let facade_level: log::Level = level.into();
        match slot {
            Some(slot) => log::log!(target: "drivesync", facade_level, "[drive {slot}] {message}"),
            None => log::log!(target: "drivesync", facade_level, "{message}"),
        }

        let entry = LogEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            timestamp: chrono::Utc::now().to_rfc3339(),
            level,
            message: message.to_string(),
            slot,
        };

        let mut entries = self.entries();
        entries.push_back(entry);
        while entries.len() > self.max_lines {
            entries.pop_front();
        }
    }

    pub fn info(&self, message: &str, slot: Option<u8>) {
        self.log(LogLevel::Info, message, slot);
    }

    pub fn warn(&self, message: &str, slot: Option<u8>) {
        self.log(LogLevel::Warn, message, slot);
    }

    pub fn error(&self, message: &str, slot: Option<u8>) {
        self.log(LogLevel::Error, message, slot);
    }

    pub fn get_logs(&self, slot: Option<u8>) -> Vec<LogEntry> {
        let entries = self.entries();
        match slot {
            Some(slot) => entries.iter().filter(|e| e.slot == Some(slot)).cloned().collect(),
            None => entries.iter().cloned().collect(),
        }
    }

    /// Get logs with pagination for large log sets
    pub fn get_logs_paginated(&self, slot: Option<u8>, offset: usize, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries();
        entries
            .iter()
            .filter(|e| slot.is_none() || e.slot == slot)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
