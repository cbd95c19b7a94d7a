use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::events::AuditEvent;
use crate::config::AuditSettings;

/// Logger for audit events in ndjson format
pub struct AuditLogger {
    enabled: bool,
    max_size_bytes: u64,
    file_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl AuditLogger {
    /// Create a new audit logger
    ///
    /// If `enabled` is false, all log calls are no-ops.
    pub fn new(enabled: bool, max_size_bytes: u64, file_path: PathBuf) -> Self {
        let writer = if enabled {
            Self::open_writer(&file_path)
        } else {
            None
        };

        Self {
            enabled,
            max_size_bytes,
            file_path,
            writer,
        }
    }

    pub fn from_settings(settings: &AuditSettings) -> Self {
        Self::new(
            settings.enabled,
            settings.max_size_bytes,
            settings.path.clone(),
        )
    }

    /// A logger that never writes
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_size_bytes: 0,
            file_path: PathBuf::new(),
            writer: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log an audit event
    ///
    /// Serializes the event as a single JSON line and appends to the log file.
    pub fn log(&mut self, event: &AuditEvent) {
        if !self.enabled {
            return;
        }

        if self.writer.is_none() {
            self.writer = Self::open_writer(&self.file_path);
        }

        let writer = match self.writer.as_mut() {
            Some(w) => w,
            None => return,
        };

        match serde_json::to_string(event) {
            Ok(json) => {
                if writeln!(writer, "{}", json).is_ok() {
                    let _ = writer.flush();
                } else {
                    // Reopen on next call
                    self.writer = None;
                }
            }
            Err(e) => tracing::warn!("Failed to serialize audit event: {}", e),
        }

        self.maybe_rotate();
    }

    /// Open or create the log file for appending
    fn open_writer(file_path: &Path) -> Option<BufWriter<File>> {
        if let Some(dir) = file_path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                tracing::warn!("Failed to create audit directory: {}", e);
                return None;
            }
        }

        match OpenOptions::new().create(true).append(true).open(file_path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                tracing::warn!("Failed to open audit log {:?}: {}", file_path, e);
                None
            }
        }
    }

    /// Rotate the log file if it exceeds max_size_bytes
    fn maybe_rotate(&mut self) {
        let metadata = match fs::metadata(&self.file_path) {
            Ok(m) => m,
            Err(_) => return,
        };

        if metadata.len() >= self.max_size_bytes {
            self.writer = None;

            let rotated = self.file_path.with_extension("ndjson.1");
            let _ = fs::rename(&self.file_path, &rotated);

            self.writer = Self::open_writer(&self.file_path);
        }
    }
}
