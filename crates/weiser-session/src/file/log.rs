//! Append-only log encoding for the file backend.
//!
//! One JSON document per line:
//!
//! ```text
//! {"op":"put","session":{"id":"…","data":{…},"expires_at":1700000000000}}
//! {"op":"delete","id":"…"}
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use weiser_core::error::{AppError, ErrorKind};
use weiser_core::result::AppResult;
use weiser_core::types::session::Session;

/// A single log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LogEntry {
    /// Insert or replace a record.
    Put {
        /// The full record.
        session: Session,
    },
    /// Remove a record.
    Delete {
        /// Session id.
        id: String,
    },
}

impl LogEntry {
    /// Serialize as one newline-terminated line.
    pub fn encode(&self) -> AppResult<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// State rebuilt from a log file.
#[derive(Debug, Default)]
pub struct Replay {
    /// Live records by id.
    pub index: HashMap<String, Session>,
    /// Entries that no longer contribute to `index`.
    pub stale_entries: usize,
    /// Whether an incomplete final line was dropped.
    pub torn_tail: bool,
    /// Whether the log does not end in a newline, so the next append would
    /// land on the same line as the last entry.
    pub unterminated: bool,
}

impl Replay {
    /// The log must be rewritten before it can be appended to.
    pub fn needs_repair(&self) -> bool {
        self.torn_tail || self.unterminated
    }
}

/// Rebuild the index from raw log bytes.
///
/// A malformed final line is the signature of a crash mid-append and is
/// skipped. A malformed line anywhere else means the file is corrupt.
pub fn replay(bytes: &[u8]) -> AppResult<Replay> {
    let mut replay = Replay {
        unterminated: !bytes.is_empty() && !bytes.ends_with(b"\n"),
        ..Replay::default()
    };
    let lines: Vec<&[u8]> = bytes
        .split(|b| *b == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .collect();
    let last = lines.len().saturating_sub(1);

    for (n, line) in lines.iter().enumerate() {
        let entry = match serde_json::from_slice::<LogEntry>(line) {
            Ok(entry) => entry,
            Err(e) if n == last => {
                warn!(line = n + 1, error = %e, "Dropping incomplete trailing session log entry");
                replay.torn_tail = true;
                break;
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Serialization,
                    format!("Corrupt session log at line {}", n + 1),
                    e,
                ));
            }
        };

        match entry {
            LogEntry::Put { session } => {
                if replay.index.insert(session.id.clone(), session).is_some() {
                    replay.stale_entries += 1;
                }
            }
            LogEntry::Delete { id } => {
                // The delete line itself is dead weight, plus the put it removes.
                replay.stale_entries += 1;
                if replay.index.remove(&id).is_some() {
                    replay.stale_entries += 1;
                }
            }
        }
    }

    Ok(replay)
}
