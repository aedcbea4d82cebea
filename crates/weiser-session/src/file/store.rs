//! File-backed session store using an append-only log.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use weiser_core::clock::Clock;
use weiser_core::config::session::FileStoreConfig;
use weiser_core::result::AppResult;
use weiser_core::traits::session_store::{SessionStore, UpdateOutcome};
use weiser_core::types::session::{Session, SessionMutation, expiry_after};

use super::log::{self, LogEntry};

/// Mutable state behind the store lock.
#[derive(Debug)]
struct LogState {
    /// Live records, authoritative for reads.
    index: HashMap<String, Session>,
    /// Append handle on the log file.
    file: File,
    /// Log entries superseded by later ones.
    stale_entries: usize,
    /// Set when an append failed part-way; the log must be rewritten
    /// before anything else is appended.
    needs_rewrite: bool,
}

/// Session store persisted to a single append-only JSON-lines file.
///
/// Every mutation appends one entry; the in-memory index is only updated
/// once the append succeeded. The log is rewritten from the index (expired
/// records dropped) once enough entries are superseded. Rewrites go to a
/// temporary file that atomically replaces the log.
#[derive(Debug)]
pub struct FileSessionStore {
    /// Log file path.
    path: PathBuf,
    /// fsync after each append.
    fsync: bool,
    /// Superseded-entry count that triggers compaction.
    compact_threshold: usize,
    /// Used to drop expired records during compaction.
    clock: Arc<dyn Clock>,
    /// Index and file handle under one exclusive lock.
    state: Mutex<LogState>,
}

impl FileSessionStore {
    /// Open (or create) the log at the configured path and replay it.
    pub async fn open(config: &FileStoreConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let path = PathBuf::from(&config.path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let replay = log::replay(&bytes)?;

        info!(
            path = %path.display(),
            sessions = replay.index.len(),
            stale_entries = replay.stale_entries,
            "Opened session log"
        );

        let file = open_append(&path).await?;
        let needs_rewrite =
            replay.needs_repair() || replay.stale_entries >= config.compact_threshold;

        let store = Self {
            path,
            fsync: config.fsync,
            compact_threshold: config.compact_threshold,
            clock,
            state: Mutex::new(LogState {
                index: replay.index,
                file,
                stale_entries: replay.stale_entries,
                needs_rewrite,
            }),
        };

        if needs_rewrite {
            let mut state = store.state.lock().await;
            store.compact_locked(&mut state).await?;
        }

        Ok(store)
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the log from the live index now.
    pub async fn compact(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;
        self.compact_locked(&mut state).await
    }

    async fn compact_locked(&self, state: &mut LogState) -> AppResult<()> {
        let now = self.clock.now();
        let before = state.index.len();
        state.index.retain(|_, session| session.is_valid(now));

        let mut buf = Vec::new();
        for session in state.index.values() {
            buf.extend(
                LogEntry::Put {
                    session: session.clone(),
                }
                .encode()?,
            );
        }

        let tmp = compaction_path(&self.path);
        let mut file = File::create(&tmp).await?;
        file.write_all(&buf).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &self.path).await?;

        state.file = open_append(&self.path).await?;
        state.stale_entries = 0;
        state.needs_rewrite = false;

        info!(
            path = %self.path.display(),
            sessions = state.index.len(),
            dropped_expired = before - state.index.len(),
            "Compacted session log"
        );
        Ok(())
    }

    async fn append(&self, state: &mut LogState, entry: &LogEntry) -> AppResult<()> {
        if state.needs_rewrite {
            self.compact_locked(state).await?;
        }

        let line = entry.encode()?;
        let result = async {
            state.file.write_all(&line).await?;
            state.file.flush().await?;
            if self.fsync {
                state.file.sync_data().await?;
            }
            Ok::<(), std::io::Error>(())
        }
        .await;

        if let Err(e) = result {
            state.needs_rewrite = true;
            return Err(e.into());
        }
        Ok(())
    }

    async fn maybe_compact(&self, state: &mut LogState) {
        if state.stale_entries < self.compact_threshold {
            return;
        }
        // The mutation itself already succeeded; a failed compaction is retried
        // on the next append.
        if let Err(e) = self.compact_locked(state).await {
            warn!(path = %self.path.display(), error = %e, "Session log compaction failed");
            state.needs_rewrite = true;
        }
    }

    async fn remove_locked(&self, state: &mut LogState, id: &str) -> AppResult<()> {
        self.append(state, &LogEntry::Delete { id: id.to_string() })
            .await?;
        state.index.remove(id);
        state.stale_entries += 2;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn put(&self, session: &Session) -> AppResult<()> {
        let mut state = self.state.lock().await;
        self.append(
            &mut state,
            &LogEntry::Put {
                session: session.clone(),
            },
        )
        .await?;
        if state
            .index
            .insert(session.id.clone(), session.clone())
            .is_some()
        {
            state.stale_entries += 1;
        }
        self.maybe_compact(&mut state).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<Session>> {
        let state = self.state.lock().await;
        Ok(state.index.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if !state.index.contains_key(id) {
            return Ok(());
        }
        self.remove_locked(&mut state, id).await?;
        self.maybe_compact(&mut state).await;
        Ok(())
    }

    async fn list_ids(&self) -> AppResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state.index.keys().cloned().collect())
    }

    async fn update(
        &self,
        id: &str,
        mutation: &SessionMutation,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<UpdateOutcome> {
        let mut state = self.state.lock().await;

        let Some(current) = state.index.get(id) else {
            return Ok(UpdateOutcome::Missing);
        };

        if current.is_expired(now) {
            self.remove_locked(&mut state, id).await?;
            debug!(session_id = %id, "Purged expired session during update");
            self.maybe_compact(&mut state).await;
            return Ok(UpdateOutcome::Expired);
        }

        let mut updated = current.clone();
        mutation.apply(&mut updated, expiry_after(now, ttl));

        self.append(
            &mut state,
            &LogEntry::Put {
                session: updated.clone(),
            },
        )
        .await?;
        state.index.insert(id.to_string(), updated.clone());
        state.stale_entries += 1;
        self.maybe_compact(&mut state).await;

        Ok(UpdateOutcome::Updated(updated))
    }

    async fn purge_if_expired(&self, id: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let expired = state.index.get(id).is_some_and(|s| s.is_expired(now));
        if expired {
            self.remove_locked(&mut state, id).await?;
            self.maybe_compact(&mut state).await;
        }
        Ok(expired)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.path).await.is_ok())
    }
}

async fn open_append(path: &Path) -> AppResult<File> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    Ok(file)
}

fn compaction_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".compact");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weiser_core::clock::ManualClock;

    fn config(dir: &tempfile::TempDir, compact_threshold: usize) -> FileStoreConfig {
        FileStoreConfig {
            path: dir
                .path()
                .join("sessions.log")
                .to_string_lossy()
                .into_owned(),
            fsync: false,
            compact_threshold,
        }
    }

    fn session(id: &str, now: DateTime<Utc>, secs: u64) -> Session {
        Session::new(id, expiry_after(now, Duration::from_secs(secs)))
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();

        {
            let store = FileSessionStore::open(&config(&dir, 1000), clock.clone())
                .await
                .unwrap();
            for i in 0..5 {
                store.put(&session(&format!("s{i}"), now, 60)).await.unwrap();
            }
            let mutation = SessionMutation::Insert {
                key: "user".into(),
                value: json!("alice"),
            };
            store
                .update("s0", &mutation, now, Duration::from_secs(60))
                .await
                .unwrap();
            store.delete("s4").await.unwrap();
        }

        let store = FileSessionStore::open(&config(&dir, 1000), clock.clone())
            .await
            .unwrap();
        let mut ids = store.list_ids().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["s0", "s1", "s2", "s3"]);
        let s0 = store.get("s0").await.unwrap().unwrap();
        assert_eq!(s0.get("user"), Some(&json!("alice")));
    }

    #[tokio::test]
    async fn test_compaction_drops_expired_and_superseded() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();
        let store = FileSessionStore::open(&config(&dir, 1000), clock.clone())
            .await
            .unwrap();

        store.put(&session("short", now, 1)).await.unwrap();
        store.put(&session("long", now, 600)).await.unwrap();
        for _ in 0..10 {
            store
                .update("long", &SessionMutation::Touch, now, Duration::from_secs(600))
                .await
                .unwrap();
        }

        clock.advance(Duration::from_secs(5));
        store.compact().await.unwrap();

        let contents = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("\"long\""));
        assert!(store.get("short").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_threshold_triggers_compaction() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();
        let store = FileSessionStore::open(&config(&dir, 4), clock.clone())
            .await
            .unwrap();

        store.put(&session("a", now, 60)).await.unwrap();
        for _ in 0..4 {
            store
                .update("a", &SessionMutation::Touch, now, Duration::from_secs(60))
                .await
                .unwrap();
        }

        let contents = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_torn_tail_is_repaired_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();
        let cfg = config(&dir, 1000);

        {
            let store = FileSessionStore::open(&cfg, clock.clone()).await.unwrap();
            store.put(&session("a", now, 60)).await.unwrap();
        }
        let mut raw = tokio::fs::read(&cfg.path).await.unwrap();
        raw.extend_from_slice(b"{\"op\":\"put\",\"sess");
        tokio::fs::write(&cfg.path, raw).await.unwrap();

        let store = FileSessionStore::open(&cfg, clock.clone()).await.unwrap();
        assert!(store.get("a").await.unwrap().is_some());

        // Appending after repair must not glue onto the partial line.
        store.put(&session("b", now, 60)).await.unwrap();
        drop(store);
        let store = FileSessionStore::open(&cfg, clock.clone()).await.unwrap();
        assert_eq!(store.list_ids().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unterminated_last_entry_is_repaired_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();
        let cfg = config(&dir, 1000);

        {
            let store = FileSessionStore::open(&cfg, clock.clone()).await.unwrap();
            store.put(&session("a", now, 60)).await.unwrap();
        }
        let mut raw = tokio::fs::read(&cfg.path).await.unwrap();
        assert_eq!(raw.pop(), Some(b'\n'));
        tokio::fs::write(&cfg.path, raw).await.unwrap();

        {
            let store = FileSessionStore::open(&cfg, clock.clone()).await.unwrap();
            store.put(&session("b", now, 60)).await.unwrap();
            store.put(&session("c", now, 60)).await.unwrap();
        }

        let contents = tokio::fs::read_to_string(&cfg.path).await.unwrap();
        assert_eq!(contents.lines().count(), 3);

        let store = FileSessionStore::open(&cfg, clock.clone()).await.unwrap();
        let mut ids = store.list_ids().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_update_expired_is_purged() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();
        let store = FileSessionStore::open(&config(&dir, 1000), clock.clone())
            .await
            .unwrap();

        store.put(&session("a", now, 2)).await.unwrap();
        let later = now + chrono::TimeDelta::seconds(3);
        let outcome = store
            .update("a", &SessionMutation::Touch, later, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Expired);
        assert!(store.get("a").await.unwrap().is_none());
        assert!(!store.purge_if_expired("a", later).await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::open(
            &config(&dir, 1000),
            Arc::new(ManualClock::starting_now()),
        )
        .await
        .unwrap();
        assert!(store.health_check().await.unwrap());
    }
}
