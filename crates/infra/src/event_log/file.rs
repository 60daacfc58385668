//! JSON-lines event log on the local filesystem.
//!
//! One `StoredEvent` per line. The file is read and chain-verified once on
//! open; afterwards reads are served from memory and appends go to both.
//!
//! An append is committed once its line, newline included, is written. An
//! unterminated last line is therefore a torn append and is cut on open.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, error, warn};

use supplychain_core::ProductId;

use super::chain::verify_chain;
use super::index::LogIndex;
use super::r#trait::{EventLog, EventLogError, StoredEvent, UncommittedEvent};

#[derive(Debug)]
struct FileLogState {
    file: File,
    len_bytes: u64,
    index: LogIndex,
    /// Set when a torn append could not be cut back; refuses further appends.
    torn: bool,
}

#[derive(Debug)]
pub struct FileEventLog {
    path: PathBuf,
    sync_writes: bool,
    state: Mutex<FileLogState>,
}

impl FileEventLog {
    /// Open (or create) the log at `path`, loading and verifying its contents.
    ///
    /// With `sync_writes`, every append is followed by `sync_data`.
    pub fn open(path: impl AsRef<Path>, sync_writes: bool) -> Result<Self, EventLogError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let (events, valid_len) = read_entries(&mut file)?;
        verify_chain(&events)?;

        let file_len = file.seek(SeekFrom::End(0))?;
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                dropped_bytes = file_len - valid_len,
                "cutting unterminated last line left by an interrupted append"
            );
            file.set_len(valid_len)?;
        }

        let mut index = LogIndex::default();
        for stored in events {
            index.push(stored);
        }
        let len_bytes = file.seek(SeekFrom::End(0))?;

        debug!(path = %path.display(), entries = index.len(), "event log opened");

        Ok(Self {
            path,
            sync_writes,
            state: Mutex::new(FileLogState {
                file,
                len_bytes,
                index,
                torn: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse every newline-terminated entry. Returns the entries and the byte
/// length they span; anything past it is an unterminated last line.
fn read_entries(file: &mut File) -> Result<(Vec<StoredEvent>, u64), EventLogError> {
    file.seek(SeekFrom::Start(0))?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)?;

    let valid_len = raw.iter().rposition(|b| *b == b'\n').map_or(0, |pos| pos + 1);
    let mut events = Vec::new();
    for (idx, line) in raw[..valid_len].split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let stored: StoredEvent = serde_json::from_slice(line).map_err(|e| EventLogError::Corrupt {
            line: idx + 1,
            reason: e.to_string(),
        })?;
        events.push(stored);
    }
    Ok((events, valid_len as u64))
}

fn write_line(file: &mut File, line: &[u8], sync: bool) -> std::io::Result<()> {
    file.write_all(line)?;
    file.flush()?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}

impl EventLog for FileEventLog {
    fn append(&self, event: UncommittedEvent) -> Result<StoredEvent, EventLogError> {
        let mut state = self.state.lock().map_err(|_| EventLogError::Poisoned)?;
        if state.torn {
            return Err(EventLogError::Unavailable(format!(
                "{} ends in a partial entry; reopen the log to recover",
                self.path.display()
            )));
        }
        let stored = state.index.seal_next(event)?;

        let mut line = serde_json::to_vec(&stored)?;
        line.push(b'\n');

        if let Err(err) = write_line(&mut state.file, &line, self.sync_writes) {
            // Cut any partial line so the file stays a valid chain.
            let keep = state.len_bytes;
            if let Err(truncate_err) = state.file.set_len(keep) {
                error!(path = %self.path.display(), error = %truncate_err, "failed to cut partial append; refusing further appends");
                state.torn = true;
            }
            return Err(err.into());
        }

        state.len_bytes += line.len() as u64;
        state.index.push(stored.clone());
        Ok(stored)
    }

    fn list_events(&self, product_id: ProductId) -> Result<Vec<StoredEvent>, EventLogError> {
        let state = self.state.lock().map_err(|_| EventLogError::Poisoned)?;
        Ok(state.index.product_events(product_id))
    }

    fn read_all(&self) -> Result<Vec<StoredEvent>, EventLogError> {
        let state = self.state.lock().map_err(|_| EventLogError::Poisoned)?;
        Ok(state.index.all())
    }

    fn len(&self) -> Result<u64, EventLogError> {
        let state = self.state.lock().map_err(|_| EventLogError::Poisoned)?;
        Ok(state.index.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use supplychain_core::{ActorId, LifecycleState};
    use supplychain_products::LifecycleEvent;

    fn created(id: u64) -> UncommittedEvent {
        UncommittedEvent::new(LifecycleEvent::created(
            ProductId::new(id),
            format!("crate-{id}"),
            ActorId::new("alice").unwrap(),
            Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap(),
        ))
    }

    fn packed(id: u64) -> UncommittedEvent {
        UncommittedEvent::new(LifecycleEvent {
            product_id: ProductId::new(id),
            previous_state: Some(LifecycleState::Created),
            new_state: LifecycleState::Packed,
            actor: ActorId::new("packer").unwrap(),
            name: None,
            occurred_at: Utc.timestamp_opt(1_700_000_060, 0).unwrap(),
        })
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let appended = {
            let log = FileEventLog::open(&path, true).unwrap();
            vec![
                log.append(created(0)).unwrap(),
                log.append(created(1)).unwrap(),
                log.append(packed(0)).unwrap(),
            ]
        };

        let reopened = FileEventLog::open(&path, false).unwrap();
        assert_eq!(reopened.read_all().unwrap(), appended);
        assert_eq!(reopened.list_events(ProductId::new(0)).unwrap().len(), 2);

        // Appends continue the chain after reopen.
        let next = reopened.append(packed(1)).unwrap();
        assert_eq!(next.sequence_number, 4);
        assert_eq!(next.prev_hash, appended[2].hash);
    }

    #[test]
    fn one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let log = FileEventLog::open(&path, false).unwrap();
        log.append(created(0)).unwrap();
        log.append(packed(0)).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["sequence_number"], 1);
        assert_eq!(first["event_type"], "supplychain.product.created");
    }

    #[test]
    fn garbage_line_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        {
            let log = FileEventLog::open(&path, false).unwrap();
            log.append(created(0)).unwrap();
        }
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        match FileEventLog::open(&path, false) {
            Err(EventLogError::Corrupt { line: 2, .. }) => {}
            other => panic!("expected Corrupt at line 2, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_last_line_is_cut_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let committed = {
            let log = FileEventLog::open(&path, false).unwrap();
            vec![log.append(created(0)).unwrap(), log.append(created(1)).unwrap()]
        };
        let clean_len = std::fs::metadata(&path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"event_id":"0190","sequence_number":3,"ev"#).unwrap();
        drop(file);

        let log = FileEventLog::open(&path, false).unwrap();
        assert_eq!(log.read_all().unwrap(), committed);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), clean_len);

        let next = log.append(packed(0)).unwrap();
        assert_eq!(next.sequence_number, 3);
        drop(log);
        assert_eq!(FileEventLog::open(&path, false).unwrap().len().unwrap(), 3);
    }

    #[test]
    fn failed_cut_after_partial_write_stops_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, b"").unwrap();

        // A read-only handle makes both the write and the cut fail.
        let log = FileEventLog {
            path: path.clone(),
            sync_writes: false,
            state: Mutex::new(FileLogState {
                file: File::open(&path).unwrap(),
                len_bytes: 0,
                index: LogIndex::default(),
                torn: false,
            }),
        };

        assert!(matches!(log.append(created(0)), Err(EventLogError::Io(_))));
        match log.append(created(0)) {
            Err(EventLogError::Unavailable(reason)) => assert!(reason.contains("partial entry"), "{reason}"),
            other => panic!("expected Unavailable, got {other:?}"),
        }
        assert_eq!(log.len().unwrap(), 0);
    }

    #[test]
    fn edited_entry_is_rejected_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        {
            let log = FileEventLog::open(&path, false).unwrap();
            log.append(created(0)).unwrap();
            log.append(packed(0)).unwrap();
        }
        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, raw.replace("\"packer\"", "\"mallory\"")).unwrap();

        match FileEventLog::open(&path, false) {
            Err(EventLogError::ChainBroken { sequence: 2 }) => {}
            other => panic!("expected ChainBroken, got {other:?}"),
        }
    }
}
