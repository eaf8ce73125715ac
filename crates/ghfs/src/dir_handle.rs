// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::metadata::{DirEntry, FileInfo};

/// One batch of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirBatch {
    pub entries: Vec<DirEntry>,
    /// Set when a bounded read found nothing more to return
    pub eof: bool,
}

struct DirHandleState {
    info: FileInfo,
    entries: Vec<DirEntry>,
    offset: usize,
    closed: bool,
}

/// An open directory: a cursor over the children present when it was
/// opened. Children added later are not seen.
pub struct DirHandle {
    state: Mutex<DirHandleState>,
}

impl DirHandle {
    pub(crate) fn new(info: FileInfo, entries: Vec<DirEntry>) -> Self {
        Self {
            state: Mutex::new(DirHandleState {
                info,
                entries,
                offset: 0,
                closed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, DirHandleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stat(&self) -> Result<FileInfo> {
        let state = self.state();
        if state.closed {
            return Err(Error::closed("stat", &state.info.name));
        }
        Ok(state.info.clone())
    }

    /// Returns the next entries.
    ///
    /// With `n <= 0` every remaining entry is returned and `eof` is never
    /// set; an exhausted handle yields an empty batch. With `n > 0` at most
    /// `n` entries are returned and `eof` is set once the cursor reaches the
    /// end.
    pub fn read_dir(&self, n: isize) -> Result<DirBatch> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::closed("readdir", &state.info.name));
        }

        let remaining = state.entries.len() - state.offset;
        let Ok(limit) = usize::try_from(n) else {
            return Ok(state.take(remaining, false));
        };
        if limit == 0 {
            return Ok(state.take(remaining, false));
        }

        let count = limit.min(remaining);
        let eof = count == remaining;
        Ok(state.take(count, eof))
    }

    pub fn close(&self) -> Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::closed("close", &state.info.name));
        }
        state.closed = true;
        state.entries = Vec::new();
        Ok(())
    }
}

impl DirHandleState {
    fn take(&mut self, count: usize, eof: bool) -> DirBatch {
        let start = self.offset;
        self.offset += count;
        DirBatch {
            entries: self.entries[start..self.offset].to_vec(),
            eof,
        }
    }
}

impl std::fmt::Debug for DirHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirHandle")
            .field("name", &self.state().info.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::metadata::{DIR_SIZE, FileMode};

    fn info(name: &str, mode: FileMode) -> FileInfo {
        FileInfo {
            name: name.to_string(),
            size: if mode.is_dir() { DIR_SIZE } else { 1 },
            mode,
            mod_time: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn handle(names: &[&str]) -> DirHandle {
        let entries = names
            .iter()
            .map(|n| DirEntry::new(info(n, FileMode::file(0o644))))
            .collect();
        DirHandle::new(info("d", FileMode::dir(0o755)), entries)
    }

    fn names(batch: &DirBatch) -> Vec<&str> {
        batch.entries.iter().map(DirEntry::name).collect()
    }

    #[test]
    fn test_read_all() {
        let h = handle(&["a", "b", "c"]);
        let batch = h.read_dir(0).unwrap();
        assert_eq!(names(&batch), ["a", "b", "c"]);
        assert!(!batch.eof);

        let batch = h.read_dir(-1).unwrap();
        assert!(batch.entries.is_empty());
        assert!(!batch.eof);
    }

    #[test]
    fn test_read_batches() {
        let h = handle(&["a", "b", "c"]);

        let batch = h.read_dir(2).unwrap();
        assert_eq!(names(&batch), ["a", "b"]);
        assert!(!batch.eof);

        let batch = h.read_dir(2).unwrap();
        assert_eq!(names(&batch), ["c"]);
        assert!(batch.eof);

        let batch = h.read_dir(2).unwrap();
        assert!(batch.entries.is_empty());
        assert!(batch.eof);
    }

    #[test]
    fn test_exact_batch_sets_eof() {
        let h = handle(&["a", "b"]);
        let batch = h.read_dir(2).unwrap();
        assert_eq!(batch.entries.len(), 2);
        assert!(batch.eof);
    }

    #[test]
    fn test_empty_directory() {
        let h = handle(&[]);
        let batch = h.read_dir(1).unwrap();
        assert!(batch.entries.is_empty());
        assert!(batch.eof);
        assert!(h.stat().unwrap().is_dir());
    }

    #[test]
    fn test_closed() {
        let h = handle(&["a"]);
        h.close().unwrap();
        assert!(h.read_dir(0).unwrap_err().is_closed());
        assert!(h.stat().unwrap_err().is_closed());
        assert!(h.close().unwrap_err().is_closed());
    }
}
