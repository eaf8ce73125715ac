// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::metadata::FileInfo;

struct FileHandleState {
    info: FileInfo,
    /// None once closed
    reader: Option<Cursor<Arc<[u8]>>>,
}

/// An open file: a read cursor over content captured at open time.
pub struct FileHandle {
    state: Mutex<FileHandleState>,
}

impl FileHandle {
    pub(crate) fn new(info: FileInfo, content: Arc<[u8]>) -> Self {
        Self {
            state: Mutex::new(FileHandleState {
                info,
                reader: Some(Cursor::new(content)),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FileHandleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stat(&self) -> Result<FileInfo> {
        let state = self.state();
        match state.reader {
            Some(_) => Ok(state.info.clone()),
            None => Err(Error::closed("stat", &state.info.name)),
        }
    }

    /// Copies up to `buf.len()` bytes from the cursor, returning 0 at the end.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.state();
        let FileHandleState { info, reader } = &mut *state;
        match reader {
            Some(reader) => Ok(reader.read(buf)?),
            None => Err(Error::closed("read", &info.name)),
        }
    }

    /// Releases the content. Closing twice is an error.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state();
        match state.reader.take() {
            Some(_) => Ok(()),
            None => Err(Error::closed("close", &state.info.name)),
        }
    }
}

impl Read for &FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        FileHandle::read(self, buf).map_err(std::io::Error::other)
    }
}

impl Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        FileHandle::read(self, buf).map_err(std::io::Error::other)
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.state().info.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::metadata::FileMode;

    fn handle(content: &[u8]) -> FileHandle {
        let info = FileInfo {
            name: "a".to_string(),
            size: content.len() as u64,
            mode: FileMode::file(0o644),
            mod_time: DateTime::<Utc>::UNIX_EPOCH,
        };
        FileHandle::new(info, Arc::from(content))
    }

    #[test]
    fn test_read_in_pieces() {
        let h = handle(b"hello");
        let mut buf = [0u8; 2];
        assert_eq!(h.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"he");
        assert_eq!(h.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"ll");
        assert_eq!(h.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'o');
        assert_eq!(h.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_io_read() {
        let h = handle(b"a\n");
        let mut s = String::new();
        _ = (&h).read_to_string(&mut s).unwrap();
        assert_eq!(s, "a\n");
        assert_eq!(h.stat().unwrap().size, 2);
    }

    #[test]
    fn test_closed() {
        let h = handle(b"x");
        h.close().unwrap();

        let mut buf = [0u8; 1];
        assert!(h.read(&mut buf).unwrap_err().is_closed());
        assert!(h.stat().unwrap_err().is_closed());
        assert!(h.close().unwrap_err().is_closed());

        let io_err = Read::read(&mut &h, &mut buf).unwrap_err();
        assert_eq!(io_err.kind(), std::io::ErrorKind::Other);
    }
}
