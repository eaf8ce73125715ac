// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use diagnostics::*;

use crate::error::{Error, Result};
use crate::file_handle::FileHandle;
use crate::fs::FS;
use crate::metadata::{DirEntry, FileInfo, FileMode};

/// Default permissions of a file
pub const FILE_PERM: u32 = 0o644;

/// Creation time settings for a file.
///
/// Content, when given, fixes the size to its length regardless of where
/// `Size` appears among the options.
#[derive(Debug, Clone)]
pub enum FileOption {
    Content(Vec<u8>),
    Url(String),
    ModTime(DateTime<Utc>),
    Mode(FileMode),
    Size(u64),
}

struct FileState {
    size: u64,
    mode: FileMode,
    mod_time: DateTime<Utc>,
    url: Option<String>,
    content: Option<Arc<[u8]>>,
}

impl FileState {
    /// Content is downloaded when it was never loaded, or when what is held
    /// disagrees with the advertised size.
    fn needs_download(&self) -> bool {
        match &self.content {
            None => self.url.is_some(),
            Some(content) => content.len() as u64 != self.size,
        }
    }
}

pub(crate) struct FileInner {
    name: String,
    org: String,
    repo: String,
    /// Serializes downloads of this file
    download_lock: Mutex<()>,
    state: Mutex<FileState>,
}

/// Handle to a file node. Clones share the node.
#[derive(Clone)]
pub struct File(Arc<FileInner>);

#[derive(Clone)]
pub(crate) struct WeakFile(Weak<FileInner>);

impl WeakFile {
    pub(crate) fn upgrade(&self) -> Option<File> {
        self.0.upgrade().map(File)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl File {
    pub(crate) fn new(name: &str, org: &str, repo: &str, opts: Vec<FileOption>) -> Self {
        let mut state = FileState {
            size: 0,
            mode: FileMode::file(FILE_PERM),
            mod_time: DateTime::<Utc>::UNIX_EPOCH,
            url: None,
            content: None,
        };

        let mut size_hint = None;
        for opt in opts {
            match opt {
                FileOption::Content(content) => state.content = Some(content.into()),
                FileOption::Url(url) => state.url = Some(url),
                FileOption::ModTime(t) => state.mod_time = t,
                FileOption::Mode(mode) => state.mode = mode,
                FileOption::Size(size) => size_hint = Some(size),
            }
        }
        state.size = match (&state.content, size_hint) {
            (Some(content), _) => content.len() as u64,
            (None, Some(size)) => size,
            (None, None) => 0,
        };

        File(Arc::new(FileInner {
            name: name.to_string(),
            org: org.to_string(),
            repo: repo.to_string(),
            download_lock: Mutex::new(()),
            state: Mutex::new(state),
        }))
    }

    fn state(&self) -> MutexGuard<'_, FileState> {
        lock(&self.0.state)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn org(&self) -> &str {
        &self.0.org
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.0.repo
    }

    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.state().url.clone()
    }

    /// True once content is held that matches the advertised size.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        let state = self.state();
        state.content.is_some() && !state.needs_download()
    }

    #[must_use]
    pub fn info(&self) -> FileInfo {
        let state = self.state();
        FileInfo {
            name: self.0.name.clone(),
            size: state.size,
            mode: state.mode,
            mod_time: state.mod_time,
        }
    }

    #[must_use]
    pub fn to_dir_entry(&self) -> DirEntry {
        DirEntry::new(self.info())
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &File) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakFile {
        WeakFile(Arc::downgrade(&self.0))
    }

    /// Opens a read handle, downloading the content first when needed.
    ///
    /// A successful download replaces the held content and sets the size to
    /// the number of bytes received. Concurrent opens of the same file wait
    /// for one download; `info` and directory listings do not wait.
    pub fn open(&self, fs: &FS) -> Result<FileHandle> {
        if self.state().needs_download() {
            let _guard = lock(&self.0.download_lock);
            self.download(fs)?;
        }

        let state = self.state();
        let info = FileInfo {
            name: self.0.name.clone(),
            size: state.size,
            mode: state.mode,
            mod_time: state.mod_time,
        };
        let content = state.content.clone().unwrap_or_else(|| Arc::from(Vec::new()));
        Ok(FileHandle::new(info, content))
    }

    /// Called with the download lock held. The state lock is released for
    /// the duration of the request.
    fn download(&self, fs: &FS) -> Result<()> {
        let url = {
            let state = self.state();
            if !state.needs_download() {
                return Ok(());
            }
            let Some(url) = state.url.clone() else {
                return Err(Error::remote(format!(
                    "{}: content does not match size {} and there is nowhere to download it from",
                    self.0.name, state.size
                )));
            };
            url
        };

        debug!("downloading {name} from {url}", name: self.0.name.as_str(), url: url.as_str());
        let body = fs
            .content()
            .fetch(&url)?
            .read_all()
            .map_err(|err| Error::remote_with(format!("{url}: read failed"), err))?;

        let mut state = self.state();
        state.size = body.len() as u64;
        state.content = Some(body.into());
        Ok(())
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("name", &self.0.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::config::Config;
    use crate::dir::Dir;
    use crate::remote::{ContentFetcher, ContentType, Download};
    use crate::testing::{TestContent, TestMetadata, test_fs, test_fs_with_content};

    #[test]
    fn test_content_sets_size() {
        let root = Dir::root();
        let a = root.add_file(
            "a",
            vec![FileOption::Size(99), FileOption::Content(b"abc".to_vec())],
        );
        let b = root.add_file(
            "b",
            vec![FileOption::Content(b"abc".to_vec()), FileOption::Size(99)],
        );
        assert_eq!(a.info().size, 3);
        assert_eq!(b.info().size, 3);
        assert!(a.is_loaded());
    }

    #[test]
    fn test_defaults() {
        let f = Dir::root().add_file("f", vec![]);
        let info = f.info();
        assert_eq!(info.mode, FileMode::file(0o644));
        assert_eq!(info.size, 0);
        assert!(!info.is_dir());
        assert!(f.url().is_none());
    }

    #[test]
    fn test_open_inline_content() {
        let fs = test_fs();
        let f = fs
            .root()
            .add_file("d.md", vec![FileOption::Content(b"notes".to_vec())]);

        let mut handle = f.open(&fs).unwrap();
        let mut s = String::new();
        _ = handle.read_to_string(&mut s).unwrap();
        assert_eq!(s, "notes");
        assert_eq!(handle.stat().unwrap().size, 5);
    }

    #[test]
    fn test_open_downloads_once() {
        let content = TestContent::new().with_bytes("https://raw/x", b"0123456789");
        let (fs, content) = test_fs_with_content(content);
        let f = fs.root().add_file(
            "x",
            vec![
                FileOption::Url("https://raw/x".to_string()),
                FileOption::Size(10),
            ],
        );
        assert!(!f.is_loaded());

        let mut first = String::new();
        _ = f.open(&fs).unwrap().read_to_string(&mut first).unwrap();
        let mut second = String::new();
        _ = f.open(&fs).unwrap().read_to_string(&mut second).unwrap();

        assert_eq!(first, "0123456789");
        assert_eq!(second, first);
        assert_eq!(content.requests(), vec!["https://raw/x".to_string()]);
        assert!(f.is_loaded());
    }

    #[test]
    fn test_open_size_reconciled() {
        let content = TestContent::new().with_bytes("https://raw/y", b"actual");
        let (fs, _) = test_fs_with_content(content);
        let f = fs.root().add_file(
            "y",
            vec![
                FileOption::Url("https://raw/y".to_string()),
                FileOption::Size(1000),
            ],
        );

        let handle = f.open(&fs).unwrap();
        assert_eq!(handle.stat().unwrap().size, 6);
        assert_eq!(f.info().size, 6);
    }

    #[test]
    fn test_open_download_failure() {
        let (fs, _) = test_fs_with_content(TestContent::new());
        let f = fs.root().add_file(
            "z",
            vec![FileOption::Url("https://raw/missing".to_string())],
        );

        let err = f.open(&fs).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RemoteFetch);
        assert!(!f.is_loaded());
    }

    /// Blocks each download until the test lets it finish.
    struct Gate {
        started: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl ContentFetcher for Gate {
        fn fetch(&self, _url: &str) -> Result<Download> {
            self.started.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok(Download::new(
                ContentType::parse(Some("text/plain")),
                Cursor::new(b"slow".to_vec()),
            ))
        }
    }

    #[test]
    fn test_listing_during_download() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let gate = Gate {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        };
        let fs = FS::with_remote(Config::default(), Arc::new(TestMetadata::new()), Arc::new(gate));
        let f = fs.root().add_file(
            "slow",
            vec![FileOption::Url("https://raw/slow".to_string()), FileOption::Size(4)],
        );

        thread::scope(|s| {
            let opener = s.spawn(|| f.open(&fs).map(|h| h.stat().unwrap().size));
            started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

            let (done_tx, done_rx) = mpsc::channel();
            let (root, file) = (fs.root(), f.clone());
            let lister = s.spawn(move || {
                let names: Vec<String> = root
                    .open()
                    .read_dir(0)
                    .unwrap()
                    .entries
                    .iter()
                    .map(|e| e.name().to_string())
                    .collect();
                done_tx.send((names, file.info().size)).unwrap();
            });

            // Metadata stays readable while the download is in flight
            let (names, size) = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(names, ["slow"]);
            assert_eq!(size, 4);
            assert!(!f.is_loaded());

            release_tx.send(()).unwrap();
            lister.join().unwrap();
            assert_eq!(opener.join().unwrap().unwrap(), 4);
        });
        assert!(f.is_loaded());
    }

    #[test]
    fn test_open_without_source() {
        let fs = test_fs();
        let f = fs.root().add_file("empty", vec![FileOption::Size(0)]);
        let mut buf = Vec::new();
        _ = f.open(&fs).unwrap().read_to_end(&mut buf).unwrap();
        assert!(buf.is_empty());
    }
}
