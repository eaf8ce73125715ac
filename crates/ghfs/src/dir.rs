// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use diagnostics::*;

use crate::dir_handle::DirHandle;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::file::{File, FileOption};
use crate::fs::FS;
use crate::metadata::{DIR_SIZE, DirEntry, FileInfo, FileMode};
use crate::node::{Child, Node};

/// Default permissions of a directory
pub const DIR_PERM: u32 = 0o755;

/// Creation time settings for a directory. Options are applied in order
/// to a directory that has already inherited org, repo, branch and path
/// from its parent.
#[derive(Clone)]
pub enum DirOption {
    Org(String),
    Repo(String),
    Branch(String),
    /// Resets the in-repository path, for the org/repo/git/branch levels
    /// whose names are not part of the repository tree.
    NotInPath,
    ModTime(DateTime<Utc>),
    Mode(FileMode),
    Fetcher(Arc<dyn Fetcher>),
}

impl DirOption {
    pub fn org<S: Into<String>>(org: S) -> Self {
        DirOption::Org(org.into())
    }

    pub fn repo<S: Into<String>>(repo: S) -> Self {
        DirOption::Repo(repo.into())
    }

    pub fn branch<S: Into<String>>(branch: S) -> Self {
        DirOption::Branch(branch.into())
    }

    pub fn fetcher<F: Fetcher + 'static>(fetcher: F) -> Self {
        DirOption::Fetcher(Arc::new(fetcher))
    }
}

/// Attributes fixed when the directory is created.
struct Attrs {
    org: String,
    repo: String,
    branch: String,
    path: Vec<String>,
}

struct DirState {
    mode: FileMode,
    mod_time: DateTime<Utc>,
    children: BTreeMap<String, Child>,
    fetcher: Option<Arc<dyn Fetcher>>,
}

pub(crate) struct DirInner {
    name: String,
    parent: Weak<DirInner>,
    attrs: Attrs,
    /// Serializes fetch attempts for this directory
    fetch_lock: Mutex<()>,
    state: Mutex<DirState>,
}

/// Handle to a directory node. Clones share the node.
#[derive(Clone)]
pub struct Dir(Arc<DirInner>);

#[derive(Clone)]
pub(crate) struct WeakDir(Weak<DirInner>);

impl WeakDir {
    pub(crate) fn upgrade(&self) -> Option<Dir> {
        self.0.upgrade().map(Dir)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Dir {
    /// A new root directory, named `.`, with no parent.
    #[must_use]
    pub fn root() -> Self {
        Self::build(crate::path::ROOT, Weak::new(), Attrs::empty(), &[])
    }

    fn build(name: &str, parent: Weak<DirInner>, mut attrs: Attrs, opts: &[DirOption]) -> Self {
        let mut state = DirState {
            mode: FileMode::dir(DIR_PERM),
            mod_time: DateTime::<Utc>::UNIX_EPOCH,
            children: BTreeMap::new(),
            fetcher: None,
        };

        for opt in opts {
            match opt {
                DirOption::Org(org) => org.clone_into(&mut attrs.org),
                DirOption::Repo(repo) => repo.clone_into(&mut attrs.repo),
                DirOption::Branch(branch) => branch.clone_into(&mut attrs.branch),
                DirOption::NotInPath => attrs.path.clear(),
                DirOption::ModTime(t) => state.mod_time = *t,
                DirOption::Mode(mode) => state.mode = mode.with_dir(),
                DirOption::Fetcher(f) => state.fetcher = Some(f.clone()),
            }
        }

        Dir(Arc::new(DirInner {
            name: name.to_string(),
            parent,
            attrs,
            fetch_lock: Mutex::new(()),
            state: Mutex::new(state),
        }))
    }

    /// Builds, but does not attach, a child inheriting from this directory.
    fn child(&self, name: &str, opts: &[DirOption]) -> Dir {
        let attrs = &self.0.attrs;
        let mut path = attrs.path.clone();
        path.push(name.to_string());
        let inherited = Attrs {
            org: attrs.org.clone(),
            repo: attrs.repo.clone(),
            branch: attrs.branch.clone(),
            path,
        };
        Self::build(name, Arc::downgrade(&self.0), inherited, opts)
    }

    fn state(&self) -> MutexGuard<'_, DirState> {
        lock(&self.0.state)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn org(&self) -> &str {
        &self.0.attrs.org
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.0.attrs.repo
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.0.attrs.branch
    }

    /// Location inside the repository tree (empty above a branch).
    #[must_use]
    pub fn path_segments(&self) -> &[String] {
        &self.0.attrs.path
    }

    #[must_use]
    pub fn parent(&self) -> Option<Dir> {
        self.0.parent.upgrade().map(Dir)
    }

    /// Names from the filesystem root down to this directory. The root
    /// itself contributes nothing.
    #[must_use]
    pub fn full_path(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut cur = self.clone();
        while let Some(parent) = cur.parent() {
            names.push(cur.name().to_string());
            cur = parent;
        }
        names.reverse();
        names
    }

    /// Slash joined [`Dir::full_path`], `.` for the root.
    #[must_use]
    pub fn display_path(&self) -> String {
        let names = self.full_path();
        if names.is_empty() {
            crate::path::ROOT.to_string()
        } else {
            names.join("/")
        }
    }

    #[must_use]
    pub fn mode(&self) -> FileMode {
        self.state().mode
    }

    #[must_use]
    pub fn mod_time(&self) -> DateTime<Utc> {
        self.state().mod_time
    }

    #[must_use]
    pub fn info(&self) -> FileInfo {
        let state = self.state();
        FileInfo {
            name: self.0.name.clone(),
            size: DIR_SIZE,
            mode: state.mode,
            mod_time: state.mod_time,
        }
    }

    #[must_use]
    pub fn to_dir_entry(&self) -> DirEntry {
        DirEntry::new(self.info())
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Dir) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakDir {
        WeakDir(Arc::downgrade(&self.0))
    }

    /// Looks up an immediate child without fetching.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Node> {
        self.state().children.get(name).and_then(Child::node)
    }

    /// Current children in name order, without fetching. Aliases whose
    /// target has been dropped are left out.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Node)> {
        let children: Vec<(String, Child)> = self
            .state()
            .children
            .iter()
            .map(|(name, child)| (name.clone(), child.clone()))
            .collect();
        // Resolved outside the lock: an alias may point back at this directory.
        children
            .into_iter()
            .filter_map(|(name, child)| child.node().map(|node| (name, node)))
            .collect()
    }

    /// Creates a child directory, replacing any child of the same name.
    pub fn new_dir(&self, name: &str, opts: &[DirOption]) -> Dir {
        let dir = self.child(name, opts);
        _ = self
            .state()
            .children
            .insert(name.to_string(), Child::Owned(Node::Dir(dir.clone())));
        dir
    }

    /// Returns the child directory `name`, creating it if absent.
    pub fn mkdir(&self, name: &str, opts: &[DirOption]) -> Result<Dir> {
        self.make_dirs(&[name], opts)
    }

    /// Walks down `parts`, creating each missing directory with `opts`, and
    /// returns the last one. Existing directories are left untouched.
    pub fn make_dirs<S: AsRef<str>>(&self, parts: &[S], opts: &[DirOption]) -> Result<Dir> {
        let mut cur = self.clone();
        for part in parts {
            let part = part.as_ref();
            let next = {
                let mut state = cur.state();
                match state.children.get(part).and_then(Child::node) {
                    Some(Node::Dir(dir)) => dir,
                    Some(Node::File(_)) => {
                        return Err(Error::not_exist(format!(
                            "{}/{part}: not a directory",
                            cur.display_path()
                        )));
                    }
                    None => {
                        let dir = cur.child(part, opts);
                        _ = state
                            .children
                            .insert(part.to_string(), Child::Owned(Node::Dir(dir.clone())));
                        dir
                    }
                }
            };
            cur = next;
        }
        Ok(cur)
    }

    /// Creates a file in this directory, replacing any child of the same name.
    pub fn add_file(&self, name: &str, opts: Vec<FileOption>) -> File {
        let file = File::new(name, self.org(), self.repo(), opts);
        _ = self
            .state()
            .children
            .insert(name.to_string(), Child::Owned(Node::File(file.clone())));
        file
    }

    /// Makes `node` reachable as `name` in this directory without copying
    /// it. The alias does not own the node.
    pub fn alias(&self, name: &str, node: &Node) {
        _ = self
            .state()
            .children
            .insert(name.to_string(), Child::Alias(node.downgrade()));
    }

    #[must_use]
    pub fn has_fetcher(&self) -> bool {
        self.state().fetcher.is_some()
    }

    pub fn set_fetcher(&self, fetcher: Arc<dyn Fetcher>) {
        self.state().fetcher = Some(fetcher);
    }

    /// Detaches the fetcher so that lookups during population see the
    /// directory as already fetched.
    pub fn clear_fetcher(&self) {
        self.state().fetcher = None;
    }

    /// Runs the attached fetcher, if any.
    ///
    /// Concurrent callers wait for a single attempt. After success the
    /// fetcher is dropped and later calls do nothing; after failure it is
    /// kept so the next call tries again.
    pub fn fetch(&self, fs: &FS) -> Result<()> {
        if !self.has_fetcher() {
            return Ok(());
        }

        let _guard = lock(&self.0.fetch_lock);
        let Some(fetcher) = self.state().fetcher.clone() else {
            return Ok(());
        };

        let path = self.display_path();
        debug!("fetching directory {path}", path: path.as_str());

        match fetcher.fetch(fs, self) {
            Ok(()) => {
                self.clear_fetcher();
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                warn!("fetch of {path} failed: {message}", path: path.as_str(), message: message.as_str());
                let mut state = self.state();
                if state.fetcher.is_none() {
                    state.fetcher = Some(fetcher);
                }
                Err(Error::fetch(path, err))
            }
        }
    }

    /// Resolves `parts` below this directory, fetching every directory on
    /// the way. Returns the final directory, or the containing directory
    /// and the file when the last part names a file.
    pub fn find<S: AsRef<str>>(&self, fs: &FS, parts: &[S]) -> Result<(Dir, Option<File>)> {
        let mut cur = self.clone();
        for (i, part) in parts.iter().enumerate() {
            cur.fetch(fs)?;
            let part = part.as_ref();
            match cur.get(part) {
                Some(Node::Dir(dir)) => cur = dir,
                Some(Node::File(file)) if i + 1 == parts.len() => return Ok((cur, Some(file))),
                Some(Node::File(_)) => {
                    return Err(Error::not_exist(format!(
                        "{}: not a directory",
                        joined(&parts[..=i])
                    )));
                }
                None => return Err(Error::not_exist(joined(&parts[..=i]))),
            }
        }
        cur.fetch(fs)?;
        Ok((cur, None))
    }

    /// [`Dir::find`] on a slash separated path; `.` and the empty path
    /// name this directory.
    pub fn find_path(&self, fs: &FS, path: &str) -> Result<(Dir, Option<File>)> {
        let parts = if path == crate::path::ROOT {
            Vec::new()
        } else {
            crate::path::split(path)
        };
        self.find(fs, &parts)
    }

    /// Snapshots the current children into a listing handle.
    #[must_use]
    pub fn open(&self) -> DirHandle {
        let entries = self
            .entries()
            .into_iter()
            .map(|(name, node)| node.to_dir_entry(&name))
            .collect();
        DirHandle::new(self.info(), entries)
    }
}

fn joined<S: AsRef<str>>(parts: &[S]) -> String {
    parts.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("/")
}

impl Attrs {
    fn empty() -> Self {
        Self {
            org: String::new(),
            repo: String::new(),
            branch: String::new(),
            path: Vec::new(),
        }
    }
}

impl std::fmt::Debug for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dir")
            .field("path", &self.display_path())
            .finish_non_exhaustive()
    }
}
