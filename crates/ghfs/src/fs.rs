// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};

use diagnostics::*;

use crate::config::Config;
use crate::dir::Dir;
use crate::dir_handle::DirHandle;
use crate::error::{Error, Result};
use crate::file_handle::FileHandle;
use crate::github::{GraphQLClient, HttpFetcher, scaffold};
use crate::metadata::{DirEntry, FileInfo};
use crate::node::Node;
use crate::path::{ROOT, valid_path};
use crate::remote::{ContentFetcher, MetadataProvider};

/// An open file or directory.
#[derive(Debug)]
pub enum Handle {
    Dir(DirHandle),
    File(FileHandle),
}

impl Handle {
    pub fn stat(&self) -> Result<FileInfo> {
        match self {
            Handle::Dir(d) => d.stat(),
            Handle::File(f) => f.stat(),
        }
    }

    pub fn close(&self) -> Result<()> {
        match self {
            Handle::Dir(d) => d.close(),
            Handle::File(f) => f.close(),
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self, Handle::Dir(_))
    }

    #[must_use]
    pub fn into_dir(self) -> Option<DirHandle> {
        match self {
            Handle::Dir(d) => Some(d),
            Handle::File(_) => None,
        }
    }

    #[must_use]
    pub fn into_file(self) -> Option<FileHandle> {
        match self {
            Handle::File(f) => Some(f),
            Handle::Dir(_) => None,
        }
    }
}

struct State {
    config: Config,
    metadata: Arc<dyn MetadataProvider>,
    content: Arc<dyn ContentFetcher>,
    root: Dir,
    /// Held for the whole scaffolding pass so concurrent first opens wait
    connected: Mutex<bool>,
}

/// Read-only filesystem view over the configured organizations and
/// repositories. Cloning is cheap and clones share the tree.
#[derive(Clone)]
pub struct FS {
    state: Arc<State>,
}

impl FS {
    /// Uses the GitHub GraphQL API and plain HTTP downloads.
    pub fn new(config: Config) -> Result<Self> {
        let metadata = Arc::new(GraphQLClient::new(&config)?);
        let content = Arc::new(HttpFetcher::new(&config)?);
        Ok(Self::with_remote(config, metadata, content))
    }

    /// Uses the given collaborators instead of the GitHub ones.
    #[must_use]
    pub fn with_remote(
        config: Config,
        metadata: Arc<dyn MetadataProvider>,
        content: Arc<dyn ContentFetcher>,
    ) -> Self {
        Self {
            state: Arc::new(State {
                config,
                metadata,
                content,
                root: Dir::root(),
                connected: Mutex::new(false),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.state.config
    }

    #[must_use]
    pub fn metadata(&self) -> &dyn MetadataProvider {
        self.state.metadata.as_ref()
    }

    #[must_use]
    pub fn content(&self) -> &dyn ContentFetcher {
        self.state.content.as_ref()
    }

    /// The root directory. It is empty until the first [`FS::open`].
    #[must_use]
    pub fn root(&self) -> Dir {
        self.state.root.clone()
    }

    /// Builds the org and repository directories, once. A failed attempt is
    /// retried by the next call.
    pub fn connect(&self) -> Result<()> {
        let mut connected = self
            .state
            .connected
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *connected {
            return Ok(());
        }

        info!(
            "connecting {orgs} orgs and {repos} repos",
            orgs: self.state.config.orgs.len(),
            repos: self.state.config.repos.len()
        );
        scaffold::connect(self)?;
        *connected = true;
        Ok(())
    }

    /// Opens `name`, a `/`-separated path from the root, or `.` for the
    /// root itself. Directories on the way are fetched as needed.
    pub fn open(&self, name: &str) -> Result<Handle> {
        if !valid_path(name) {
            return Err(Error::op("open", name, Error::invalid_path(name)));
        }
        self.connect().map_err(|err| Error::op("open", name, err))?;

        let (dir, file) = self
            .state
            .root
            .find_path(self, name)
            .map_err(|err| Error::op("open", name, err))?;

        match file {
            Some(file) => {
                let handle = file.open(self).map_err(|err| Error::op("open", name, err))?;
                Ok(Handle::File(handle))
            }
            None => Ok(Handle::Dir(dir.open())),
        }
    }

    /// Reads a whole file.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let Some(mut handle) = self.open(name)?.into_file() else {
            return Err(Error::op("read", name, Error::not_exist(format!("{name}: is a directory"))));
        };
        let mut buf = Vec::new();
        _ = handle.read_to_end(&mut buf)?;
        handle.close()?;
        Ok(buf)
    }

    /// Lists a directory, sorted by name.
    pub fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        let Some(handle) = self.open(name)?.into_dir() else {
            return Err(Error::op("readdir", name, Error::not_exist(format!("{name}: not a directory"))));
        };
        let mut entries = handle.read_dir(0)?.entries;
        handle.close()?;
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }

    pub fn stat(&self, name: &str) -> Result<FileInfo> {
        let handle = self.open(name)?;
        let info = handle.stat()?;
        handle.close()?;
        Ok(info)
    }

    /// Visits `name` and everything below it depth first, in name order,
    /// parents before children. Paths handed to `visit` are relative to the
    /// root. A directory reached again through an alias while it is still
    /// being walked is listed but not descended into.
    pub fn walk<F>(&self, name: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(&str, &DirEntry) -> Result<()>,
    {
        if !valid_path(name) {
            return Err(Error::op("walk", name, Error::invalid_path(name)));
        }
        self.connect().map_err(|err| Error::op("walk", name, err))?;

        let (dir, file) = self
            .state
            .root
            .find_path(self, name)
            .map_err(|err| Error::op("walk", name, err))?;
        if let Some(file) = file {
            return visit(name, &file.to_dir_entry());
        }

        visit(name, &dir.to_dir_entry())?;
        let mut active = vec![dir.clone()];
        self.walk_dir(&dir, name, &mut active, &mut visit)
    }

    fn walk_dir<F>(&self, dir: &Dir, prefix: &str, active: &mut Vec<Dir>, visit: &mut F) -> Result<()>
    where
        F: FnMut(&str, &DirEntry) -> Result<()>,
    {
        dir.fetch(self)?;
        for (child_name, node) in dir.entries() {
            let path = if prefix == ROOT {
                child_name.clone()
            } else {
                format!("{prefix}/{child_name}")
            };
            visit(&path, &node.to_dir_entry(&child_name))?;

            if let Node::Dir(child) = node {
                if active.iter().any(|a| a.ptr_eq(&child)) {
                    debug!("not descending into {path} again", path: path.as_str());
                    continue;
                }
                active.push(child.clone());
                self.walk_dir(&child, &path, active, visit)?;
                _ = active.pop();
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FS {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FS")
            .field("config", &self.state.config)
            .finish_non_exhaustive()
    }
}
