// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Stand-in collaborators and archive builders for unit tests.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::EntryType;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fs::FS;
use crate::remote::{
    ContentFetcher, ContentType, Download, MetadataProvider, Page, Release, Repository, TreeEntry,
};

/// A repository on `main` with a little disk usage and no releases.
pub fn repository(name_with_owner: &str) -> Repository {
    let name = name_with_owner
        .rsplit('/')
        .next()
        .unwrap_or(name_with_owner)
        .to_string();
    Repository {
        name,
        name_with_owner: name_with_owner.to_string(),
        disk_usage: 1,
        is_archived: false,
        is_disabled: false,
        default_branch: Some("main".to_string()),
        release_count: 0,
    }
}

/// In-memory metadata, keyed by `owner/repo`. Records every call.
pub struct TestMetadata {
    page_size: usize,
    repos: HashMap<String, Repository>,
    orgs: HashMap<String, Vec<Repository>>,
    trees: HashMap<String, Vec<TreeEntry>>,
    releases: HashMap<String, Vec<Release>>,
    tarballs: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl Default for TestMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl TestMetadata {
    pub fn new() -> Self {
        Self {
            page_size: 100,
            repos: HashMap::new(),
            orgs: HashMap::new(),
            trees: HashMap::new(),
            releases: HashMap::new(),
            tarballs: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_repo(self, repo: Repository) -> Self {
        let key = repo.name_with_owner.clone();
        self.with_repo_as(&key, repo)
    }

    /// Answers requests for `key` with `repo`, as for a moved repository.
    pub fn with_repo_as(mut self, key: &str, repo: Repository) -> Self {
        _ = self.repos.insert(key.to_string(), repo);
        self
    }

    pub fn with_org_repo(mut self, owner: &str, repo: Repository) -> Self {
        self.orgs.entry(owner.to_string()).or_default().push(repo);
        self
    }

    pub fn with_tree(mut self, repo: &str, branch: &str, path: &str, entries: Vec<TreeEntry>) -> Self {
        _ = self.trees.insert(format!("{repo}@{branch}:{path}"), entries);
        self
    }

    pub fn with_releases(mut self, repo: &str, releases: Vec<Release>) -> Self {
        _ = self.releases.insert(repo.to_string(), releases);
        self
    }

    pub fn with_tarball(mut self, repo: &str, branch: &str, url: &str) -> Self {
        _ = self.tarballs.insert(format!("{repo}@{branch}"), url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn page<T: Clone>(&self, items: &[T], after: Option<&str>) -> Page<T> {
        let start: usize = after.map_or(0, |c| c.parse().unwrap());
        let end = (start + self.page_size).min(items.len());
        Page {
            items: items[start..end].to_vec(),
            end_cursor: Some(end.to_string()),
            has_next_page: end < items.len(),
        }
    }
}

impl MetadataProvider for TestMetadata {
    fn repository(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.record(format!("repository {owner}/{repo}"));
        self.repos
            .get(&format!("{owner}/{repo}"))
            .cloned()
            .ok_or_else(|| Error::not_exist(format!("{owner}/{repo}")))
    }

    fn repositories(&self, owner: &str, after: Option<&str>) -> Result<Page<Repository>> {
        self.record(format!("repositories {owner} {after:?}"));
        let repos = self
            .orgs
            .get(owner)
            .ok_or_else(|| Error::not_exist(owner))?;
        Ok(self.page(repos, after))
    }

    fn tree(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Result<Vec<TreeEntry>> {
        self.record(format!("tree {owner}/{repo} {branch}:{path}"));
        self.trees
            .get(&format!("{owner}/{repo}@{branch}:{path}"))
            .cloned()
            .ok_or_else(|| Error::not_exist(format!("{owner}/{repo} {branch}:{path}")))
    }

    fn releases(&self, owner: &str, repo: &str, after: Option<&str>) -> Result<Page<Release>> {
        self.record(format!("releases {owner}/{repo} {after:?}"));
        let releases = self
            .releases
            .get(&format!("{owner}/{repo}"))
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(self.page(releases, after))
    }

    fn tarball_url(&self, owner: &str, repo: &str, branch: &str) -> Result<String> {
        self.record(format!("tarball_url {owner}/{repo} {branch}"));
        self.tarballs
            .get(&format!("{owner}/{repo}@{branch}"))
            .cloned()
            .ok_or_else(|| Error::not_exist(format!("{owner}/{repo} branch {branch}")))
    }
}

/// In-memory downloads keyed by URL. Records every request.
#[derive(Default)]
pub struct TestContent {
    bodies: HashMap<String, (String, Vec<u8>)>,
    requests: Mutex<Vec<String>>,
}

impl TestContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(self, url: &str, bytes: &[u8]) -> Self {
        self.with_download(url, "application/octet-stream", bytes.to_vec())
    }

    pub fn with_download(mut self, url: &str, content_type: &str, body: Vec<u8>) -> Self {
        _ = self
            .bodies
            .insert(url.to_string(), (content_type.to_string(), body));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl ContentFetcher for TestContent {
    fn fetch(&self, url: &str) -> Result<Download> {
        self.requests.lock().unwrap().push(url.to_string());
        let (content_type, body) = self
            .bodies
            .get(url)
            .ok_or_else(|| Error::remote(format!("HTTP 404 Not Found error from {url}")))?;
        Ok(Download::new(
            ContentType::parse(Some(content_type)),
            Cursor::new(body.clone()),
        ))
    }
}

/// Filesystem with no inputs and empty collaborators.
pub fn test_fs() -> FS {
    fs_with(TestMetadata::new(), TestContent::new())
}

pub fn test_fs_with_content(content: TestContent) -> (FS, Arc<TestContent>) {
    let content = Arc::new(content);
    let fs = FS::with_remote(Config::default(), Arc::new(TestMetadata::new()), content.clone());
    (fs, content)
}

pub fn fs_with(metadata: TestMetadata, content: TestContent) -> FS {
    fs_with_config(Config::default(), metadata, content)
}

pub fn fs_with_config(config: Config, metadata: TestMetadata, content: TestContent) -> FS {
    FS::with_remote(config, Arc::new(metadata), Arc::new(content))
}

/// One member of a test archive.
pub struct TarEntry {
    path: String,
    kind: EntryType,
    data: Vec<u8>,
    link: Option<String>,
    mtime: u64,
    mode: Option<u32>,
}

impl TarEntry {
    fn new(path: &str, kind: EntryType) -> Self {
        Self {
            path: path.to_string(),
            kind,
            data: Vec::new(),
            link: None,
            mtime: 1_700_000_000,
            mode: None,
        }
    }

    pub fn dir(path: &str) -> Self {
        Self::new(path, EntryType::Directory)
    }

    pub fn file(path: &str, content: &str) -> Self {
        Self {
            data: content.as_bytes().to_vec(),
            ..Self::new(path, EntryType::Regular)
        }
    }

    pub fn symlink(path: &str, target: &str) -> Self {
        Self {
            link: Some(target.to_string()),
            ..Self::new(path, EntryType::Symlink)
        }
    }

    pub fn hardlink(path: &str, target: &str) -> Self {
        Self {
            link: Some(target.to_string()),
            ..Self::new(path, EntryType::Link)
        }
    }

    pub fn fifo(path: &str) -> Self {
        Self::new(path, EntryType::Fifo)
    }

    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Builds an uncompressed tar archive.
pub fn tar_bytes(entries: &[TarEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(entry.kind);
        header.set_size(entry.data.len() as u64);
        let default_mode = if entry.kind == EntryType::Directory { 0o755 } else { 0o644 };
        header.set_mode(entry.mode.unwrap_or(default_mode));
        header.set_mtime(entry.mtime);
        match &entry.link {
            Some(target) => builder
                .append_link(&mut header, &entry.path, target)
                .unwrap(),
            None => builder
                .append_data(&mut header, &entry.path, entry.data.as_slice())
                .unwrap(),
        }
    }
    builder.into_inner().unwrap()
}

pub fn gzip_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
