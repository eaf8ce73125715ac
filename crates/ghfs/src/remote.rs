// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The collaborators the tree engine consumes: a metadata provider that
//! answers "what exists" questions and a content fetcher that downloads
//! bytes. The GitHub implementations live in [`crate::github`].

use std::io::Read;

use crate::error::{Error, Result};

/// Repository level facts used to build the org/repo/branch scaffolding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Repository {
    pub name: String,
    pub name_with_owner: String,
    /// Reported disk usage in KiB
    pub disk_usage: u64,
    pub is_archived: bool,
    pub is_disabled: bool,
    /// None for an empty repository
    pub default_branch: Option<String>,
    pub release_count: u64,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// One immediate entry of a remote git tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    /// Advisory size, absent on servers that do not report it
    pub size: Option<u64>,
    pub mode: u32,
}

/// A published (non-draft, non-prerelease) release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub tag: String,
    pub description: String,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub size: u64,
    pub download_url: String,
}

/// Kind of a remote tree entry, decoded from its git mode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMode {
    File,
    Executable,
    Directory,
    Submodule,
    Symlink,
}

impl TreeMode {
    pub const FILE: u32 = 0o100644;
    pub const EXECUTABLE: u32 = 0o100755;
    pub const DIRECTORY: u32 = 0o040000;
    pub const SUBMODULE: u32 = 0o160000;
    pub const SYMLINK: u32 = 0o120000;
}

impl TryFrom<u32> for TreeMode {
    type Error = Error;

    fn try_from(mode: u32) -> Result<Self> {
        match mode {
            Self::FILE => Ok(TreeMode::File),
            Self::EXECUTABLE => Ok(TreeMode::Executable),
            Self::DIRECTORY => Ok(TreeMode::Directory),
            Self::SUBMODULE => Ok(TreeMode::Submodule),
            Self::SYMLINK => Ok(TreeMode::Symlink),
            other => Err(Error::unsupported(format!("unknown file mode {other:#o}"))),
        }
    }
}

/// Answers questions about what exists remotely.
pub trait MetadataProvider: Send + Sync {
    /// Facts about a single repository.
    fn repository(&self, owner: &str, repo: &str) -> Result<Repository>;

    /// One page of the repositories owned by `owner`, in name order.
    fn repositories(&self, owner: &str, after: Option<&str>) -> Result<Page<Repository>>;

    /// The immediate entries of `path` (empty for the top) on `branch`.
    fn tree(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Result<Vec<TreeEntry>>;

    /// One page of published releases, newest first.
    fn releases(&self, owner: &str, repo: &str, after: Option<&str>) -> Result<Page<Release>>;

    /// Where to download the whole tree of `branch` as a tar archive.
    fn tarball_url(&self, owner: &str, repo: &str, branch: &str) -> Result<String>;
}

/// How a downloaded body is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    /// Uncompressed tar stream (or an opaque byte stream)
    Tar,
    /// Gzip compressed stream
    Gzip,
    /// Anything else, including a missing header (empty string)
    Other(String),
}

impl ContentType {
    /// Classifies a `Content-Type` header value; parameters are ignored.
    #[must_use]
    pub fn parse(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return ContentType::Other(String::new());
        };
        let essence = header
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/x-tar" | "application/tar" | "application/octet-stream" => {
                ContentType::Tar
            }
            "application/gzip" | "application/x-gzip" | "application/x-gtar" => ContentType::Gzip,
            _ => ContentType::Other(essence),
        }
    }
}

/// A downloaded body together with its declared content type.
pub struct Download {
    pub content_type: ContentType,
    pub body: Box<dyn Read + Send>,
}

impl Download {
    pub fn new<R: Read + Send + 'static>(content_type: ContentType, body: R) -> Self {
        Self {
            content_type,
            body: Box::new(body),
        }
    }

    /// Reads the whole body into memory.
    pub fn read_all(mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        _ = self.body.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Downloads content by URL.
pub trait ContentFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Download>;
}

/// Iterates over every item of a paginated listing, requesting the next
/// page only when the current one is used up.
pub struct Pages<T, F> {
    fetch: F,
    cursor: Option<String>,
    buffered: std::vec::IntoIter<T>,
    done: bool,
}

/// Walks all pages produced by `fetch`, which is handed the cursor of the
/// previous page (None for the first).
pub fn pages<T, F>(fetch: F) -> Pages<T, F>
where
    F: FnMut(Option<&str>) -> Result<Page<T>>,
{
    Pages {
        fetch,
        cursor: None,
        buffered: Vec::new().into_iter(),
        done: false,
    }
}

impl<T, F> Iterator for Pages<T, F>
where
    F: FnMut(Option<&str>) -> Result<Page<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        loop {
            if let Some(item) = self.buffered.next() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            match (self.fetch)(self.cursor.as_deref()) {
                Ok(page) => {
                    // A page claiming more without a cursor would repeat forever.
                    self.done = !page.has_next_page || page.end_cursor.is_none();
                    self.cursor = page.end_cursor;
                    self.buffered = page.items.into_iter();
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
