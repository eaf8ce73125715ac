// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! A read-only, lazily populated filesystem over GitHub organizations,
//! repositories, branches and releases.
//!
//! Paths have the shape `org/repo/git/<branch>/<tree...>` and
//! `org/repo/releases/<tag>/<asset>`. Directories are populated on first
//! access, either one level at a time from tree listings or all at once
//! from a branch tarball, and file content is downloaded on open.

pub mod config;
mod dir;
mod dir_handle;
pub mod error;
mod fetch;
mod file;
mod file_handle;
mod fs;
pub mod github;
mod metadata;
mod node;
pub mod path;
pub mod remote;
pub mod tarball;

#[cfg(test)]
mod testing;

pub use config::{Config, OrgInput, RepoInput, load_config, read_config, validate_config};
pub use dir::{DIR_PERM, Dir, DirOption};
pub use dir_handle::{DirBatch, DirHandle};
pub use error::{Error, ErrorKind, Result};
pub use fetch::Fetcher;
pub use file::{FILE_PERM, File, FileOption};
pub use file_handle::FileHandle;
pub use fs::{FS, Handle};
pub use metadata::{DIR_SIZE, DirEntry, FileInfo, FileMode};
pub use node::Node;
