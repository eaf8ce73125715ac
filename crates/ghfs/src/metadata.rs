// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};

/// Nominal size reported for every directory.
pub const DIR_SIZE: u64 = 4096;

/// POSIX style mode word: a type bit plus permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileMode(u32);

impl FileMode {
    /// Directory type bit
    pub const DIR: u32 = 0o040000;

    /// Permission bits
    pub const PERM: u32 = 0o777;

    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// A directory with the given permissions.
    #[must_use]
    pub const fn dir(perm: u32) -> Self {
        Self(Self::DIR | (perm & Self::PERM))
    }

    /// A regular file with the given permissions.
    #[must_use]
    pub const fn file(perm: u32) -> Self {
        Self(perm & Self::PERM)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn perm(self) -> u32 {
        self.0 & Self::PERM
    }

    #[must_use]
    pub const fn is_dir(self) -> bool {
        self.0 & Self::DIR != 0
    }

    #[must_use]
    pub const fn is_executable(self) -> bool {
        self.0 & 0o111 != 0
    }

    /// Same mode with the directory bit set.
    #[must_use]
    pub const fn with_dir(self) -> Self {
        Self(self.0 | Self::DIR)
    }
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_dir() { 'd' } else { '-' };
        let mut out = String::with_capacity(10);
        out.push(kind);
        for shift in [6u32, 3, 0] {
            let triple = (self.0 >> shift) & 0o7;
            out.push(if triple & 0o4 != 0 { 'r' } else { '-' });
            out.push(if triple & 0o2 != 0 { 'w' } else { '-' });
            out.push(if triple & 0o1 != 0 { 'x' } else { '-' });
        }
        f.write_str(&out)
    }
}

/// Describes a file or directory, returned by stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub mode: FileMode,
    pub mod_time: DateTime<Utc>,
}

impl FileInfo {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }
}

/// One item of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    info: FileInfo,
}

impl DirEntry {
    #[must_use]
    pub fn new(info: FileInfo) -> Self {
        Self { info }
    }

    /// Base name of the entry, never a full path.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.info.is_dir()
    }

    #[must_use]
    pub fn mode(&self) -> FileMode {
        self.info.mode
    }

    /// Info as of the time the listing was taken.
    #[must_use]
    pub fn info(&self) -> &FileInfo {
        &self.info
    }
}
