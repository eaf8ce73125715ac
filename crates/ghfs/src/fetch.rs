// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::dir::Dir;
use crate::error::Result;
use crate::fs::FS;

/// Populates a directory on first access.
///
/// A fetcher is attached to a directory when it is created and runs at most
/// once successfully: [`Dir::fetch`] drops it after it returns `Ok`, and
/// keeps it for another attempt after it returns `Err`. Implementations add
/// children to `dir` with [`Dir::new_dir`], [`Dir::mkdir`],
/// [`Dir::add_file`] and [`Dir::alias`].
pub trait Fetcher: Send + Sync {
    fn fetch(&self, fs: &FS, dir: &Dir) -> Result<()>;
}

impl<F> Fetcher for F
where
    F: Fn(&FS, &Dir) -> Result<()> + Send + Sync,
{
    fn fetch(&self, fs: &FS, dir: &Dir) -> Result<()> {
        self(fs, dir)
    }
}
