// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use diagnostics::*;
use url::Url;

use crate::dir::{DIR_PERM, Dir, DirOption};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::file::{FILE_PERM, FileOption};
use crate::fs::FS;
use crate::metadata::FileMode;
use crate::remote::{TreeMode, pages};
use crate::tarball;

/// Name of the release notes file in each release directory
pub const DESCRIPTION_FILE: &str = "description.md";

/// Lists one level of a branch's tree. Subdirectories get their own
/// `GitDirFetcher`; file content is downloaded on open.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitDirFetcher;

impl Fetcher for GitDirFetcher {
    fn fetch(&self, fs: &FS, dir: &Dir) -> Result<()> {
        let path = dir.path_segments().join("/");
        let entries = fs
            .metadata()
            .tree(dir.org(), dir.repo(), dir.branch(), &path)?;

        for entry in entries {
            let perm = match TreeMode::try_from(entry.mode)? {
                TreeMode::File => FILE_PERM,
                TreeMode::Executable => 0o755,
                TreeMode::Directory => {
                    _ = dir.new_dir(&entry.name, &[DirOption::Fetcher(Arc::new(GitDirFetcher))]);
                    continue;
                }
                TreeMode::Submodule | TreeMode::Symlink => {
                    debug!("skipping {name} with mode {mode}", name: entry.name.as_str(), mode: entry.mode);
                    continue;
                }
            };

            let url = raw_url(fs, dir, &entry.name)?;
            let mut opts = vec![FileOption::Url(url), FileOption::Mode(FileMode::file(perm))];
            if let Some(size) = entry.size {
                opts.push(FileOption::Size(size));
            }
            _ = dir.add_file(&entry.name, opts);
        }
        Ok(())
    }
}

/// `<raw>/<org>/<repo>/<branch>/<path>/<name>`, each segment percent-encoded.
/// Slashes in a branch name stay path separators.
fn raw_url(fs: &FS, dir: &Dir, name: &str) -> Result<String> {
    let base = fs.config().raw_base();
    let mut url = Url::parse(base)
        .map_err(|err| Error::remote_with(format!("invalid raw_url {base:?}"), err))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| Error::remote(format!("raw_url {base:?} cannot take a path")))?;
        _ = segments
            .pop_if_empty()
            .push(dir.org())
            .push(dir.repo())
            .extend(dir.branch().split('/'))
            .extend(dir.path_segments())
            .push(name);
    }
    Ok(url.into())
}

/// Populates a whole branch from one downloaded archive.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarballFetcher;

impl Fetcher for TarballFetcher {
    fn fetch(&self, fs: &FS, dir: &Dir) -> Result<()> {
        let url = fs
            .metadata()
            .tarball_url(dir.org(), dir.repo(), dir.branch())?;
        let download = fs.content().fetch(&url)?;
        tarball::import_download(fs, dir, download)
    }
}

/// Adds one directory per published release, holding the release notes
/// and the release assets.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseFetcher;

impl Fetcher for ReleaseFetcher {
    fn fetch(&self, fs: &FS, dir: &Dir) -> Result<()> {
        let (org, repo) = (dir.org(), dir.repo());
        let mut count = 0usize;

        for release in pages(|after| fs.metadata().releases(org, repo, after)) {
            let release = release?;
            let rel = dir.new_dir(&release.tag, &[DirOption::Mode(FileMode::dir(DIR_PERM))]);
            _ = rel.add_file(
                DESCRIPTION_FILE,
                vec![FileOption::Content(release.description.into_bytes())],
            );
            for asset in release.assets {
                _ = rel.add_file(
                    &asset.name,
                    vec![FileOption::Url(asset.download_url), FileOption::Size(asset.size)],
                );
            }
            count += 1;
        }

        info!("found {count} releases for {org}/{repo}", count: count, org: org, repo: repo);
        Ok(())
    }
}
