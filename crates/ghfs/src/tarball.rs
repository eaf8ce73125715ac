// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Materializes a whole subtree from a single tar stream.
//!
//! Archives produced by the remote wrap everything in one top level
//! directory (`<owner>-<repo>-<sha>/`), which is stripped from every entry.
//! Hard and symbolic links become aliases of the node they point at, which
//! must already have been imported.

use std::io::Read;

use chrono::{DateTime, Utc};
use diagnostics::*;
use flate2::read::GzDecoder;
use tar::EntryType;

use crate::dir::{Dir, DirOption};
use crate::error::{Error, Result};
use crate::file::{FILE_PERM, FileOption};
use crate::fs::FS;
use crate::metadata::FileMode;
use crate::node::Node;
use crate::path;
use crate::remote::{ContentType, Download};

/// Imports a download, decoding it according to its content type.
pub fn import_download(fs: &FS, dir: &Dir, download: Download) -> Result<()> {
    match download.content_type {
        ContentType::Tar => import(fs, dir, download.body),
        ContentType::Gzip => import(fs, dir, GzDecoder::new(download.body)),
        ContentType::Other(other) => Err(Error::unsupported(format!(
            "can't import archive with content type {other:?}"
        ))),
    }
}

/// Populates `dir` from an uncompressed tar stream.
///
/// The directory's fetcher is detached first, so resolving link targets
/// inside the subtree being imported does not fetch it again.
pub fn import<R: Read>(fs: &FS, dir: &Dir, reader: R) -> Result<()> {
    dir.clear_fetcher();
    let insert_point = dir.full_path();

    let mut archive = tar::Archive::new(reader);
    let mut counts = Counts::default();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        let mod_time = entry
            .header()
            .mtime()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(i64::try_from(secs).ok()?, 0))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

        match kind {
            EntryType::Regular | EntryType::Continuous => {
                let (parts, base) = path::split_base(&name);
                let Some(base) = base else {
                    continue;
                };
                let perm = match entry.header().mode() {
                    Ok(mode) if mode & 0o111 != 0 => 0o755,
                    _ => FILE_PERM,
                };
                let mut content = Vec::new();
                _ = entry.read_to_end(&mut content)?;

                let parent = dir.make_dirs(strip_top(&parts), &[DirOption::ModTime(mod_time)])?;
                _ = parent.add_file(
                    base,
                    vec![
                        FileOption::ModTime(mod_time),
                        FileOption::Mode(FileMode::file(perm)),
                        FileOption::Content(content),
                    ],
                );
                counts.files += 1;
            }
            EntryType::Directory => {
                let parts = path::split(&name);
                _ = dir.make_dirs(strip_top(&parts), &[DirOption::ModTime(mod_time)])?;
                counts.dirs += 1;
            }
            EntryType::Link | EntryType::Symlink => {
                let target = entry
                    .link_name_bytes()
                    .map(|t| String::from_utf8_lossy(&t).into_owned())
                    .ok_or_else(|| Error::unsupported(format!("{name}: link without target")))?;
                link(fs, &insert_point, &name, &target)?;
                counts.links += 1;
            }
            other => {
                let kind = format!("{other:?}");
                debug!("skipping tar entry {name} of type {kind}", name: name.as_str(), kind: kind.as_str());
                counts.skipped += 1;
            }
        }
    }

    let path = dir.display_path();
    info!(
        "imported {files} files, {dirs} directories and {links} links into {path}",
        files: counts.files,
        dirs: counts.dirs,
        links: counts.links,
        skipped: counts.skipped,
        path: path.as_str()
    );
    Ok(())
}

#[derive(Default)]
struct Counts {
    files: usize,
    dirs: usize,
    links: usize,
    skipped: usize,
}

/// Drops the archive's top level directory.
fn strip_top<'a>(parts: &'a [&'a str]) -> &'a [&'a str] {
    parts.get(1..).unwrap_or_default()
}

/// Aliases the node `target` names (relative to the link's directory) at
/// the link's location. Targets outside `insert_point` do not exist.
fn link(fs: &FS, insert_point: &[String], name: &str, target: &str) -> Result<()> {
    let (parts, base) = path::split_base(name);
    let Some(base) = base else {
        return Err(Error::unsupported(format!("{name}: link without a name")));
    };

    let mut link_dir = insert_point.to_vec();
    link_dir.extend(strip_top(&parts).iter().map(|s| (*s).to_string()));
    let target_path = path::normalize(&link_dir, target)?;
    if !target_path.starts_with(insert_point) {
        return Err(Error::not_exist(format!(
            "{name} -> {target}: link leaves the imported tree"
        )));
    }

    let root = fs.root();
    let (target_dir, target_file) = root
        .find(fs, &target_path)
        .map_err(|err| Error::op("link", format!("{name} -> {target}"), err))?;
    let (parent, file) = root.find(fs, &link_dir)?;
    if file.is_some() {
        return Err(Error::not_exist(format!("{}: not a directory", link_dir.join("/"))));
    }

    let node = match target_file {
        Some(file) => Node::File(file),
        None => Node::Dir(target_dir),
    };
    debug!("linking {name} to {target}", name: name, target: target);
    parent.alias(base, &node);
    Ok(())
}
