// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use diagnostics::*;
use ghfs::FS;

use crate::common::{format_long, write_entries};

/// Lists a directory, or describes a single file.
pub fn list_command<W: Write>(fs: &FS, path: &str, long: bool, out: &mut W) -> Result<()> {
    debug!("listing {path}", path: path);
    let handle = fs.open(path)?;
    if handle.is_dir() {
        handle.close()?;
        let entries = fs.read_dir(path)?;
        write_entries(out, &entries, long)?;
    } else {
        let info = handle.stat()?;
        handle.close()?;
        if long {
            writeln!(out, "{}", format_long(path, &info))?;
        } else {
            writeln!(out, "{path}")?;
        }
    }
    Ok(())
}
