// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use diagnostics::*;
use ghfs::{Error, FS};

use crate::common::format_long;

/// Prints every path at or below `path`, parents first.
pub fn walk_command<W: Write>(fs: &FS, path: &str, long: bool, out: &mut W) -> Result<()> {
    let mut count = 0usize;
    fs.walk(path, |name, entry| {
        count += 1;
        let line = if long {
            format_long(name, entry.info())
        } else {
            name.to_string()
        };
        writeln!(out, "{line}").map_err(Error::from)
    })?;
    info!("walked {count} entries under {path}", count: count, path: path);
    Ok(())
}
