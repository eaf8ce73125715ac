// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use ghfs::FS;

pub fn stat_command<W: Write>(fs: &FS, path: &str, out: &mut W) -> Result<()> {
    let info = fs.stat(path)?;
    let kind = if info.is_dir() { "directory" } else { "file" };
    writeln!(out, "  Name: {}", info.name)?;
    writeln!(out, "  Type: {kind}")?;
    writeln!(out, "  Size: {}", info.size)?;
    writeln!(out, "  Mode: {:o}", info.mode.bits())?;
    writeln!(out, "Modify: {}", info.mod_time.to_rfc3339())?;
    Ok(())
}
