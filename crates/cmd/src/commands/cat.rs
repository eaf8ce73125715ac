// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};

use anyhow::{Result, anyhow};
use ghfs::FS;

/// Copies the content of each file to `out`, in order.
pub fn cat_command<W: Write>(fs: &FS, paths: &[String], out: &mut W) -> Result<()> {
    for path in paths {
        let Some(mut file) = fs.open(path)?.into_file() else {
            return Err(anyhow!("{path}: is a directory"));
        };
        _ = io::copy(&mut file, out)?;
        file.close()?;
    }
    out.flush()?;
    Ok(())
}
