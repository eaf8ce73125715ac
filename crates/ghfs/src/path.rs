// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::Error;
use crate::error::Result;

/// The name used to open the root of the filesystem.
pub const ROOT: &str = ".";

/// Reports whether `name` is a path that `open` accepts.
///
/// Valid paths are `.` or a sequence of non-empty `/`-separated elements,
/// none of which is `.` or `..`, with no leading or trailing slash.
#[must_use]
pub fn valid_path(name: &str) -> bool {
    if name == ROOT {
        return true;
    }
    !name.is_empty()
        && name
            .split('/')
            .all(|elem| !elem.is_empty() && elem != "." && elem != "..")
}

/// Splits a slash separated path into its non-empty elements.
#[must_use]
pub fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|elem| !elem.is_empty()).collect()
}

/// Splits off the final element, returning the (possibly empty) directory
/// elements and the base name.
#[must_use]
pub fn split_base(path: &str) -> (Vec<&str>, Option<&str>) {
    let mut parts = split(path);
    let base = parts.pop();
    (parts, base)
}

/// Lexically resolves `rel` against the directory `base`.
///
/// `.` and empty elements are dropped and `..` removes the preceding
/// element. Climbing above the tree root is an error.
pub fn normalize<S: AsRef<str>>(base: &[S], rel: &str) -> Result<Vec<String>> {
    let mut out: Vec<String> = base.iter().map(|s| s.as_ref().to_string()).collect();

    for elem in rel.split('/') {
        match elem {
            "" | "." => {}
            ".." => {
                if out.pop().is_none() {
                    return Err(Error::not_exist(format!("{rel}: path escapes the root")));
                }
            }
            name => out.push(name.to_string()),
        }
    }

    Ok(out)
}
