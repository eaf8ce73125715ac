// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! GitHub implementations of the remote collaborators and the fetchers
//! that populate `git/<branch>` and `releases` directories.

mod client;
mod fetchers;
mod models;
pub(crate) mod scaffold;

pub use client::{GraphQLClient, HttpFetcher, PAGE_SIZE};
pub use fetchers::{DESCRIPTION_FILE, GitDirFetcher, ReleaseFetcher, TarballFetcher};
pub use scaffold::{GIT_DIR, RELEASES_DIR};
