// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Builds the `org/repo/{git,releases}` skeleton from repository metadata.

use std::sync::Arc;

use diagnostics::*;

use super::fetchers::{GitDirFetcher, ReleaseFetcher, TarballFetcher};
use crate::config::{OrgInput, RepoInput};
use crate::dir::{Dir, DirOption};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::fs::FS;
use crate::remote::{Repository, pages};

pub const GIT_DIR: &str = "git";
pub const RELEASES_DIR: &str = "releases";

/// Adds every configured input: whole organizations first, then single
/// repositories.
pub(crate) fn connect(fs: &FS) -> Result<()> {
    let config = fs.config();
    for input in &config.orgs {
        add_org(fs, input)?;
    }
    for input in &config.repos {
        add_repo(fs, input)?;
    }
    Ok(())
}

/// Whether a repository should be exposed under `owner/name`.
fn accept(repo: &Repository, owner: &str, name: &str, allow_archived: bool) -> bool {
    if repo.is_disabled {
        return false;
    }
    if repo.is_archived && !allow_archived {
        return false;
    }
    // A renamed or transferred repository answers under its new name.
    repo.name_with_owner == format!("{owner}/{name}")
}

fn add_org(fs: &FS, input: &OrgInput) -> Result<()> {
    let org = input.org.as_str();
    let mut added = 0usize;

    for repo in pages(|after| fs.metadata().repositories(org, after)) {
        let repo = repo?;
        if !accept(&repo, org, &repo.name, input.allow_archived) {
            debug!("skipping repository {name}", name: repo.name_with_owner.as_str());
            continue;
        }
        let Some(branch) = repo.default_branch.as_deref() else {
            debug!("skipping empty repository {name}", name: repo.name_with_owner.as_str());
            continue;
        };
        _ = new_repo(fs, org, &repo.name, &repo, branch)?;
        added += 1;
    }

    info!("added {added} repositories for {org}", added: added, org: org);
    Ok(())
}

fn add_repo(fs: &FS, input: &RepoInput) -> Result<()> {
    let (org, name) = (input.org.as_str(), input.repo.as_str());
    let repo = fs.metadata().repository(org, name)?;

    if !accept(&repo, org, name, true) {
        warn!("repository {org}/{name} is unavailable as {nwo}", org: org, name: name, nwo: repo.name_with_owner.as_str());
        return Ok(());
    }

    let branches: Vec<String> = if input.branches.is_empty() {
        match &repo.default_branch {
            Some(branch) => vec![branch.clone()],
            None => {
                debug!("skipping empty repository {org}/{name}", org: org, name: name);
                return Ok(());
            }
        }
    } else {
        input.branches.clone()
    };

    for branch in &branches {
        _ = new_repo(fs, org, name, &repo, branch)?;
    }
    info!("added {org}/{name}", org: org, name: name);
    Ok(())
}

/// Creates (or extends) the directories for one branch of a repository and
/// returns the branch directory.
fn new_repo(fs: &FS, org: &str, name: &str, repo: &Repository, branch: &str) -> Result<Dir> {
    let org_dir = fs
        .root()
        .mkdir(org, &[DirOption::org(org), DirOption::NotInPath])?;
    let repo_dir = org_dir.mkdir(name, &[DirOption::repo(name), DirOption::NotInPath])?;

    if repo.release_count > 0 {
        _ = repo_dir.mkdir(
            RELEASES_DIR,
            &[DirOption::NotInPath, DirOption::fetcher(ReleaseFetcher)],
        )?;
    }

    let bulk = repo.disk_usage < fs.config().threshold_kb;
    let fetcher: Arc<dyn Fetcher> = if bulk {
        Arc::new(TarballFetcher)
    } else {
        Arc::new(GitDirFetcher)
    };
    debug!(
        "adding {org}/{name} branch {branch}",
        org: org,
        name: name,
        branch: branch,
        bulk: bulk
    );

    let git_dir = repo_dir.mkdir(GIT_DIR, &[DirOption::NotInPath])?;
    git_dir.mkdir(
        branch,
        &[
            DirOption::branch(branch),
            DirOption::NotInPath,
            DirOption::Fetcher(fetcher),
        ],
    )
}
