// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::Args;
use diagnostics::*;
use ghfs::{Config, DirEntry, FS, FileInfo, read_config, validate_config};

/// Environment variable holding the GitHub API token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Options shared by every command: where the filesystem comes from
#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Include every repository of an organization (repeatable)
    #[arg(long, global = true)]
    pub org: Vec<String>,

    /// Include one repository, as ORG/REPO or ORG/REPO@BRANCH (repeatable)
    #[arg(long, global = true)]
    pub repo: Vec<String>,

    /// Also include archived repositories of --org organizations
    #[arg(long, global = true)]
    pub allow_archived: bool,

    /// Repositories smaller than this many KiB are fetched as one tarball
    #[arg(long, global = true)]
    pub threshold_kb: Option<u64>,
}

/// Splits `org/repo[@branch]`.
pub fn parse_repo_arg(arg: &str) -> Result<(String, String, Option<String>)> {
    let (name, branch) = match arg.split_once('@') {
        Some((name, branch)) if !branch.is_empty() => (name, Some(branch.to_string())),
        Some(_) => return Err(anyhow!("Empty branch in repository {arg:?}")),
        None => (arg, None),
    };
    match name.split_once('/') {
        Some((org, repo)) if !org.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((org.to_string(), repo.to_string(), branch))
        }
        _ => Err(anyhow!("Repository must be ORG/REPO[@BRANCH], got {arg:?}")),
    }
}

/// Combines the config file, command line inputs and `GITHUB_TOKEN`.
pub fn build_config(args: &SourceArgs, token: Option<String>) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => Config::default(),
    };

    for org in &args.org {
        config = config.with_org(org.as_str(), args.allow_archived);
    }
    for arg in &args.repo {
        let (org, repo, branch) = parse_repo_arg(arg)?;
        config = match branch {
            Some(branch) => config.with_branches(org, repo, [branch]),
            None => config.with_repo(org, repo),
        };
    }
    if let Some(threshold_kb) = args.threshold_kb {
        config = config.with_threshold_kb(threshold_kb);
    }
    if config.token.is_none() {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            config = config.with_token(token);
        }
    }

    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Builds the filesystem for a command.
pub fn open_fs(args: &SourceArgs) -> Result<FS> {
    let config = build_config(args, std::env::var(TOKEN_ENV).ok())?;
    debug!(
        "using {orgs} orgs and {repos} repos",
        orgs: config.orgs.len(),
        repos: config.repos.len()
    );
    FS::new(config).context("Failed to create filesystem")
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

/// One `ls -l` style line, without the trailing newline.
pub fn format_long(name: &str, info: &FileInfo) -> String {
    let suffix = if info.is_dir() { "/" } else { "" };
    format!(
        "{} {:>10} {} {name}{suffix}",
        info.mode,
        info.size,
        format_time(info.mod_time)
    )
}

pub fn write_entries<W: Write>(out: &mut W, entries: &[DirEntry], long: bool) -> Result<()> {
    for entry in entries {
        if long {
            writeln!(out, "{}", format_long(entry.name(), entry.info()))?;
        } else if entry.is_dir() {
            writeln!(out, "{}/", entry.name())?;
        } else {
            writeln!(out, "{}", entry.name())?;
        }
    }
    Ok(())
}
