// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";
pub const DEFAULT_RAW_URL: &str = "https://raw.githubusercontent.com";

/// Repositories smaller than this (KiB) are imported in one tarball.
pub const DEFAULT_THRESHOLD_KB: u64 = 10 * 1024;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// What to expose and where to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graphql_url: String,
    pub raw_url: String,
    pub threshold_kb: u64,
    pub timeout_seconds: u64,
    /// Bearer token; also read from `GITHUB_TOKEN` by the command line tool
    pub token: Option<String>,
    /// Leave `size` out of tree queries, for servers that reject it
    pub legacy_tree_query: bool,
    pub orgs: Vec<OrgInput>,
    pub repos: Vec<RepoInput>,
}

/// Every repository of an organization (or user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgInput {
    pub org: String,
    #[serde(default)]
    pub allow_archived: bool,
}

/// A single repository. An empty branch list means the default branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInput {
    pub org: String,
    pub repo: String,
    #[serde(default)]
    pub branches: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            raw_url: DEFAULT_RAW_URL.to_string(),
            threshold_kb: DEFAULT_THRESHOLD_KB,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            token: None,
            legacy_tree_query: false,
            orgs: Vec::new(),
            repos: Vec::new(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_org<S: Into<String>>(mut self, org: S, allow_archived: bool) -> Self {
        self.orgs.push(OrgInput {
            org: org.into(),
            allow_archived,
        });
        self
    }

    /// Adds a repository on its default branch.
    #[must_use]
    pub fn with_repo<O: Into<String>, R: Into<String>>(self, org: O, repo: R) -> Self {
        self.with_branches(org, repo, Vec::<String>::new())
    }

    /// Adds a repository on each of `branches`.
    #[must_use]
    pub fn with_branches<O, R, I, B>(mut self, org: O, repo: R, branches: I) -> Self
    where
        O: Into<String>,
        R: Into<String>,
        I: IntoIterator<Item = B>,
        B: Into<String>,
    {
        self.repos.push(RepoInput {
            org: org.into(),
            repo: repo.into(),
            branches: branches.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn with_graphql_url<S: Into<String>>(mut self, url: S) -> Self {
        self.graphql_url = url.into();
        self
    }

    #[must_use]
    pub fn with_raw_url<S: Into<String>>(mut self, url: S) -> Self {
        self.raw_url = url.into();
        self
    }

    #[must_use]
    pub fn with_threshold_kb(mut self, threshold_kb: u64) -> Self {
        self.threshold_kb = threshold_kb;
        self
    }

    #[must_use]
    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    #[must_use]
    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_legacy_tree_query(mut self, legacy: bool) -> Self {
        self.legacy_tree_query = legacy;
        self
    }

    /// Raw URL base without a trailing slash.
    #[must_use]
    pub fn raw_base(&self) -> &str {
        self.raw_url.trim_end_matches('/')
    }
}

/// Load and validate configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = read_config(path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse a YAML configuration file without validating it, for callers
/// that add inputs before validation.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

    serde_yaml_ng::from_str(&content).with_context(|| "Failed to parse YAML configuration")
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    _ = url::Url::parse(&config.graphql_url)
        .with_context(|| format!("Invalid graphql_url: {}", config.graphql_url))?;
    _ = url::Url::parse(&config.raw_url)
        .with_context(|| format!("Invalid raw_url: {}", config.raw_url))?;

    if config.orgs.is_empty() && config.repos.is_empty() {
        anyhow::bail!("At least one org or repo must be configured");
    }

    for input in &config.orgs {
        if input.org.is_empty() {
            anyhow::bail!("Org name cannot be empty");
        }
    }

    for input in &config.repos {
        if input.org.is_empty() || input.repo.is_empty() {
            anyhow::bail!("Repo entries need both org and repo, got {:?}/{:?}", input.org, input.repo);
        }
        if input.branches.iter().any(String::is_empty) {
            anyhow::bail!("Empty branch name for {}/{}", input.org, input.repo);
        }
    }

    if config.timeout_seconds == 0 {
        anyhow::bail!("timeout_seconds must be greater than 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.graphql_url, "https://api.github.com/graphql");
        assert_eq!(config.raw_url, "https://raw.githubusercontent.com");
        assert_eq!(config.threshold_kb, 10240);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .with_org("acme", true)
            .with_repo("acme", "widgets")
            .with_branches("acme", "gadgets", ["main", "dev"])
            .with_raw_url("http://localhost:9/raw/")
            .with_threshold_kb(0)
            .with_token("t0k3n");

        assert_eq!(config.orgs[0].org, "acme");
        assert!(config.orgs[0].allow_archived);
        assert!(config.repos[0].branches.is_empty());
        assert_eq!(config.repos[1].branches, ["main", "dev"]);
        assert_eq!(config.raw_base(), "http://localhost:9/raw");
        assert_eq!(config.threshold_kb, 0);
        assert_eq!(config.token.as_deref(), Some("t0k3n"));
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_load_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
threshold_kb: 0
orgs:
  - org: acme
repos:
  - org: other
    repo: tools
    branches: [main, release]
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.threshold_kb, 0);
        assert_eq!(config.graphql_url, DEFAULT_GRAPHQL_URL);
        assert!(!config.orgs[0].allow_archived);
        assert_eq!(config.repos[0].branches, ["main", "release"]);
    }

    #[test]
    fn test_validate_rejects() {
        assert!(validate_config(&Config::default()).is_err());

        let bad_url = Config::default()
            .with_org("acme", false)
            .with_graphql_url("not a url");
        assert!(validate_config(&bad_url).is_err());

        let empty_branch = Config::default().with_branches("a", "b", [""]);
        assert!(validate_config(&empty_branch).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config("/nonexistent/ghfs.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
