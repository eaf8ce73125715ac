// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use diagnostics::*;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::models::{
    RefData, ReleaseNode, ReleasesData, RepositoriesData, RepositoryData, Response, TreeData,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::remote::{
    ContentFetcher, ContentType, Download, MetadataProvider, Page, Release, Repository, TreeEntry,
};

/// Items requested per page
pub const PAGE_SIZE: u32 = 100;

const REPOSITORY_FIELDS: &str = "
    name
    nameWithOwner
    diskUsage
    isArchived
    isDisabled
    defaultBranchRef { name }
    releases { totalCount }
";

fn repository_query() -> String {
    format!(
        "query($owner: String!, $repo: String!) {{
  repository(owner: $owner, name: $repo) {{ {REPOSITORY_FIELDS} }}
}}"
    )
}

fn repositories_query() -> String {
    format!(
        "query($owner: String!, $count: Int!, $after: String) {{
  repositoryOwner(login: $owner) {{
    repositories(first: $count, after: $after, orderBy: {{field: NAME, direction: ASC}}) {{
      pageInfo {{ hasNextPage endCursor }}
      nodes {{ {REPOSITORY_FIELDS} }}
    }}
  }}
}}"
    )
}

fn tree_query(legacy: bool) -> String {
    let fields = if legacy { "name mode" } else { "name size mode" };
    format!(
        "query($owner: String!, $repo: String!, $expression: String!) {{
  repository(owner: $owner, name: $repo) {{
    object(expression: $expression) {{
      ... on Tree {{ entries {{ {fields} }} }}
    }}
  }}
}}"
    )
}

const RELEASES_QUERY: &str = "query($owner: String!, $repo: String!, $count: Int!, $after: String) {
  repository(owner: $owner, name: $repo) {
    releases(first: $count, after: $after, orderBy: {field: CREATED_AT, direction: DESC}) {
      pageInfo { hasNextPage endCursor }
      nodes {
        tagName
        isDraft
        isPrerelease
        description
        releaseAssets(first: 100) {
          pageInfo { hasNextPage endCursor }
          nodes { name size downloadUrl }
        }
      }
    }
  }
}";

const TARBALL_QUERY: &str = "query($owner: String!, $repo: String!, $qualifiedName: String!) {
  repository(owner: $owner, name: $repo) {
    ref(qualifiedName: $qualifiedName) {
      target { ... on Commit { tarballUrl } }
    }
  }
}";

fn http_client(config: &Config) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(concat!("ghfs/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| Error::remote_with("failed to create HTTP client", err))
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Blocking GitHub GraphQL API client
pub struct GraphQLClient {
    http: Client,
    url: String,
    token: Option<String>,
    legacy_tree_query: bool,
}

impl GraphQLClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: http_client(config)?,
            url: config.graphql_url.clone(),
            token: config.token.clone(),
            legacy_tree_query: config.legacy_tree_query,
        })
    }

    /// Posts one query and decodes its `data`, failing on any reported error.
    fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let body = serde_json::to_vec(&json!({ "query": query, "variables": variables }))?;
        let request = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        let response = authorize(request, self.token.as_deref()).send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::remote(format!(
                "HTTP {status} error from {}: {text}",
                self.url
            )));
        }

        let text = response.text()?;
        let decoded: Response<T> = serde_json::from_str(&text)?;

        if !decoded.errors.is_empty() {
            let messages: Vec<&str> = decoded.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(Error::remote(format!(
                "GraphQL errors: {}",
                messages.join("; ")
            )));
        }

        decoded
            .data
            .ok_or_else(|| Error::remote("GraphQL response without data"))
    }
}

impl MetadataProvider for GraphQLClient {
    fn repository(&self, owner: &str, repo: &str) -> Result<Repository> {
        debug!("querying repository {owner}/{repo}", owner: owner, repo: repo);
        let data: RepositoryData =
            self.query(&repository_query(), json!({ "owner": owner, "repo": repo }))?;
        data.repository
            .map(Into::into)
            .ok_or_else(|| Error::not_exist(format!("{owner}/{repo}")))
    }

    fn repositories(&self, owner: &str, after: Option<&str>) -> Result<Page<Repository>> {
        debug!("listing repositories of {owner}", owner: owner);
        let data: RepositoriesData = self.query(
            &repositories_query(),
            json!({ "owner": owner, "count": PAGE_SIZE, "after": after }),
        )?;
        let owner_repos = data
            .repository_owner
            .ok_or_else(|| Error::not_exist(owner))?;
        Ok(owner_repos.repositories.into_page(|node| Some(node.into())))
    }

    fn tree(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Result<Vec<TreeEntry>> {
        let expression = format!("{branch}:{path}");
        debug!("listing tree {owner}/{repo} {expression}", owner: owner, repo: repo, expression: expression.as_str());
        let data: TreeData = self.query(
            &tree_query(self.legacy_tree_query),
            json!({ "owner": owner, "repo": repo, "expression": expression }),
        )?;
        let object = data
            .repository
            .and_then(|r| r.object)
            .ok_or_else(|| Error::not_exist(format!("{owner}/{repo}/{expression}")))?;
        Ok(object
            .entries
            .unwrap_or_default()
            .into_iter()
            .map(Into::into)
            .collect())
    }

    fn releases(&self, owner: &str, repo: &str, after: Option<&str>) -> Result<Page<Release>> {
        debug!("listing releases of {owner}/{repo}", owner: owner, repo: repo);
        let data: ReleasesData = self.query(
            RELEASES_QUERY,
            json!({ "owner": owner, "repo": repo, "count": PAGE_SIZE, "after": after }),
        )?;
        let repository = data
            .repository
            .ok_or_else(|| Error::not_exist(format!("{owner}/{repo}")))?;
        Ok(repository.releases.into_page(ReleaseNode::into_release))
    }

    fn tarball_url(&self, owner: &str, repo: &str, branch: &str) -> Result<String> {
        let qualified = format!("refs/heads/{branch}");
        let data: RefData = self.query(
            TARBALL_QUERY,
            json!({ "owner": owner, "repo": repo, "qualifiedName": qualified }),
        )?;
        data.repository
            .and_then(|r| r.git_ref)
            .and_then(|r| r.target)
            .and_then(|t| t.tarball_url)
            .ok_or_else(|| Error::not_exist(format!("{owner}/{repo} branch {branch}")))
    }
}

/// Downloads file content and archives over plain HTTP(S)
pub struct HttpFetcher {
    http: Client,
    token: Option<String>,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: http_client(config)?,
            token: config.token.clone(),
        })
    }
}

impl ContentFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Download> {
        info!("downloading {url}", url: url);
        let response = authorize(self.http.get(url), self.token.as_deref()).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::remote(format!("HTTP {status} error from {url}")));
        }

        let content_type = ContentType::parse(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );
        Ok(Download::new(content_type, response))
    }
}
