// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! GraphQL response shapes and their conversion into [`crate::remote`] types.

use serde::Deserialize;

use crate::remote::{Asset, Page, Release, Repository, TreeEntry};

/// Envelope of every GraphQL response.
#[derive(Debug, Deserialize)]
pub struct Response<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQLError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<T>,
}

impl<T> Connection<T> {
    pub fn into_page<U>(self, f: impl FnMut(T) -> Option<U>) -> Page<U> {
        Page {
            items: self.nodes.into_iter().filter_map(f).collect(),
            end_cursor: self.page_info.end_cursor,
            has_next_page: self.page_info.has_next_page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Count {
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct RefName {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name: String,
    pub name_with_owner: String,
    #[serde(default)]
    pub disk_usage: Option<u64>,
    pub is_archived: bool,
    pub is_disabled: bool,
    pub default_branch_ref: Option<RefName>,
    pub releases: Count,
}

impl From<RepositoryNode> for Repository {
    fn from(node: RepositoryNode) -> Self {
        Repository {
            name: node.name,
            name_with_owner: node.name_with_owner,
            disk_usage: node.disk_usage.unwrap_or_default(),
            is_archived: node.is_archived,
            is_disabled: node.is_disabled,
            default_branch: node.default_branch_ref.map(|r| r.name),
            release_count: node.releases.total_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RepositoryData {
    pub repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRepositories {
    pub repositories: Connection<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoriesData {
    pub repository_owner: Option<OwnerRepositories>,
}

#[derive(Debug, Deserialize)]
pub struct TreeEntryNode {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    pub mode: u32,
}

impl From<TreeEntryNode> for TreeEntry {
    fn from(node: TreeEntryNode) -> Self {
        TreeEntry {
            name: node.name,
            size: node.size,
            mode: node.mode,
        }
    }
}

/// `object(expression:)`; entries are absent when the object is not a tree.
#[derive(Debug, Deserialize)]
pub struct TreeObject {
    #[serde(default)]
    pub entries: Option<Vec<TreeEntryNode>>,
}

#[derive(Debug, Deserialize)]
pub struct TreeRepository {
    pub object: Option<TreeObject>,
}

#[derive(Debug, Deserialize)]
pub struct TreeData {
    pub repository: Option<TreeRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetNode {
    pub name: String,
    pub size: u64,
    pub download_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseNode {
    pub tag_name: String,
    pub is_draft: bool,
    pub is_prerelease: bool,
    pub description: Option<String>,
    pub release_assets: Connection<AssetNode>,
}

impl ReleaseNode {
    /// Drafts and prereleases are not published and are left out.
    pub fn into_release(self) -> Option<Release> {
        if self.is_draft || self.is_prerelease {
            return None;
        }
        Some(Release {
            tag: self.tag_name,
            description: self.description.unwrap_or_default(),
            assets: self
                .release_assets
                .nodes
                .into_iter()
                .map(|a| Asset {
                    name: a.name,
                    size: a.size,
                    download_url: a.download_url,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReleasesRepository {
    pub releases: Connection<ReleaseNode>,
}

#[derive(Debug, Deserialize)]
pub struct ReleasesData {
    pub repository: Option<ReleasesRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitTarget {
    #[serde(default)]
    pub tarball_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GitRef {
    pub target: Option<CommitTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefRepository {
    #[serde(rename = "ref")]
    pub git_ref: Option<GitRef>,
}

#[derive(Debug, Deserialize)]
pub struct RefData {
    pub repository: Option<RefRepository>,
}
