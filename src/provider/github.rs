//! GitHub provider implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;

use crate::http::HttpClient;

use super::{Provider, Release, ReleaseAsset, RepoId};

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Releases requested per page.
const PER_PAGE: usize = 100;

/// Upper bound on pages fetched (1000 releases).
const MAX_PAGES: usize = 10;

/// GitHub API response types (internal).
///
/// Listings are loosely typed: a field holding an unexpected JSON type is
/// read as absent instead of failing the whole page.
mod api {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(serde_json::from_value(value).ok())
    }

    /// Like [`lenient`], but drops individual malformed items of an array.
    fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Value::deserialize(deserializer)? {
            Value::Array(items) => Ok(Some(
                items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            )),
            _ => Ok(None),
        }
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct Release {
        #[serde(default, deserialize_with = "lenient")]
        pub tag_name: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        pub name: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        pub created_at: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        pub published_at: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        pub draft: Option<bool>,
        #[serde(default, deserialize_with = "lenient_list")]
        pub assets: Option<Vec<Asset>>,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct Asset {
        #[serde(default, deserialize_with = "lenient")]
        pub name: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        pub browser_download_url: Option<String>,
    }
}

/// GitHub provider implementation.
pub struct GitHubProvider {
    http_client: HttpClient,
    api_url: String,
}

impl GitHubProvider {
    /// Create from an existing HttpClient.
    pub fn from_http_client(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn repo_url(&self, repo: &RepoId) -> String {
        format!("{}/repos/{}/{}", self.api_url, repo.owner, repo.repo)
    }

    async fn fetch_releases(&self, repo: &RepoId) -> Result<Vec<api::Release>> {
        let mut releases = Vec::new();
        let url = format!("{}/releases", self.repo_url(repo));
        let per_page = PER_PAGE.to_string();

        for page in 1..=MAX_PAGES {
            debug!("Fetching releases page {} from {}...", page, url);

            let records: Vec<Value> = self
                .http_client
                .get_json_with_query(&url, &[("per_page", &per_page), ("page", &page.to_string())])
                .await
                .with_context(|| format!("Failed to list releases of {}", repo))?;

            let len = records.len();
            releases.extend(records.into_iter().filter_map(|record| {
                serde_json::from_value::<api::Release>(record)
                    .map_err(|e| debug!("Skipping malformed release record of {}: {}", repo, e))
                    .ok()
            }));

            if len < PER_PAGE {
                return Ok(releases);
            }
        }

        warn!(
            "Stopped listing releases of {} after {} pages; older releases were not considered",
            repo, MAX_PAGES
        );
        Ok(releases)
    }
}

#[async_trait]
impl Provider for GitHubProvider {
    fn api_url(&self) -> &str {
        &self.api_url
    }

    #[tracing::instrument(skip(self))]
    async fn get_latest_release(&self, repo: &RepoId) -> Result<Release> {
        let url = format!("{}/releases/latest", self.repo_url(repo));
        debug!("Fetching latest release from {}...", url);

        let release: api::Release = self
            .http_client
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to fetch the latest release of {}", repo))?;
        Ok(release.into())
    }

    #[tracing::instrument(skip(self))]
    async fn get_releases(&self, repo: &RepoId) -> Result<Vec<Release>> {
        let releases = self.fetch_releases(repo).await?;
        Ok(releases.into_iter().map(|r| r.into()).collect())
    }

    fn tarball_url(&self, repo: &RepoId, tag: &str) -> String {
        format!("{}/tarball/{}", self.repo_url(repo), tag)
    }
}

impl From<api::Release> for Release {
    fn from(r: api::Release) -> Self {
        Release {
            tag: r.tag_name,
            name: r.name,
            created_at: r.created_at,
            published_at: r.published_at,
            draft: r.draft.unwrap_or(false),
            assets: r
                .assets
                .unwrap_or_default()
                .into_iter()
                .map(|a| a.into())
                .collect(),
        }
    }
}

impl From<api::Asset> for ReleaseAsset {
    fn from(a: api::Asset) -> Self {
        ReleaseAsset {
            name: a.name,
            download_url: a.browser_download_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScaffoldError;
    use reqwest::Client;

    fn provider(api_url: &str) -> GitHubProvider {
        GitHubProvider::from_http_client(HttpClient::new(Client::new()), api_url)
    }

    fn repo() -> RepoId {
        RepoId {
            owner: "test-owner".to_string(),
            repo: "test-repo".to_string(),
        }
    }

    #[test]
    fn test_api_url_trailing_slash_is_trimmed() {
        let provider = provider("https://custom.api/");
        assert_eq!(provider.api_url(), "https://custom.api");
    }

    #[test]
    fn test_tarball_url() {
        let provider = provider(DEFAULT_API_URL);
        assert_eq!(
            provider.tarball_url(&repo(), "v1.2.3"),
            "https://api.github.com/repos/test-owner/test-repo/tarball/v1.2.3"
        );
    }

    #[test]
    fn test_release_conversion_defaults() {
        let release: Release = api::Release {
            tag_name: Some("v1.0.0".into()),
            assets: Some(vec![api::Asset {
                name: Some("bin.zip".into()),
                browser_download_url: None,
            }]),
            ..Default::default()
        }
        .into();

        assert_eq!(release.tag.as_deref(), Some("v1.0.0"));
        assert!(!release.draft);
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].download_url, None);

        let empty: Release = api::Release::default().into();
        assert!(empty.assets.is_empty());
    }

    #[tokio::test]
    async fn test_get_latest_release() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/test-owner/test-repo/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "tag_name": "v2.0.0",
                    "name": "Two",
                    "created_at": "2024-05-01T00:00:00Z",
                    "published_at": "2024-05-02T00:00:00Z",
                    "draft": false,
                    "assets": [{"name": "bin.zip", "browser_download_url": "https://dl/bin.zip"}]
                }"#,
            )
            .create_async()
            .await;

        let release = provider(&server.url())
            .get_latest_release(&repo())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(release.tag.as_deref(), Some("v2.0.0"));
        assert_eq!(release.published_at.as_deref(), Some("2024-05-02T00:00:00Z"));
        assert_eq!(
            release.assets[0].download_url.as_deref(),
            Some("https://dl/bin.zip")
        );
    }

    #[tokio::test]
    async fn test_get_latest_release_tolerates_missing_fields() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/repos/test-owner/test-repo/releases/latest")
            .with_status(200)
            .with_body(r#"{"name": null, "draft": null}"#)
            .create_async()
            .await;

        let release = provider(&server.url())
            .get_latest_release(&repo())
            .await
            .unwrap();

        assert_eq!(release, Release::default());
    }

    #[tokio::test]
    async fn test_get_latest_release_not_found() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/test-owner/test-repo/releases/latest")
            .with_status(404)
            .create_async()
            .await;

        let err = provider(&server.url())
            .get_latest_release(&repo())
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(
            err.downcast_ref::<ScaffoldError>().and_then(ScaffoldError::status),
            Some(404)
        );
        assert!(err.to_string().contains("test-owner/test-repo"));
    }

    #[tokio::test]
    async fn test_get_releases_single_page() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock(
                "GET",
                "/repos/test-owner/test-repo/releases?per_page=100&page=1",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"tag_name": "v1.0.0", "draft": false, "assets": []},
                    {"tag_name": "v1.1.0", "draft": true, "assets": []}
                ]"#,
            )
            .create_async()
            .await;

        let releases = provider(&server.url())
            .get_releases(&repo())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].tag.as_deref(), Some("v1.0.0"));
        assert!(releases[1].draft);
    }

    #[tokio::test]
    async fn test_get_releases_multiple_pages() {
        let mut server = mockito::Server::new_async().await;

        let page1_body = format!(
            "[{}]",
            (0..100)
                .map(|i| format!(r#"{{"tag_name": "v1.0.{}"}}"#, i))
                .collect::<Vec<_>>()
                .join(",")
        );

        let mock_p1 = server
            .mock(
                "GET",
                "/repos/test-owner/test-repo/releases?per_page=100&page=1",
            )
            .with_status(200)
            .with_body(&page1_body)
            .create_async()
            .await;

        let mock_p2 = server
            .mock(
                "GET",
                "/repos/test-owner/test-repo/releases?per_page=100&page=2",
            )
            .with_status(200)
            .with_body(r#"[{"tag_name": "v0.0.1"}]"#)
            .create_async()
            .await;

        let releases = provider(&server.url())
            .get_releases(&repo())
            .await
            .unwrap();

        mock_p1.assert_async().await;
        mock_p2.assert_async().await;
        assert_eq!(releases.len(), 101);
        assert_eq!(releases[100].tag.as_deref(), Some("v0.0.1"));
    }

    #[tokio::test]
    async fn test_get_releases_not_found() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock(
                "GET",
                "/repos/test-owner/test-repo/releases?per_page=100&page=1",
            )
            .with_status(404)
            .create_async()
            .await;

        let result = provider(&server.url()).get_releases(&repo()).await;

        mock.assert_async().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_releases_tolerates_malformed_fields() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock(
                "GET",
                "/repos/test-owner/test-repo/releases?per_page=100&page=1",
            )
            .with_status(200)
            .with_body(
                r#"[
                    {"tag_name": "v1", "published_at": 1700000000, "created_at": {"at": 1},
                     "draft": "no", "assets": [{"name": "bin.zip", "browser_download_url": "A"}]},
                    {"tag_name": "v2", "published_at": "2024-06-01T00:00:00Z", "draft": false,
                     "assets": [42, {"name": "bin.zip", "browser_download_url": "B"}]},
                    {"tag_name": 3, "assets": "none"},
                    null
                ]"#,
            )
            .create_async()
            .await;

        let releases = provider(&server.url())
            .get_releases(&repo())
            .await
            .unwrap();

        assert_eq!(releases.len(), 3);
        assert_eq!(releases[0].published_at, None);
        assert_eq!(releases[0].created_at, None);
        assert!(!releases[0].draft);
        assert_eq!(releases[1].assets.len(), 1);
        assert_eq!(releases[2], Release::default());

        let selected =
            crate::resolver::select_release_with_asset(&releases, "bin.zip").unwrap();
        assert_eq!(selected.release.tag.as_deref(), Some("v2"));
        assert_eq!(selected.asset_url, "B");
    }

    #[test_log::test(tokio::test)]
    async fn test_get_releases_stops_at_page_limit() {
        let mut server = mockito::Server::new_async().await;

        let full_page = format!(
            "[{}]",
            (0..PER_PAGE)
                .map(|i| format!(r#"{{"tag_name": "v1.0.{}"}}"#, i))
                .collect::<Vec<_>>()
                .join(",")
        );

        let mock = server
            .mock("GET", "/repos/test-owner/test-repo/releases")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(&full_page)
            .expect(MAX_PAGES)
            .create_async()
            .await;

        let releases = provider(&server.url())
            .get_releases(&repo())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(releases.len(), PER_PAGE * MAX_PAGES);
    }
}
