//! Release selection.
//!
//! Picks the newest release tag for the source template, and the newest
//! published release carrying a given binary asset for the bundle.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;

use crate::error::ScaffoldError;
use crate::provider::{Provider, Release, RepoId};

/// A release paired with the download URL of its matching asset.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    pub release: Release,
    pub asset_url: String,
}

/// Resolves releases through a [`Provider`].
pub struct ReleaseResolver<P: Provider> {
    provider: P,
}

impl<P: Provider> ReleaseResolver<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Tag of the release the platform reports as latest.
    #[tracing::instrument(skip(self))]
    pub async fn get_latest_tag(&self, repo: &RepoId) -> Result<String> {
        let release = self.provider.get_latest_release(repo).await?;

        match release.tag {
            Some(tag) if !tag.is_empty() => {
                debug!("Latest tag of {} is {}", repo, tag);
                Ok(tag)
            }
            _ => Err(ScaffoldError::NotFound(format!("latest release of {} has no tag", repo)).into()),
        }
    }

    /// Newest non-draft release of `repo` that carries `asset_name`.
    #[tracing::instrument(skip(self))]
    pub async fn latest_release_with_asset(
        &self,
        repo: &RepoId,
        asset_name: &str,
    ) -> Result<SelectionResult> {
        let releases = self.provider.get_releases(repo).await?;
        debug!("Considering {} releases of {}", releases.len(), repo);

        select_release_with_asset(&releases, asset_name).ok_or_else(|| {
            ScaffoldError::NotFound(format!(
                "no published release of {} has an asset named '{}'",
                repo, asset_name
            ))
            .into()
        })
    }
}

/// Pick the newest non-draft release with an asset named `asset_name`
/// (case-insensitive) and a download URL.
///
/// Releases may arrive in any order. A later candidate only replaces the
/// current best when its effective timestamp is strictly greater, so the
/// first of several equally recent candidates wins.
pub fn select_release_with_asset(releases: &[Release], asset_name: &str) -> Option<SelectionResult> {
    let wanted = asset_name.to_lowercase();
    let mut best: Option<(DateTime<Utc>, &Release, &str)> = None;

    for release in releases {
        if release.draft {
            continue;
        }

        let Some(url) = matching_asset_url(release, &wanted) else {
            continue;
        };

        let timestamp = effective_timestamp(release);
        match best {
            Some((best_timestamp, _, _)) if timestamp <= best_timestamp => {}
            _ => best = Some((timestamp, release, url)),
        }
    }

    best.map(|(_, release, url)| SelectionResult {
        release: release.clone(),
        asset_url: url.to_string(),
    })
}

fn matching_asset_url<'a>(release: &'a Release, wanted_lowercase: &str) -> Option<&'a str> {
    release.assets.iter().find_map(|asset| {
        let name = asset.name.as_deref()?;
        let url = asset.download_url.as_deref()?;
        (name.to_lowercase() == wanted_lowercase).then_some(url)
    })
}

/// `published_at`, else `created_at`, else the epoch.
///
/// The first non-empty field decides; if it does not parse, the release
/// sorts as the epoch rather than failing.
pub fn effective_timestamp(release: &Release) -> DateTime<Utc> {
    [&release.published_at, &release.created_at]
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .and_then(|value| parse_timestamp(value))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}
