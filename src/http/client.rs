//! HTTP client with redirect following and status-to-error mapping.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, HeaderValue, LOCATION};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::io::Write;

use super::redirect::{MAX_REDIRECTS, Step, next_step};
use crate::error::ScaffoldError;

/// HTTP client that follows redirects itself so the hop bound and the
/// handling of credentials across hosts stay under our control.
///
/// The wrapped reqwest `Client` must be built with
/// `redirect::Policy::none()`, otherwise reqwest resolves redirects before
/// this client ever sees them.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    auth: Option<HeaderValue>,
    max_redirects: usize,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            auth: None,
            max_redirects: MAX_REDIRECTS,
        }
    }

    /// Attach an `Authorization` value, sent only to the origin of each request.
    pub fn with_auth(mut self, auth: HeaderValue) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Override the redirect hop limit.
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Performs a GET request and deserializes the JSON response.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET JSON from {}...", url);
        let url = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
        self.fetch_json(url).await
    }

    /// Performs a GET request with query parameters and deserializes the JSON response.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!("GET JSON from {} with query {:?}...", url, query);
        let url = Url::parse_with_params(url, query)
            .with_context(|| format!("Invalid URL: {}", url))?;
        self.fetch_json(url).await
    }

    /// Streams the body at `url` into the writer returned by `create_writer`.
    ///
    /// The writer is only created once a 2xx response has arrived, so a failed
    /// request leaves nothing behind. Returns the number of bytes written.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);
        let url = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
        let mut response = self.send(url).await?;

        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read chunk from download stream")?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(url).await?;
        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        let parsed = serde_json::from_slice(&body)
            .map_err(|e| ScaffoldError::Parse(e.to_string()))?;
        Ok(parsed)
    }

    /// Sends a GET and follows redirects until a 2xx arrives or the request fails.
    async fn send(&self, origin: Url) -> Result<Response> {
        let mut current = origin.clone();
        let mut hops = 0;

        loop {
            let mut request = self.client.get(current.clone());
            if let Some(auth) = &self.auth
                && current.origin() == origin.origin()
            {
                request = request.header(AUTHORIZATION, auth.clone());
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to send request to {}", current))?;

            let status = response.status().as_u16();
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            match next_step(status, location.as_deref(), hops, self.max_redirects) {
                Step::Succeeded => return Ok(response),
                Step::Follow(location) => {
                    let next = current
                        .join(&location)
                        .with_context(|| format!("Invalid redirect location: {}", location))?;
                    debug!("{} redirected ({}) to {}", current, status, next);
                    current = next;
                    hops += 1;
                }
                Step::Failed => {
                    if response.status().is_redirection() && hops >= self.max_redirects {
                        warn!(
                            "Giving up on {} after {} redirects",
                            origin, self.max_redirects
                        );
                    }
                    return Err(ScaffoldError::Http {
                        status,
                        url: current.to_string(),
                    }
                    .into());
                }
            }
        }
    }
}
