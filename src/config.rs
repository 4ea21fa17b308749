use anyhow::Result;
use log::debug;
use reqwest::{
    Client,
    header::{ACCEPT, HeaderMap, HeaderValue},
    redirect,
};

use crate::{
    archive::{ArchiveExtractor, ArchiveExtractorImpl},
    http::HttpClient,
    provider::{DEFAULT_API_URL, GitHubProvider, Provider},
    runtime::Runtime,
};

/// Collaborators shared by one scaffolding run.
pub struct Config<R: Runtime, P: Provider, E: ArchiveExtractor> {
    pub runtime: R,
    pub provider: P,
    pub http_client: HttpClient,
    pub extractor: E,
}

impl<R: Runtime> Config<R, GitHubProvider, ArchiveExtractorImpl> {
    pub fn new(runtime: R, api_url: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        // Redirects are followed by HttpClient so the hop limit and
        // credential scoping are applied consistently.
        let client = Client::builder()
            .user_agent("scaffold-cli")
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .build()?;

        let mut http_client = HttpClient::new(client);
        if let Ok(token) = runtime.env_var("GITHUB_TOKEN")
            && !token.is_empty()
        {
            let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            auth_value.set_sensitive(true);
            http_client = http_client.with_auth(auth_value);
            debug!(
                "Using GITHUB_TOKEN for authentication ({} characters)",
                token.len()
            );
        }

        let api_url = api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let provider = GitHubProvider::from_http_client(http_client.clone(), &api_url);

        Ok(Self {
            runtime,
            provider,
            http_client,
            extractor: ArchiveExtractorImpl::new(),
        })
    }
}
