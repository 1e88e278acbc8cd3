use std::time::{Duration, Instant};

use anyhow::Context;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use url::Url;

use crate::error::TransportError;

/// A response from the target service, with the time it took to receive it in full.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
    pub elapsed: Duration,
}

/// Performs single HTTP calls against the target service.
///
/// No retries and no caching: a failed call is handed back to the caller unchanged. Cloning is
/// cheap and clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpAdapter {
    client: Client,
    base_url: Url,
}

impl HttpAdapter {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid target URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Target URL cannot be used as a base: {base_url}");
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `path` is appended to the base URL, keeping any path prefix the base URL has.
    pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| TransportError::InvalidUrl(format!("{joined}: {e}")))
    }

    pub async fn perform<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<HttpResponse, TransportError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url_for(path)?;
        log::trace!("{method} {url}");

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(query) = query {
            request = request.query(query);
        }

        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            body,
            elapsed: started.elapsed(),
        })
    }
}
