use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use vista_types::{FetchContext, Source, SourceData, SourceError, SourceResult};

use crate::fragment::section;

/// Fetches an HTML fragment over HTTP.
///
/// Connection failures and 5xx answers are retried with a linear backoff
/// until the retry budget or the cycle deadline runs out.
#[derive(Clone, Debug)]
pub struct HttpSource {
    name: String,
    url: String,
    client: Client,
    max_retries: u32,
    retry_backoff: Duration,
    summary_header: Option<String>,
}

enum Attempt {
    Retry(SourceError),
    Fail(SourceError),
}

impl HttpSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, client: Client) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client,
            max_retries: 0,
            retry_backoff: Duration::from_millis(500),
            summary_header: None,
        }
    }

    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    /// Read summary lines from a comma-separated response header.
    pub fn with_summary_header(mut self, header: impl Into<String>) -> Self {
        self.summary_header = Some(header.into());
        self
    }

    async fn fetch_with_retries(&self) -> SourceResult<SourceData> {
        let mut attempt = 0;
        loop {
            match self.fetch_once().await {
                Ok(data) => return Ok(data),
                Err(Attempt::Retry(err)) if attempt < self.max_retries => {
                    attempt += 1;
                    debug!(source = %self.name, attempt, error = %err, "retrying");
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(Attempt::Retry(err)) | Err(Attempt::Fail(err)) => return Err(err),
            }
        }
    }

    async fn fetch_once(&self) -> Result<SourceData, Attempt> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            let err = SourceError::Upstream(format!("request to {} failed: {e}", self.url));
            if e.is_connect() || e.is_timeout() {
                Attempt::Retry(err)
            } else {
                Attempt::Fail(err)
            }
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Attempt::Retry(SourceError::Upstream(format!(
                "{} returned {status}",
                self.url
            ))));
        }
        if !status.is_success() {
            return Err(Attempt::Fail(SourceError::Upstream(format!(
                "{} returned {status}",
                self.url
            ))));
        }

        let summary = self
            .summary_header
            .as_deref()
            .and_then(|name| response.headers().get(name))
            .and_then(|value| value.to_str().ok())
            .map(split_header)
            .unwrap_or_default();

        let body = response.bytes().await.map_err(|e| {
            Attempt::Fail(SourceError::Upstream(format!("reading body failed: {e}")))
        })?;
        let html = std::str::from_utf8(&body).map_err(|_| {
            Attempt::Fail(SourceError::Malformed("response body is not UTF-8".into()))
        })?;

        Ok(SourceData::new(section(&self.name, html)).with_summary(summary))
    }
}

fn split_header(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[async_trait]
impl Source for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, ctx: &FetchContext) -> SourceResult<SourceData> {
        ctx.run(self.fetch_with_retries()).await
    }
}
