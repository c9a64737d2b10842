//! HTTP/HTTPS range source using `Range` and `If-Unmodified-Since`

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use range_reader::{FetchError, RangeSource};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, IF_UNMODIFIED_SINCE, LAST_MODIFIED, RANGE};
use reqwest::StatusCode;
use std::ops::Range;
use tokio::runtime::Handle;

/// Byte ranges of one HTTP resource.
///
/// The server must report `Content-Length` and `Last-Modified` on `HEAD`.
/// Servers that ignore `Range` are tolerated by slicing the full body.
pub struct HttpRangeSource {
    client: reqwest::Client,
    url: String,
    size: u64,
    last_modified: DateTime<Utc>,
    runtime: Handle,
}

impl HttpRangeSource {
    /// Open an HTTP/HTTPS URL for range reads
    ///
    /// # Example
    /// ```ignore
    /// let source = HttpRangeSource::open("https://example.com/data.csv").await?;
    /// let lines = tokio::task::spawn_blocking(move || {
    ///     RangeReader::new(source)?.lines().collect::<Result<Vec<_>, _>>()
    /// })
    /// .await??;
    /// ```
    pub async fn open(url: impl Into<String>) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), url).await
    }

    pub async fn with_client(client: reqwest::Client, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let response = client
            .head(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP HEAD failed with status {status} for URL: {url}");
        }

        let headers = response.headers();
        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .with_context(|| format!("No Content-Length reported for URL: {url}"))?;
        let last_modified = parse_last_modified(headers)
            .with_context(|| format!("No Last-Modified reported for URL: {url}"))?;

        tracing::debug!(
            "Opened {} ({} bytes, last modified {})",
            url,
            size,
            last_modified
        );

        Ok(Self {
            client,
            url,
            size,
            last_modified,
            runtime: Handle::try_current()
                .context("HTTP range sources must be opened inside a tokio runtime")?,
        })
    }

    async fn get_range(
        &self,
        range: Range<u64>,
        if_unmodified_since: DateTime<Utc>,
    ) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header(RANGE, format!("bytes={}-{}", range.start, range.end - 1))
            .header(IF_UNMODIFIED_SINCE, http_date(if_unmodified_since))
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {}", self.url))?;

        let status = response.status();
        if status == StatusCode::PRECONDITION_FAILED {
            return Err(FetchError::PreconditionFailed);
        }
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "HTTP request failed with status {status} for URL: {}",
                self.url
            )
            .into());
        }
        if parse_last_modified(response.headers()).is_some_and(|lm| lm != if_unmodified_since) {
            return Err(FetchError::PreconditionFailed);
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from: {}", self.url))?;

        if status == StatusCode::PARTIAL_CONTENT {
            return Ok(bytes.to_vec());
        }

        // 200: the server sent the whole resource
        let len = bytes.len() as u64;
        let start = range.start.min(len) as usize;
        let end = range.end.min(len) as usize;
        Ok(bytes[start..end].to_vec())
    }
}

impl RangeSource for HttpRangeSource {
    fn fetch(
        &self,
        range: Range<u64>,
        if_unmodified_since: DateTime<Utc>,
    ) -> Result<Vec<u8>, FetchError> {
        if range.start >= range.end {
            return Ok(Vec::new());
        }
        self.runtime
            .block_on(self.get_range(range, if_unmodified_since))
    }

    fn size(&self) -> Result<u64, FetchError> {
        Ok(self.size)
    }

    fn last_modified(&self) -> Result<DateTime<Utc>, FetchError> {
        Ok(self.last_modified)
    }

    fn key(&self) -> &str {
        &self.url
    }
}

fn parse_last_modified(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get(LAST_MODIFIED)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
fn http_date(dt: DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_http_date_round_trips_through_header() {
        let dt = DateTime::parse_from_rfc3339("1994-11-06T08:49:37Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(http_date(dt), "Sun, 06 Nov 1994 08:49:37 GMT");

        let mut headers = HeaderMap::new();
        headers.insert(LAST_MODIFIED, HeaderValue::from_str(&http_date(dt)).unwrap());
        assert_eq!(parse_last_modified(&headers), Some(dt));
    }

    #[test]
    fn test_missing_last_modified() {
        assert_eq!(parse_last_modified(&HeaderMap::new()), None);
    }
}
