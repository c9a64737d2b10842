//! S3 range source using conditional ranged `GetObject` requests

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use chrono::{DateTime, Utc};
use range_reader::{FetchError, RangeSource};
use std::ops::Range;
use tokio::runtime::Handle;

/// Shared S3 client for efficient operations
///
/// Creating an S3 client is relatively expensive, so this struct allows
/// reusing the client across multiple objects.
#[derive(Clone)]
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from AWS config
    pub async fn new() -> Result<Self> {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let client = aws_sdk_s3::Client::new(&sdk_config);
        Ok(Self { client })
    }

    /// Open an S3 object for range reads.
    ///
    /// Issues one `HeadObject` to learn the object's length and
    /// last-modified time. S3 objects are immutable, so both stay valid for
    /// the object version the reader started on; an overwrite is caught by
    /// the `If-Unmodified-Since` condition on the next fetch.
    pub async fn open_range_source(&self, bucket: &str, key: &str) -> Result<S3RangeSource> {
        let head = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to stat S3 object: s3://{bucket}/{key}"))?;

        let size = head
            .content_length()
            .and_then(|len| u64::try_from(len).ok())
            .with_context(|| format!("S3 object has no content length: s3://{bucket}/{key}"))?;
        let last_modified = head
            .last_modified()
            .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
            .with_context(|| format!("S3 object has no last-modified time: s3://{bucket}/{key}"))?;

        tracing::debug!(
            "Opened S3 object s3://{}/{} ({} bytes, last modified {})",
            bucket,
            key,
            size,
            last_modified
        );

        Ok(S3RangeSource {
            client: self.client.clone(),
            bucket: bucket.to_string(),
            object_key: key.to_string(),
            display: format!("s3://{bucket}/{key}"),
            size,
            last_modified,
            runtime: Handle::try_current()
                .context("S3 range sources must be opened inside a tokio runtime")?,
        })
    }
}

/// Byte ranges of one S3 object.
///
/// Calls block on the runtime the source was opened in; use it from a
/// blocking thread.
pub struct S3RangeSource {
    client: aws_sdk_s3::Client,
    bucket: String,
    object_key: String,
    display: String,
    size: u64,
    last_modified: DateTime<Utc>,
    runtime: Handle,
}

impl S3RangeSource {
    async fn get_range(
        &self,
        range: Range<u64>,
        if_unmodified_since: DateTime<Utc>,
    ) -> Result<Vec<u8>, FetchError> {
        let since = aws_sdk_s3::primitives::DateTime::from_secs_and_nanos(
            if_unmodified_since.timestamp(),
            if_unmodified_since.timestamp_subsec_nanos(),
        );

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.object_key)
            .range(format!("bytes={}-{}", range.start, range.end - 1))
            .if_unmodified_since(since)
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(err) if is_precondition_failed(&err) => {
                return Err(FetchError::PreconditionFailed);
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!(
                        "Failed to fetch bytes {}..{} of {}",
                        range.start, range.end, self.display
                    ))
                    .into());
            }
        };

        let body = output
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read response body from: {}", self.display))?;
        Ok(body.into_bytes().to_vec())
    }
}

impl RangeSource for S3RangeSource {
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
        &self.display
    }
}

fn is_precondition_failed(err: &SdkError<GetObjectError, HttpResponse>) -> bool {
    let code = err.as_service_error().and_then(|e| e.code());
    let status = err.raw_response().map(|r| r.status().as_u16());
    code == Some("PreconditionFailed") || status == Some(412)
}
