//! HTTP client wrapper for metadata requests.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::MetadataError;

/// HTTP client wrapper for metadata service requests.
///
/// Every request carries the same fixed timeout, covering both the
/// response headers and the body.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    inner: Client,
    timeout: Duration,
    max_size: Option<usize>,
}

impl MetadataClient {
    /// Create a new metadata client with the specified per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self::from_client(inner, timeout))
    }

    /// Wrap an existing client, e.g. one configured with a proxy.
    ///
    /// `timeout` is applied to each request on top of the client's own settings.
    pub fn from_client(inner: Client, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            max_size: None,
        }
    }

    /// Set the maximum accepted body size.
    pub fn with_max_size(mut self, max_size: Option<usize>) -> Self {
        self.max_size = max_size;
        self
    }

    async fn get(&self, url: &str) -> Result<Response, MetadataError> {
        Ok(self.inner.get(url).timeout(self.timeout).send().await?)
    }

    /// GET `url` and return its body as text.
    ///
    /// Only 404 is treated as an error status; any other response body is
    /// returned as-is. The body is consumed on every path.
    pub async fn fetch(&self, url: &str) -> Result<String, MetadataError> {
        let response = self.get(url).await?;

        if response.status().as_u16() == 404 {
            discard_body(response).await;
            return Err(MetadataError::NotFound);
        }

        let body = read_body_limited(response, self.max_size).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Drain a response we are not interested in.
///
/// A failure here is logged and otherwise ignored.
async fn discard_body(response: Response) {
    let url = response.url().to_string();
    if let Err(err) = response.bytes().await {
        tracing::warn!(%url, error = %err, "error ending body");
    }
}

/// Read response body with an optional size limit.
///
/// If `max_size` is `Some`, this will:
/// 1. Check the `Content-Length` header and fail early if it exceeds the limit
/// 2. Read the body with a pre-allocated capped buffer, aborting immediately if exceeded
///
/// This protects against memory exhaustion from large responses.
pub async fn read_body_limited(
    response: Response,
    max_size: Option<usize>,
) -> Result<Vec<u8>, MetadataError> {
    let Some(max_size) = max_size else {
        return Ok(response.bytes().await.map_err(MetadataError::Body)?.to_vec());
    };

    if let Some(content_length) = response.content_length() {
        if content_length as usize > max_size {
            return Err(MetadataError::TooLarge(content_length as usize, max_size));
        }
    }

    // Content-Length may be missing or wrong, so cap the allocation either way
    let capacity = response
        .content_length()
        .map(|cl| (cl as usize).min(max_size))
        .unwrap_or(max_size.min(8192));
    let mut body = Vec::with_capacity(capacity);
    let mut total_read = 0usize;

    let mut stream = response;
    while let Some(chunk) = stream.chunk().await.map_err(MetadataError::Body)? {
        if total_read.saturating_add(chunk.len()) > max_size {
            return Err(MetadataError::TooLarge(
                total_read.saturating_add(chunk.len()),
                max_size,
            ));
        }
        total_read += chunk.len();
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
