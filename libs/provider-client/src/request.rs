//! Per-call request options and the response type.

use crate::classify::ErrorContext;
use crate::error::{ProviderError, ProviderResult};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// A raw body source that can be rewound for replay.
pub trait SeekableBody: AsyncRead + AsyncSeek + Unpin + Send + Sync {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send + Sync> SeekableBody for T {}

/// Raw request body, sent as-is with no inferred content type.
pub enum RawBody {
    /// In-memory bytes; always replayable
    Bytes(Bytes),
    /// A reader that is rewound to its start before a replay
    Seekable(Box<dyn SeekableBody>),
    /// A one-shot reader. It is buffered once before the first send and never
    /// re-read, so a replay after reauthentication fails with
    /// [`ProviderError::BodyRewind`](crate::ProviderError::BodyRewind).
    Stream(Box<dyn AsyncRead + Unpin + Send + Sync>),
}

impl fmt::Debug for RawBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Seekable(_) => f.write_str("Seekable(..)"),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl RawBody {
    pub(crate) async fn read_all(&mut self) -> std::io::Result<Bytes> {
        match self {
            Self::Bytes(b) => Ok(b.clone()),
            Self::Seekable(reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                Ok(buf.into())
            }
            Self::Stream(reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                Ok(buf.into())
            }
        }
    }

    pub(crate) async fn rewind(&mut self) -> std::io::Result<()> {
        match self {
            Self::Bytes(_) => Ok(()),
            Self::Seekable(reader) => reader.seek(SeekFrom::Start(0)).await.map(|_| ()),
            Self::Stream(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "stream body cannot be rewound",
            )),
        }
    }
}

impl From<Bytes> for RawBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RawBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes.into())
    }
}

/// Options customising a single [`Session::request`](crate::Session::request) call.
///
/// At most one of `json_body` and `raw_body` may be set; a request with both
/// fails with [`ProviderError::InvalidRequest`] before anything is sent.
#[derive(Debug, Default)]
pub struct RequestOptions {
    /// Serialized as compact JSON; sets `Content-Type: application/json`
    pub json_body: Option<serde_json::Value>,
    /// Sent unchanged
    pub raw_body: Option<RawBody>,
    /// Accepted status codes; defaults per method when unset
    pub ok_codes: Option<Vec<u16>>,
    /// Extra headers applied after the defaults; an empty value removes the header
    pub more_headers: Vec<(String, String)>,
    /// Replaces generic status errors with domain errors
    pub error_context: Option<Arc<dyn ErrorContext>>,
    /// Retries for 502/504; defaults to 1
    pub retry_count: Option<u32>,
    /// Delay before each retry; defaults to 500ms
    pub retry_delay: Option<Duration>,
}

impl RequestOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a JSON body.
    #[must_use]
    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.json_body = Some(body);
        self
    }

    /// Set a JSON body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Serialization`] if `body` cannot be represented as JSON.
    pub fn try_json_body<T: Serialize + ?Sized>(self, body: &T) -> ProviderResult<Self> {
        let value = serde_json::to_value(body).map_err(ProviderError::Serialization)?;
        Ok(self.with_json_body(value))
    }

    /// Set a raw body.
    #[must_use]
    pub fn with_raw_body(mut self, body: impl Into<RawBody>) -> Self {
        self.raw_body = Some(body.into());
        self
    }

    /// Set the accepted status codes.
    #[must_use]
    pub fn with_ok_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.ok_codes = Some(codes.into_iter().collect());
        self
    }

    /// Add a header. An empty value suppresses the header instead.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.more_headers.push((name.into(), value.into()));
        self
    }

    /// Set the error override.
    #[must_use]
    pub fn with_error_context(mut self, context: Arc<dyn ErrorContext>) -> Self {
        self.error_context = Some(context);
        self
    }

    /// Set the gateway retry budget.
    #[must_use]
    pub const fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    /// Set the delay between gateway retries.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Reject option combinations that are programming errors.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidRequest`] if both body kinds are set.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.json_body.is_some() && self.raw_body.is_some() {
            return Err(ProviderError::invalid_request(
                "provide only one of a JSON body or a raw body",
            ));
        }
        Ok(())
    }

    /// The accepted status codes for `method`, explicit or defaulted.
    #[must_use]
    pub fn effective_ok_codes(&self, method: &Method) -> Vec<u16> {
        self.ok_codes
            .clone()
            .unwrap_or_else(|| default_ok_codes(method))
    }
}

/// Status codes accepted by default for a method.
///
/// Methods outside the table accept nothing unless codes are given.
#[must_use]
pub fn default_ok_codes(method: &Method) -> Vec<u16> {
    match *method {
        Method::GET => vec![200],
        Method::POST | Method::PUT => vec![201, 202],
        Method::PATCH => vec![200, 204],
        Method::DELETE => vec![202, 204],
        _ => Vec::new(),
    }
}

/// Render a JSON body compactly.
pub(crate) fn render_json(value: &serde_json::Value) -> ProviderResult<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(ProviderError::Serialization)
}

/// A response with an accepted status.
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Bytes,
}

impl Response {
    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Decode`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> ProviderResult<T> {
        serde_json::from_slice(&self.body).map_err(ProviderError::Decode)
    }

    /// A response header as a string, if present and valid.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
