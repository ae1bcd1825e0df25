//! AK/SK request signing.
//!
//! Signing runs after every other header is final and right before the
//! request is handed to the transport. The default [`AkSkSigner`] implements
//! the `SDK-HMAC-SHA256` scheme.

use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Request;
use reqwest::header::{AUTHORIZATION, HOST, HeaderValue};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Signature algorithm identifier.
pub const SIGNING_ALGORITHM: &str = "SDK-HMAC-SHA256";

/// Header carrying the signing timestamp.
pub const SDK_DATE_HEADER: &str = "X-Sdk-Date";

const SDK_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// RFC 3986 unreserved characters pass through; everything else is escaped.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Headers covered by the signature when present.
const SIGNED_HEADERS: [&str; 5] = ["content-type", "host", "x-domain-id", "x-project-id", "x-sdk-date"];

/// Signing failures.
#[derive(Error, Debug)]
pub enum SignError {
    /// The secret key could not key the MAC
    #[error("invalid secret key: {0}")]
    InvalidKey(String),

    /// The request body is a stream and cannot be hashed
    #[error("request body is not buffered")]
    UnbufferedBody,

    /// A computed header value was not valid
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Attaches signature headers to a request in place.
///
/// Implementations must be deterministic: the same method, path, query,
/// signed headers and body produce the same signature.
pub trait Signer: Send + Sync {
    /// Sign `request` with the given key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be canonicalised or signed.
    fn sign(&self, request: &mut Request, access_key: &str, secret_key: &str) -> Result<(), SignError>;
}

/// `SDK-HMAC-SHA256` signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AkSkSigner;

impl Signer for AkSkSigner {
    fn sign(&self, request: &mut Request, access_key: &str, secret_key: &str) -> Result<(), SignError> {
        if !request.headers().contains_key(SDK_DATE_HEADER) {
            let now = Utc::now().format(SDK_DATE_FORMAT).to_string();
            request
                .headers_mut()
                .insert(SDK_DATE_HEADER, HeaderValue::from_str(&now)?);
        }
        if !request.headers().contains_key(HOST) {
            let host = host_header(request);
            request.headers_mut().insert(HOST, HeaderValue::from_str(&host)?);
        }

        let body: &[u8] = match request.body() {
            None => &[],
            Some(body) => body.as_bytes().ok_or(SignError::UnbufferedBody)?,
        };

        let signed = signed_header_names(request);
        let canonical = canonical_request(request, &signed, body);
        let date = header_str(request, SDK_DATE_HEADER);
        let string_to_sign = format!(
            "{SIGNING_ALGORITHM}\n{date}\n{}",
            hex::encode(Sha256::digest(canonical.as_bytes()))
        );

        let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
            .map_err(|e| SignError::InvalidKey(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        let authorization = format!(
            "{SIGNING_ALGORITHM} Access={access_key}, SignedHeaders={}, Signature={signature}",
            signed.join(";")
        );
        let mut value = HeaderValue::from_str(&authorization)?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

fn host_header(request: &Request) -> String {
    let url = request.url();
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn header_str<'a>(request: &'a Request, name: &str) -> &'a str {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn signed_header_names(request: &Request) -> Vec<&'static str> {
    SIGNED_HEADERS
        .iter()
        .copied()
        .filter(|name| request.headers().contains_key(*name))
        .collect()
}

fn canonical_request(request: &Request, signed: &[&str], body: &[u8]) -> String {
    let mut path = request.url().path().to_string();
    if !path.ends_with('/') {
        path.push('/');
    }

    let mut query: Vec<(String, String)> = request
        .url()
        .query_pairs()
        .map(|(k, v)| (escape(&k), escape(&v)))
        .collect();
    query.sort();
    let query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let headers: String = signed
        .iter()
        .map(|name| format!("{name}:{}\n", header_str(request, name).trim()))
        .collect();

    format!(
        "{}\n{path}\n{query}\n{headers}\n{}\n{}",
        request.method(),
        signed.join(";"),
        hex::encode(Sha256::digest(body))
    )
}

fn escape(raw: &str) -> String {
    utf8_percent_encode(raw, UNRESERVED).to_string()
}
