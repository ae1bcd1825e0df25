//! Session: authenticated request execution.
//!
//! Each call runs as a bounded loop of attempts. An attempt builds the
//! request from the caller's options, authenticates it (token header or
//! AK/SK signature), sends it and evaluates the status:
//!
//! - accepted status: the response is returned
//! - 401 with a reauthenticator: reauthenticate once and replay
//! - 502/504 with retry budget left: sleep and resend
//! - anything else: classify into a typed error
//!
//! Every failure after a replay is wrapped in
//! [`ProviderError::AfterReauthentication`]. The loop never exceeds
//! [`SessionConfig::max_attempts`]; once the cap is hit the last status is
//! classified like any other failure.

use crate::classify::classify;
use crate::config::SessionConfig;
use crate::credentials::Identity;
use crate::error::{ProviderError, ProviderResult, UnexpectedResponse};
use crate::reauth::Reauthenticator;
use crate::request::{RequestOptions, Response, render_json};
use crate::signer::{AkSkSigner, Signer};
use crate::token::{AUTH_TOKEN_HEADER, Guarded, ReauthOutcome, TokenGuard, Unguarded};
use bytes::Bytes;
use reqwest::header::{
    ACCEPT, CONNECTION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};
use reqwest::{Client, Method};
use sdk_common::{RetryPolicy, UserAgent, build_http_client};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use url::Url;

const APPLICATION_JSON: &str = "application/json";

/// Header scoping AK/SK-signed requests to a project.
pub const PROJECT_ID_HEADER: &str = "X-Project-Id";

/// Header scoping AK/SK-signed requests to a domain.
pub const DOMAIN_ID_HEADER: &str = "X-Domain-Id";

/// One authenticated identity and the transport it talks through.
///
/// `G` selects the token guard: [`Guarded`] sessions can be shared between
/// tasks (wrap them in an `Arc`), [`Unguarded`] sessions are `!Sync`.
pub struct Session<G: TokenGuard = Guarded> {
    config: SessionConfig,
    http: Client,
    guard: G,
    user_agent: UserAgent,
    reauth: Option<Arc<dyn Reauthenticator>>,
    signer: Arc<dyn Signer>,
}

impl Session<Guarded> {
    /// Create a session that is safe to share between tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the transport cannot be built.
    pub fn guarded(config: SessionConfig) -> ProviderResult<Self> {
        Self::new(config)
    }
}

impl Session<Unguarded> {
    /// Create a session for single-task use.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the transport cannot be built.
    pub fn unguarded(config: SessionConfig) -> ProviderResult<Self> {
        Self::new(config)
    }
}

/// Outcome of evaluating one attempt's status.
enum Next {
    Replay,
    Retry,
    Fail(ProviderError),
}

impl<G: TokenGuard> Session<G> {
    /// Create a session with the given guard type.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the transport cannot be built.
    pub fn new(config: SessionConfig) -> ProviderResult<Self> {
        config.validate()?;
        let http = build_http_client(&config.http)?;
        let mut user_agent = UserAgent::new();
        user_agent.prepend(config.user_agent.iter().cloned());
        let guard = G::from_state(config.initial_state());

        Ok(Self {
            config,
            http,
            guard,
            user_agent,
            reauth: None,
            signer: Arc::new(AkSkSigner),
        })
    }

    /// Use a custom transport.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Reauthenticate with `reauth` when a request is rejected with 401.
    #[must_use]
    pub fn with_reauthenticator(mut self, reauth: Arc<dyn Reauthenticator>) -> Self {
        self.reauth = Some(reauth);
        self
    }

    /// Replace the AK/SK signer.
    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    /// Prepend strings to the User-Agent header.
    pub fn prepend_user_agent<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_agent.prepend(values);
    }

    /// The User-Agent sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> String {
        self.user_agent.join()
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The token guard.
    #[must_use]
    pub const fn guard(&self) -> &G {
        &self.guard
    }

    /// Current token.
    pub async fn token(&self) -> String {
        self.guard.read_token().await
    }

    /// Replace the token.
    pub async fn set_token(&self, token: impl Into<String>) {
        self.guard.write_token(token.into()).await;
    }

    /// Current identity.
    pub async fn identity(&self) -> Identity {
        self.guard.identity().await
    }

    /// Run the reauthentication callback now.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfig`] if no reauthenticator is set,
    /// or the callback's error wrapped as [`ProviderError::Reauthentication`].
    pub async fn reauthenticate(&self) -> ProviderResult<()> {
        let reauth = self
            .reauth
            .as_deref()
            .ok_or_else(|| ProviderError::invalid_config("no reauthenticator configured"))?;
        self.guard
            .reauthenticate(None, reauth)
            .await
            .map(|_| ())
            .map_err(|source| ProviderError::Reauthentication {
                original: None,
                source,
            })
    }

    /// Perform a request and decode the accepted response body as JSON.
    ///
    /// # Errors
    ///
    /// Everything [`Self::request`] returns, plus [`ProviderError::Decode`].
    /// A decode failure on a response obtained by replaying after
    /// reauthentication is wrapped like any other replay failure.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> ProviderResult<T> {
        let (response, reauthenticated) = self.execute(method, url, options).await?;
        response.json().map_err(|err| {
            if reauthenticated { err.after_reauthentication() } else { err }
        })
    }

    /// Perform an authenticated request.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::InvalidRequest`] for malformed options, before any I/O
    /// - [`ProviderError::Transport`] for network failures, never retried
    /// - [`ProviderError::Status`] / [`ProviderError::Domain`] for unaccepted statuses
    /// - [`ProviderError::Reauthentication`], [`ProviderError::BodyRewind`] and
    ///   [`ProviderError::AfterReauthentication`] from the 401 recovery path
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> ProviderResult<Response> {
        self.execute(method, url, options)
            .await
            .map(|(response, _)| response)
    }

    /// Run the attempt loop. The flag reports whether the accepted response
    /// came from a replay after reauthentication.
    #[instrument(skip_all, fields(method = %method, url = %url))]
    async fn execute(
        &self,
        method: Method,
        url: &str,
        mut options: RequestOptions,
    ) -> ProviderResult<(Response, bool)> {
        options.validate()?;
        let url = Url::parse(url)
            .map_err(|e| ProviderError::invalid_request(format!("invalid URL {url}: {e}")))?;

        let ok_codes = options.effective_ok_codes(&method);
        let mut budget = RetryPolicy::from_overrides(options.retry_count, options.retry_delay).budget();
        let is_json = options.json_body.is_some();
        let mut body = match (&options.json_body, options.raw_body.as_mut()) {
            (Some(value), _) => Some(render_json(value)?),
            (None, Some(raw)) => Some(raw.read_all().await.map_err(ProviderError::BodyRead)?),
            (None, None) => None,
        };

        let mut reauthenticated = false;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let finish = move |err: ProviderError| {
                if reauthenticated { err.after_reauthentication() } else { err }
            };

            let request = match self
                .build_request(&method, &url, &options, body.clone(), is_json)
                .await
            {
                Ok(request) => request,
                Err(err) => return Err(finish(err)),
            };
            let pre_request_token = request
                .headers()
                .get(AUTH_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();

            debug!(attempt, "Sending request");
            let response = match self.http.execute(request).await {
                Ok(response) => response,
                Err(err) => return Err(finish(err.into())),
            };

            let status = response.status().as_u16();
            if ok_codes.contains(&status) {
                let headers = response.headers().clone();
                let status_code = response.status();
                return match response.bytes().await {
                    Ok(bytes) => Ok((
                        Response {
                            status: status_code,
                            headers,
                            body: bytes,
                        },
                        reauthenticated,
                    )),
                    Err(err) => Err(finish(err.into())),
                };
            }

            let failure = match unexpected(&url, &method, &ok_codes, response).await {
                Ok(failure) => failure,
                Err(err) => return Err(finish(err)),
            };

            let next = if attempt >= self.config.max_attempts {
                warn!(attempt, status, "Attempt limit reached");
                Next::Fail(classify(failure, options.error_context.as_deref()))
            } else {
                self.evaluate(failure, &pre_request_token, &mut budget, &options)
                    .await
            };

            match next {
                Next::Retry => {}
                Next::Replay => {
                    if let Some(raw) = options.raw_body.as_mut() {
                        if let Err(err) = raw.rewind().await {
                            return Err(finish(ProviderError::BodyRewind(err)));
                        }
                        body = match raw.read_all().await {
                            Ok(bytes) => Some(bytes),
                            Err(err) => return Err(finish(ProviderError::BodyRead(err))),
                        };
                    }
                    reauthenticated = true;
                }
                Next::Fail(err) => return Err(finish(err)),
            }
        }
    }

    async fn evaluate(
        &self,
        failure: UnexpectedResponse,
        pre_request_token: &str,
        budget: &mut sdk_common::RetryBudget,
        options: &RequestOptions,
    ) -> Next {
        let status = failure.actual;
        if status == 401 {
            if let Some(reauth) = self.reauth.as_deref() {
                warn!("Received 401, reauthenticating");
                return match self.guard.reauthenticate(Some(pre_request_token), reauth).await {
                    Ok(ReauthOutcome::Refreshed) => Next::Replay,
                    Ok(ReauthOutcome::AlreadyRefreshed) => {
                        debug!("Token was refreshed concurrently, replaying");
                        Next::Replay
                    }
                    Err(source) => {
                        error!(error = %source, "Reauthentication failed");
                        Next::Fail(ProviderError::Reauthentication {
                            original: Some(failure),
                            source,
                        })
                    }
                };
            }
        }

        if budget.wait_for_retry(status).await {
            return Next::Retry;
        }

        Next::Fail(classify(failure, options.error_context.as_deref()))
    }

    async fn build_request(
        &self,
        method: &Method,
        url: &Url,
        options: &RequestOptions,
        body: Option<Bytes>,
        is_json: bool,
    ) -> ProviderResult<reqwest::Request> {
        let mut headers = HeaderMap::new();
        if is_json {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        }
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        headers.insert(USER_AGENT, header_value(&self.user_agent.join())?);

        for (name, value) in &options.more_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ProviderError::invalid_request(format!("invalid header {name}: {e}")))?;
            if value.is_empty() {
                headers.remove(&name);
            } else {
                headers.insert(name, header_value(value)?);
            }
        }

        let signing = self.config.signing_keys();
        if signing.is_none() {
            headers.extend(self.guard.auth_headers().await);
        }
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let mut request = reqwest::Request::new(method.clone(), url.clone());
        *request.headers_mut() = headers;
        *request.body_mut() = body.map(Into::into);

        if let Some(aksk) = signing {
            if !aksk.project_id.is_empty() {
                request
                    .headers_mut()
                    .insert(PROJECT_ID_HEADER, header_value(&aksk.project_id)?);
            }
            if !aksk.domain_id.is_empty() {
                request
                    .headers_mut()
                    .insert(DOMAIN_ID_HEADER, header_value(&aksk.domain_id)?);
            }
            self.signer
                .sign(&mut request, &aksk.access_key, aksk.secret())
                .map_err(|e| ProviderError::Signing(e.to_string()))?;
        }

        Ok(request)
    }
}

fn header_value(value: &str) -> ProviderResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ProviderError::invalid_request(format!("invalid header value: {e}")))
}

async fn unexpected(
    url: &Url,
    method: &Method,
    ok_codes: &[u16],
    response: reqwest::Response,
) -> ProviderResult<UnexpectedResponse> {
    let actual = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response.bytes().await?;
    Ok(UnexpectedResponse {
        url: url.to_string(),
        method: method.clone(),
        expected: ok_codes.to_vec(),
        actual,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{AkSkOptions, AuthResult};
    use crate::reauth::reauth_fn;
    use crate::signer::SDK_DATE_HEADER;
    use reqwest::header::AUTHORIZATION;

    fn config() -> SessionConfig {
        SessionConfig::new("https://iam.example.com/v3").with_token("tok-1")
    }

    #[tokio::test]
    async fn test_build_request_defaults() {
        let session = Session::guarded(config()).unwrap();
        let url = Url::parse("https://vpc.example.com/v1/p/vpcs").unwrap();
        let options = RequestOptions::new();
        let request = session
            .build_request(&Method::GET, &url, &options, None, false)
            .await
            .unwrap();

        let headers = request.headers();
        assert_eq!(headers[ACCEPT], APPLICATION_JSON);
        assert_eq!(headers[USER_AGENT], "golangsdk/2.0.0");
        assert_eq!(headers[CONNECTION], "close");
        assert_eq!(headers[AUTH_TOKEN_HEADER], "tok-1");
        assert!(!headers.contains_key(CONTENT_TYPE));
    }

    #[tokio::test]
    async fn test_more_headers_override_and_suppress() {
        let mut session = Session::guarded(config()).unwrap();
        session.prepend_user_agent(["terraform/1.9"]);
        let url = Url::parse("https://vpc.example.com/v1/p/vpcs").unwrap();
        let options = RequestOptions::new()
            .with_header("Accept", "")
            .with_header("Content-Type", "application/merge-patch+json")
            .with_header("X-Language", "en-us");
        let request = session
            .build_request(&Method::PATCH, &url, &options, Some(Bytes::from_static(b"{}")), true)
            .await
            .unwrap();

        let headers = request.headers();
        assert!(!headers.contains_key(ACCEPT));
        assert_eq!(headers[CONTENT_TYPE], "application/merge-patch+json");
        assert_eq!(headers["X-Language"], "en-us");
        assert_eq!(headers[USER_AGENT], "terraform/1.9 golangsdk/2.0.0");
    }

    #[tokio::test]
    async fn test_aksk_takes_precedence_over_token() {
        let config = config().with_aksk(
            AkSkOptions::new("AK", "SK")
                .with_project_id("proj")
                .with_domain_id("dom"),
        );
        let session = Session::guarded(config).unwrap();
        let url = Url::parse("https://vpc.example.com/v1/p/vpcs").unwrap();
        let options = RequestOptions::new().with_header(SDK_DATE_HEADER, "20240101T000000Z");
        let request = session
            .build_request(&Method::GET, &url, &options, None, false)
            .await
            .unwrap();

        let headers = request.headers();
        assert!(!headers.contains_key(AUTH_TOKEN_HEADER));
        assert_eq!(headers[PROJECT_ID_HEADER], "proj");
        assert_eq!(headers[DOMAIN_ID_HEADER], "dom");
        let auth = headers[AUTHORIZATION].to_str().unwrap();
        assert!(auth.contains("SignedHeaders=host;x-domain-id;x-project-id;x-sdk-date"));
    }

    #[tokio::test]
    async fn test_invalid_header_name_rejected() {
        let session = Session::guarded(config()).unwrap();
        let url = Url::parse("https://vpc.example.com/").unwrap();
        let options = RequestOptions::new().with_header("bad header", "x");
        let err = session
            .build_request(&Method::GET, &url, &options, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_explicit_reauthenticate() {
        let session = Session::unguarded(config())
            .unwrap()
            .with_reauthenticator(Arc::new(reauth_fn(|| async {
                Ok(AuthResult::token("tok-2").with_project_id("p2"))
            })));
        session.reauthenticate().await.unwrap();
        assert_eq!(session.token().await, "tok-2");
        assert_eq!(session.identity().await.project_id, "p2");
    }

    #[tokio::test]
    async fn test_explicit_reauthenticate_requires_callback() {
        let session = Session::unguarded(config()).unwrap();
        assert!(matches!(
            session.reauthenticate().await,
            Err(ProviderError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_io() {
        let session = Session::guarded(config()).unwrap();
        let err = session
            .request(Method::GET, "not a url", RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }
}
