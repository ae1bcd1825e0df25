//! Service-scoped handle used by resource bindings.

use crate::client::Session;
use crate::error::ProviderResult;
use crate::request::{RequestOptions, Response};
use crate::token::{Guarded, TokenGuard};
use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;

/// A session bound to one service endpoint.
///
/// Resource bindings build URLs with [`ServiceClient::service_url`] and issue
/// calls through the verb helpers, which default the accepted status codes
/// per method.
pub struct ServiceClient<G: TokenGuard = Guarded> {
    session: Arc<Session<G>>,
    endpoint: String,
    resource_base: Option<String>,
}

impl<G: TokenGuard> Clone for ServiceClient<G> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            endpoint: self.endpoint.clone(),
            resource_base: self.resource_base.clone(),
        }
    }
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

impl<G: TokenGuard> ServiceClient<G> {
    /// Bind `session` to a service endpoint.
    #[must_use]
    pub fn new(session: Arc<Session<G>>, endpoint: impl Into<String>) -> Self {
        Self {
            session,
            endpoint: with_trailing_slash(endpoint.into()),
            resource_base: None,
        }
    }

    /// Build resource URLs from `resource_base` instead of the endpoint.
    #[must_use]
    pub fn with_resource_base(mut self, resource_base: impl Into<String>) -> Self {
        self.resource_base = Some(with_trailing_slash(resource_base.into()));
        self
    }

    /// The underlying session.
    #[must_use]
    pub const fn session(&self) -> &Arc<Session<G>> {
        &self.session
    }

    /// The service endpoint, always ending in `/`.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Base URL for resources.
    #[must_use]
    pub fn resource_base_url(&self) -> &str {
        self.resource_base.as_deref().unwrap_or(&self.endpoint)
    }

    /// Join path parts onto the resource base.
    #[must_use]
    pub fn service_url(&self, parts: &[&str]) -> String {
        format!("{}{}", self.resource_base_url(), parts.join("/"))
    }

    /// Issue a request through the session.
    ///
    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn request(&self, method: Method, url: &str, options: RequestOptions) -> ProviderResult<Response> {
        self.session.request(method, url, options).await
    }

    /// GET `url`.
    ///
    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn get(&self, url: &str, options: RequestOptions) -> ProviderResult<Response> {
        self.request(Method::GET, url, options).await
    }

    /// POST `body` as JSON to `url`.
    ///
    /// # Errors
    ///
    /// See [`Session::request`]; also fails if `body` cannot be serialized.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> ProviderResult<Response> {
        self.request(Method::POST, url, options.try_json_body(body)?).await
    }

    /// PUT `body` as JSON to `url`.
    ///
    /// # Errors
    ///
    /// See [`Session::request`]; also fails if `body` cannot be serialized.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> ProviderResult<Response> {
        self.request(Method::PUT, url, options.try_json_body(body)?).await
    }

    /// PATCH `body` as JSON to `url`.
    ///
    /// # Errors
    ///
    /// See [`Session::request`]; also fails if `body` cannot be serialized.
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> ProviderResult<Response> {
        self.request(Method::PATCH, url, options.try_json_body(body)?).await
    }

    /// DELETE `url`.
    ///
    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn delete(&self, url: &str, options: RequestOptions) -> ProviderResult<Response> {
        self.request(Method::DELETE, url, options).await
    }

    /// HEAD `url`. Accepts 204 and 200 unless overridden.
    ///
    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn head(&self, url: &str, mut options: RequestOptions) -> ProviderResult<Response> {
        if options.ok_codes.is_none() {
            options.ok_codes = Some(vec![204, 200]);
        }
        self.request(Method::HEAD, url, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    fn client() -> ServiceClient {
        let session = Session::guarded(SessionConfig::new("https://iam.example.com/v3")).unwrap();
        ServiceClient::new(Arc::new(session), "https://vpc.eu-de.example.com/v1")
    }

    #[test]
    fn test_service_url() {
        let client = client();
        assert_eq!(client.endpoint(), "https://vpc.eu-de.example.com/v1/");
        assert_eq!(
            client.service_url(&["proj", "subnets", "abc"]),
            "https://vpc.eu-de.example.com/v1/proj/subnets/abc"
        );
    }

    #[test]
    fn test_resource_base() {
        let client = client().with_resource_base("https://vpc.eu-de.example.com/v1/proj");
        assert_eq!(
            client.service_url(&["vpcs"]),
            "https://vpc.eu-de.example.com/v1/proj/vpcs"
        );
    }
}
