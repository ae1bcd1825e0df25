//! Session configuration.

use crate::credentials::{AkSkOptions, CredentialState, Identity};
use crate::error::{ProviderError, ProviderResult};
use sdk_common::HttpConfig;
use secrecy::{ExposeSecret, SecretString};
use std::env;

/// Default hard cap on attempts per call, covering gateway retries and
/// replays after reauthentication together.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Configuration of a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Root of the identity service, not a specific version
    pub identity_base: String,
    /// Versioned identity endpoint, used instead of version discovery when set
    pub identity_endpoint: String,
    /// Initial bearer token
    pub token: Option<SecretString>,
    /// Project id
    pub project_id: String,
    /// User id
    pub user_id: String,
    /// Domain id
    pub domain_id: String,
    /// Region name
    pub region_id: String,
    /// AK/SK pair; when set, requests are signed instead of token-authenticated
    pub aksk: Option<AkSkOptions>,
    /// Strings prepended to the default User-Agent, first entry outermost
    pub user_agent: Vec<String>,
    /// Transport settings
    pub http: HttpConfig,
    /// Hard cap on attempts per call
    pub max_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identity_base: String::new(),
            identity_endpoint: String::new(),
            token: None,
            project_id: String::new(),
            user_id: String::new(),
            domain_id: String::new(),
            region_id: String::new(),
            aksk: None,
            user_agent: Vec::new(),
            http: HttpConfig::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

fn env_or_empty(key: &str) -> String {
    env::var(key).unwrap_or_default()
}

impl SessionConfig {
    /// Create a configuration for an identity endpoint.
    #[must_use]
    pub fn new(identity_endpoint: impl Into<String>) -> Self {
        Self {
            identity_endpoint: identity_endpoint.into(),
            ..Default::default()
        }
    }

    /// Load configuration from `OS_*` environment variables.
    ///
    /// Reads `OS_AUTH_URL`, `OS_IDENTITY_ENDPOINT`, `OS_TOKEN`,
    /// `OS_PROJECT_ID`, `OS_USER_ID`, `OS_DOMAIN_ID`, `OS_REGION_NAME`,
    /// `OS_ACCESS_KEY` and `OS_SECRET_KEY`. Unset values stay empty.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfig`] if the result fails [`Self::validate`].
    pub fn from_env() -> ProviderResult<Self> {
        let access_key = env_or_empty("OS_ACCESS_KEY");
        let secret_key = env_or_empty("OS_SECRET_KEY");
        let project_id = env_or_empty("OS_PROJECT_ID");
        let domain_id = env_or_empty("OS_DOMAIN_ID");

        let aksk = (!access_key.is_empty() || !secret_key.is_empty()).then(|| {
            AkSkOptions::new(access_key, secret_key)
                .with_project_id(project_id.clone())
                .with_domain_id(domain_id.clone())
        });

        let config = Self {
            identity_base: env_or_empty("OS_AUTH_URL"),
            identity_endpoint: env_or_empty("OS_IDENTITY_ENDPOINT"),
            token: env::var("OS_TOKEN").ok().filter(|t| !t.is_empty()).map(SecretString::from),
            project_id,
            user_id: env_or_empty("OS_USER_ID"),
            domain_id,
            region_id: env_or_empty("OS_REGION_NAME"),
            aksk,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the initial token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the AK/SK pair.
    #[must_use]
    pub fn with_aksk(mut self, aksk: AkSkOptions) -> Self {
        self.aksk = Some(aksk);
        self
    }

    /// Set the project id.
    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    /// Set the domain id.
    #[must_use]
    pub fn with_domain_id(mut self, domain_id: impl Into<String>) -> Self {
        self.domain_id = domain_id.into();
        self
    }

    /// Set the user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Set the region.
    #[must_use]
    pub fn with_region(mut self, region_id: impl Into<String>) -> Self {
        self.region_id = region_id.into();
        self
    }

    /// Set the transport settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Set the attempt cap (at least 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfig`] if only half of the AK/SK
    /// pair is set or `max_attempts` is zero.
    pub fn validate(&self) -> ProviderResult<()> {
        if let Some(aksk) = &self.aksk {
            let has_secret = !aksk.secret_key.expose_secret().is_empty();
            if aksk.access_key.is_empty() == has_secret {
                return Err(ProviderError::invalid_config(
                    "access key and secret key must be provided together",
                ));
            }
        }
        if self.max_attempts == 0 {
            return Err(ProviderError::invalid_config("max_attempts must be at least 1"));
        }
        Ok(())
    }

    pub(crate) fn initial_state(&self) -> CredentialState {
        CredentialState::new(
            self.token
                .as_ref()
                .map(|t| t.expose_secret().to_string())
                .unwrap_or_default(),
            Identity {
                project_id: self.project_id.clone(),
                user_id: self.user_id.clone(),
                domain_id: self.domain_id.clone(),
                region_id: self.region_id.clone(),
            },
        )
    }

    pub(crate) fn signing_keys(&self) -> Option<&AkSkOptions> {
        self.aksk.as_ref().filter(|aksk| aksk.is_enabled())
    }
}
