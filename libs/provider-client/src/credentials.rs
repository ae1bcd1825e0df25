//! Credential state held by a session.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Identifiers of the authenticated principal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Project the user is scoped to
    pub project_id: String,
    /// Authenticated user
    pub user_id: String,
    /// Domain the user belongs to
    pub domain_id: String,
    /// Region name
    pub region_id: String,
}

/// Mutable credential state: the bearer token plus identity.
///
/// Only the session's token guard owns a `CredentialState`; it is replaced
/// piecewise by [`AuthResult`]s returned from reauthentication.
#[derive(Clone, Default)]
pub struct CredentialState {
    /// Current bearer token, empty before first authentication
    pub token: String,
    /// Identity the token was issued for
    pub identity: Identity,
}

impl fmt::Debug for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialState")
            .field("token", &if self.token.is_empty() { "" } else { "[REDACTED]" })
            .field("identity", &self.identity)
            .finish()
    }
}

impl CredentialState {
    /// Create a state with an initial token.
    #[must_use]
    pub fn new(token: impl Into<String>, identity: Identity) -> Self {
        Self {
            token: token.into(),
            identity,
        }
    }

    /// Apply the outcome of a reauthentication.
    pub fn apply(&mut self, auth: AuthResult) {
        self.token = auth.token;
        if let Some(project_id) = auth.project_id {
            self.identity.project_id = project_id;
        }
        if let Some(user_id) = auth.user_id {
            self.identity.user_id = user_id;
        }
        if let Some(domain_id) = auth.domain_id {
            self.identity.domain_id = domain_id;
        }
    }
}

/// What a reauthentication produced.
#[derive(Clone, Default)]
pub struct AuthResult {
    /// Freshly issued token
    pub token: String,
    /// Project id, when the identity service reported one
    pub project_id: Option<String>,
    /// User id, when the identity service reported one
    pub user_id: Option<String>,
    /// Domain id, when the identity service reported one
    pub domain_id: Option<String>,
}

impl fmt::Debug for AuthResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResult")
            .field("token", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("user_id", &self.user_id)
            .field("domain_id", &self.domain_id)
            .finish()
    }
}

impl AuthResult {
    /// A result carrying only a new token.
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// Attach a project id.
    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Attach a user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attach a domain id.
    #[must_use]
    pub fn with_domain_id(mut self, domain_id: impl Into<String>) -> Self {
        self.domain_id = Some(domain_id.into());
        self
    }
}

/// Access-key/secret-key pair for request signing.
///
/// A session with a non-empty access key signs every request and never
/// sends its bearer token.
#[derive(Debug, Clone)]
pub struct AkSkOptions {
    /// Access key id
    pub access_key: String,
    /// Secret key
    pub secret_key: SecretString,
    /// Sent as `X-Project-Id` when non-empty
    pub project_id: String,
    /// Sent as `X-Domain-Id` when non-empty
    pub domain_id: String,
}

impl AkSkOptions {
    /// Create AK/SK options.
    #[must_use]
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: SecretString::from(secret_key.into()),
            project_id: String::new(),
            domain_id: String::new(),
        }
    }

    /// Scope signed requests to a project.
    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    /// Scope signed requests to a domain.
    #[must_use]
    pub fn with_domain_id(mut self, domain_id: impl Into<String>) -> Self {
        self.domain_id = domain_id.into();
        self
    }

    /// Whether these options enable signing.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.access_key.is_empty()
    }

    pub(crate) fn secret(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_keeps_unreported_identity() {
        let mut state = CredentialState::new(
            "old",
            Identity {
                project_id: "p1".to_string(),
                user_id: "u1".to_string(),
                domain_id: "d1".to_string(),
                region_id: "eu-de".to_string(),
            },
        );

        state.apply(AuthResult::token("new").with_project_id("p2"));

        assert_eq!(state.token, "new");
        assert_eq!(state.identity.project_id, "p2");
        assert_eq!(state.identity.user_id, "u1");
        assert_eq!(state.identity.region_id, "eu-de");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let state = CredentialState::new("super-secret-token", Identity::default());
        assert!(!format!("{state:?}").contains("super-secret-token"));

        let auth = AuthResult::token("another-secret");
        assert!(!format!("{auth:?}").contains("another-secret"));

        let aksk = AkSkOptions::new("AK", "SK-very-secret");
        assert!(!format!("{aksk:?}").contains("SK-very-secret"));
    }

    #[test]
    fn test_aksk_enabled() {
        assert!(AkSkOptions::new("AK", "SK").is_enabled());
        assert!(!AkSkOptions::new("", "SK").is_enabled());
    }
}
