//! Session identity as an injected capability.
//!
//! The core never touches cookies or browser storage directly. Whatever
//! authenticates the user hands the poller and the HTTP client a
//! `SessionProvider`, and tests substitute a fake one.

use std::env;

use async_trait::async_trait;

pub const SESSION_EMAIL_VAR: &str = "CASELINE_SESSION_EMAIL";
pub const SESSION_NAME_VAR: &str = "CASELINE_SESSION_NAME";
pub const SESSION_TOKEN_VAR: &str = "CASELINE_SESSION_TOKEN";

const PLACEHOLDER_NAME: &str = "Partner user";

/// Who the identity provider says is signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub email: String,
    pub name: String,
}

impl SessionIdentity {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }

    /// Generic identity returned when no session is established. The empty
    /// email disables both the ownership filter and email-based search.
    pub fn placeholder() -> Self {
        Self {
            email: String::new(),
            name: PLACEHOLDER_NAME.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.email.is_empty()
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current authenticated identity, or [`SessionIdentity::placeholder`].
    async fn current(&self) -> SessionIdentity;

    /// `Authorization` header value for outgoing requests, when the session
    /// carries one.
    async fn auth_header(&self) -> Option<String>;
}

/// Fixed identity, for tests and embedders that resolve the session up
/// front.
pub struct StaticSessionProvider {
    identity: SessionIdentity,
    token: Option<String>,
}

impl StaticSessionProvider {
    pub fn new(identity: SessionIdentity) -> Self {
        Self {
            identity,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn current(&self) -> SessionIdentity {
        self.identity.clone()
    }

    async fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {}", token))
    }
}

/// Reads the session from the process environment. Useful for headless
/// harnesses where the shell establishes the session out of band.
#[derive(Default)]
pub struct EnvSessionProvider;

#[async_trait]
impl SessionProvider for EnvSessionProvider {
    async fn current(&self) -> SessionIdentity {
        match env::var(SESSION_EMAIL_VAR) {
            Ok(email) if !email.trim().is_empty() => {
                let name = env::var(SESSION_NAME_VAR)
                    .ok()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| email.clone());
                SessionIdentity::new(email, name)
            }
            _ => SessionIdentity::placeholder(),
        }
    }

    async fn auth_header(&self) -> Option<String> {
        env::var(SESSION_TOKEN_VAR)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(|token| format!("Bearer {}", token))
    }
}
