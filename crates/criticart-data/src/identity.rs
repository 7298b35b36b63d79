//! Identity service payloads.

use criticart_core::UserId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role value in `user_metadata` that grants moderation rights.
pub const ADMIN_ROLE: &str = "admin";

/// An authenticated identity as the identity service reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl AuthUser {
    pub fn new(id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
            user_metadata: Value::Object(Default::default()),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.user_metadata = metadata;
        self
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(Value::as_str)
    }

    pub fn role(&self) -> Option<&str> {
        self.metadata_str("role")
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(ADMIN_ROLE)
    }

    pub fn username(&self) -> Option<&str> {
        self.metadata_str("username")
    }

    pub fn full_name(&self) -> Option<&str> {
        self.metadata_str("full_name")
    }
}

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Expiry as a unix timestamp in seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AuthSession {
    pub fn new(access_token: impl Into<String>, user: AuthUser) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
            expires_at: None,
            token_type: default_token_type(),
            user,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }

    /// Whether the token has expired at `now` (unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// What a sign-up returns: a session when the identity is usable right away,
/// only the user when the provider requires email confirmation first.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    Session(AuthSession),
    ConfirmationRequired(AuthUser),
}

impl SignUpOutcome {
    /// Parse the sign-up response body.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if value.get("access_token").is_some() {
            return serde_json::from_value(value).map(SignUpOutcome::Session);
        }
        match value.get("user") {
            Some(user) => serde_json::from_value(user.clone()).map(SignUpOutcome::ConfirmationRequired),
            None => serde_json::from_value(value).map(SignUpOutcome::ConfirmationRequired),
        }
    }

    pub fn user(&self) -> &AuthUser {
        match self {
            SignUpOutcome::Session(session) => &session.user,
            SignUpOutcome::ConfirmationRequired(user) => user,
        }
    }

    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            SignUpOutcome::Session(session) => Some(session),
            SignUpOutcome::ConfirmationRequired(_) => None,
        }
    }
}
