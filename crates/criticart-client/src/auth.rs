//! Signed-in session handling.
//!
//! The session lives in a shared [`SessionHandle`] read by the data-access
//! layer, and is mirrored to the key-value store under `user` so it survives
//! a restart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use criticart_cache::{JsonStore, KeyValueStore};
use criticart_core::validate::{require, validate_email, validate_password, validate_username};
use criticart_data::{AuthSession, AuthUser, IdentityApi, SignUpOutcome};
use serde_json::json;
use tracing::{info, warn};

use crate::error::{DataError, DataResult};

/// Storage key of the persisted session.
pub const SESSION_KEY: &str = "user";

/// Shared, cloneable view of the current session.
///
/// Every `set` or `clear` bumps a generation counter, which readers use to
/// notice that the signed-in identity may have changed.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<AuthSession>>>,
    generation: Arc<AtomicU64>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle already holding `session`.
    pub fn signed_in(session: AuthSession) -> Self {
        let handle = Self::new();
        handle.set(session);
        handle
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, session: AuthSession) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(session);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn clear(&self) -> Option<AuthSession> {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        slot.take()
    }

    /// Number of session changes so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// The current session, or `AuthRequired`.
    pub fn require(&self) -> DataResult<AuthSession> {
        self.current().ok_or(DataError::AuthRequired)
    }

    /// A session whose user carries the admin role.
    ///
    /// Signed-out callers get `AuthRequired`; signed-in non-admins get a
    /// permission denial.
    pub fn require_admin(&self) -> DataResult<AuthSession> {
        let session = self.require()?;
        if session.user.is_admin() {
            Ok(session)
        } else {
            Err(DataError::permission_denied())
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.current().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.current().is_some_and(|s| s.user.is_admin())
    }

    /// Access token to send, if signed in.
    pub fn token(&self) -> Option<String> {
        self.current().map(|s| s.access_token)
    }
}

/// Sign-in, sign-up and sign-out against the identity service.
pub struct AuthClient<B> {
    backend: Arc<B>,
    storage: JsonStore<Arc<dyn KeyValueStore>>,
    session: SessionHandle,
}

impl<B: IdentityApi> AuthClient<B> {
    pub fn new(backend: Arc<B>, storage: Arc<dyn KeyValueStore>, session: SessionHandle) -> Self {
        Self {
            backend,
            storage: JsonStore::new(storage),
            session,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Load the persisted session, if any. Unreadable entries are discarded.
    pub fn restore(&self) -> Option<AuthSession> {
        match self.storage.get::<AuthSession>(SESSION_KEY) {
            Ok(Some(session)) => {
                info!(user = %session.user.id, "restored session");
                self.session.set(session.clone());
                Some(session)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "discarding unreadable stored session");
                if let Err(e) = self.storage.remove(SESSION_KEY) {
                    warn!(error = %e, "failed to remove stored session");
                }
                None
            }
        }
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.session.current()
    }

    pub fn require(&self) -> DataResult<AuthSession> {
        self.session.require()
    }

    pub fn is_admin(&self) -> bool {
        self.session.is_admin()
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> DataResult<AuthSession> {
        validate_email(email)?;
        require("Password", password)?;

        let session = self
            .backend
            .sign_in_with_password(email.trim(), password)
            .await?;
        info!(user = %session.user.id, "signed in");
        self.remember(&session);
        Ok(session)
    }

    /// Register a new account. `username` lands in the user metadata.
    ///
    /// When the provider returns a session right away the user is signed in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> DataResult<SignUpOutcome> {
        validate_email(email)?;
        validate_password(password)?;
        validate_username(username)?;

        let outcome = self
            .backend
            .sign_up(email.trim(), password, json!({ "username": username }))
            .await?;
        info!(user = %outcome.user().id, confirmed = outcome.session().is_some(), "signed up");
        if let Some(session) = outcome.session() {
            self.remember(session);
        }
        Ok(outcome)
    }

    /// Sign out. The local session is dropped even if the remote call fails.
    pub async fn sign_out(&self) -> DataResult<()> {
        let Some(session) = self.session.clear() else {
            return Ok(());
        };
        if let Err(e) = self.storage.remove(SESSION_KEY) {
            warn!(error = %e, "failed to remove stored session");
        }
        info!(user = %session.user.id, "signed out");
        self.backend.sign_out(&session.access_token).await?;
        Ok(())
    }

    /// Ask the identity service who the current token belongs to.
    ///
    /// A rejected token signs the user out locally.
    pub async fn fetch_user(&self) -> DataResult<AuthUser> {
        let session = self.session.require()?;
        match self.backend.get_user(&session.access_token).await {
            Ok(user) => Ok(user),
            Err(e) => {
                let err = DataError::from(e);
                if err == DataError::AuthRequired {
                    self.session.clear();
                    if let Err(e) = self.storage.remove(SESSION_KEY) {
                        warn!(error = %e, "failed to remove stored session");
                    }
                }
                Err(err)
            }
        }
    }

    fn remember(&self, session: &AuthSession) {
        self.session.set(session.clone());
        if let Err(e) = self.storage.set(SESSION_KEY, session) {
            warn!(error = %e, "failed to persist session");
        }
    }
}
