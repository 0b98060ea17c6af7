//! Session store: the single source of truth for "who is authenticated".
//!
//! Identity transitions are published on a watch channel; the cart
//! reactions those transitions require (refresh on login/restore, purge on
//! logout) are driven by the [`Storefront`](crate::state::Storefront)
//! facade, which awaits them inline so their ordering is deterministic.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::api::types::{Identity, ProfileUpdate, RegisterRequest};
use crate::api::{ApiError, AuthGateway};
use crate::credentials::{CredentialStore, StoredCredential};

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Wrong username/email or password on an explicit login attempt.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The operation requires a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// Remote API failure.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Owns the current authenticated identity (or its absence).
///
/// Cheaply cloneable via `Arc`. The identity is replaced wholesale on
/// every successful auth operation and set to `None` on logout or
/// credential invalidation; there is never more than one current identity.
pub struct SessionStore<A, H> {
    inner: Arc<SessionInner<A, H>>,
}

impl<A, H> Clone for SessionStore<A, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<A, H> {
    gateway: A,
    credentials: H,
    identity_tx: watch::Sender<Option<Identity>>,
}

impl<A: AuthGateway, H: CredentialStore> SessionStore<A, H> {
    /// Create a session store with no current identity.
    pub fn new(gateway: A, credentials: H) -> Self {
        let (identity_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner {
                gateway,
                credentials,
                identity_tx,
            }),
        }
    }

    /// Subscribe to identity transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.inner.identity_tx.subscribe()
    }

    /// The current identity, if any.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.inner.identity_tx.borrow().clone()
    }

    /// Whether a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.identity_tx.borrow().is_some()
    }

    /// Whether a persisted credential exists (not yet validated).
    #[must_use]
    pub fn has_persisted_credential(&self) -> bool {
        self.inner.credentials.load().is_some()
    }

    /// Exchange a persisted credential for a fresh identity at startup.
    ///
    /// Returns the identity on success. Any failure discards the persisted
    /// credential and leaves the session signed out: an invalid credential
    /// must never leave stale profile data accessible. The caller purges
    /// the cached cart in that case for the same reason.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Option<Identity> {
        let stored = self.inner.credentials.load()?;
        self.inner
            .gateway
            .install_credential(Some(stored.token.clone()));

        match self.inner.gateway.current_identity().await {
            Ok(identity) => {
                self.inner.credentials.save(&StoredCredential {
                    token: stored.token,
                    identity: identity.clone(),
                });
                self.set_identity(Some(identity.clone()));
                info!(user = %identity.username, "session restored");
                Some(identity)
            }
            Err(e) => {
                warn!("session restore failed, discarding credential: {e}");
                self.inner.credentials.clear();
                self.inner.gateway.install_credential(None);
                self.set_identity(None);
                None
            }
        }
    }

    /// Exchange a username (or email) and password for a new session.
    ///
    /// Returns the identity so the caller can decide where to navigate.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidCredentials`] for a rejected login;
    /// other gateway failures are propagated unchanged.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<Identity, SessionError> {
        let session = self
            .inner
            .gateway
            .login(username_or_email, password)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized => SessionError::InvalidCredentials,
                other => SessionError::Api(other),
            })?;

        self.begin_session(session.identity.clone(), session.token);
        info!(user = %session.identity.username, "logged in");
        Ok(session.identity)
    }

    /// Create a new account; otherwise identical contract to `login`.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote API rejects the registration.
    #[instrument(skip(self, request))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<Identity, SessionError> {
        let session = self.inner.gateway.register(request).await?;

        self.begin_session(session.identity.clone(), session.token);
        info!(user = %session.identity.username, "registered");
        Ok(session.identity)
    }

    /// Discard the persisted credential and clear the identity.
    ///
    /// Idempotent and terminal for the session. The caller must clear the
    /// cart immediately afterwards; a populated cart must never remain
    /// under a cleared identity.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        self.inner.credentials.clear();
        self.inner.gateway.install_credential(None);
        self.set_identity(None);
        info!("logged out");
    }

    /// Forced logout: a gateway call reported the credential invalid.
    ///
    /// Same effect as [`logout`](Self::logout) minus any remote round trip.
    #[instrument(skip(self))]
    pub fn invalidate(&self) {
        warn!("credential invalidated, forcing logout");
        self.logout();
    }

    /// Persist a profile mutation and replace the identity (in memory and
    /// its persisted mirror).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] without a current
    /// session; gateway failures (including an expired credential) are
    /// propagated unchanged.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, SessionError> {
        if !self.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }

        let identity = self.inner.gateway.update_profile(update).await?;

        if let Some(stored) = self.inner.credentials.load() {
            self.inner.credentials.save(&StoredCredential {
                token: stored.token,
                identity: identity.clone(),
            });
        }
        self.set_identity(Some(identity.clone()));
        Ok(identity)
    }

    fn begin_session(&self, identity: Identity, token: secrecy::SecretString) {
        self.inner.credentials.save(&StoredCredential {
            token: token.clone(),
            identity: identity.clone(),
        });
        self.inner.gateway.install_credential(Some(token));
        self.set_identity(Some(identity));
    }

    fn set_identity(&self, identity: Option<Identity>) {
        self.inner.identity_tx.send_replace(identity);
    }
}
