//! Authentication context: who is logged in and how they got there

use crate::client::ApiClient;
use crate::error::ClientError;
use crate::store::TokenStore;
use portal_core::{LoginRequest, RegisterRequest, Session, UserProfile, Validate};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Where the session currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// A restored token is still being resolved into a profile
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// Authentication context shared by everything that needs the session
#[derive(Clone)]
pub struct AuthContext {
    client: ApiClient,
    initializing: Arc<watch::Sender<bool>>,
}

impl AuthContext {
    /// Create a context; it reports [`AuthStatus::Initializing`] until
    /// [`AuthContext::initialize`] has run
    pub fn new(client: ApiClient) -> Self {
        let (initializing, _) = watch::channel(true);
        Self {
            client,
            initializing: Arc::new(initializing),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn store(&self) -> &TokenStore {
        self.client.store()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.store().user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store().is_authenticated()
    }

    pub fn is_initializing(&self) -> bool {
        *self.initializing.borrow()
    }

    pub fn status(&self) -> AuthStatus {
        status_of(self.is_initializing(), &self.store().session())
    }

    /// Status updates, recomputed whenever the session or the
    /// initializing flag changes. Must be called within a tokio runtime.
    pub fn subscribe_status(&self) -> watch::Receiver<AuthStatus> {
        // Subscribe before reading so a change in between is not marked seen.
        let mut sessions = self.store().subscribe();
        let mut initializing = self.initializing.subscribe();
        let current = status_of(
            *initializing.borrow_and_update(),
            &sessions.borrow_and_update(),
        );
        let (tx, rx) = watch::channel(current);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = sessions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = initializing.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    () = tx.closed() => break,
                }
                let status = status_of(
                    *initializing.borrow_and_update(),
                    &sessions.borrow_and_update(),
                );
                tx.send_if_modified(|current| {
                    let changed = *current != status;
                    *current = status;
                    changed
                });
            }
        });

        rx
    }

    /// Resolve a restored session.
    ///
    /// A persisted access token without a cached profile triggers a fetch of
    /// `/users/me`; if that fails the session is cleared. Without an access
    /// token any cached profile is dropped.
    pub async fn initialize(&self) -> AuthStatus {
        self.initializing.send_replace(true);
        let session = self.store().session();

        if session.access_token().is_some() && session.user.is_none() {
            debug!("Resolving profile for restored session");
            match self.client.current_user().await {
                Ok(profile) => self.store().set_user(Some(profile)),
                Err(err) => {
                    warn!(error = %err, "Restored session is no longer valid");
                    self.store().clear();
                }
            }
        } else if session.access_token().is_none() && session.user.is_some() {
            self.store().set_user(None);
        }

        self.initializing.send_replace(false);
        self.status()
    }

    /// Log in and load the profile for the new session
    pub async fn login(&self, request: &LoginRequest) -> Result<UserProfile, ClientError> {
        request.validate()?;
        let tokens = self.client.login(request).await?;
        self.store().set_tokens(Some(tokens));
        let profile = self.load_profile().await?;
        info!(user_id = %profile.id, "Logged in");
        Ok(profile)
    }

    /// Create an account, then behave like a login
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ClientError> {
        request.validate()?;
        let tokens = self.client.register(request).await?;
        self.store().set_tokens(Some(tokens));
        let profile = self.load_profile().await?;
        info!(user_id = %profile.id, "Registered");
        Ok(profile)
    }

    pub fn logout(&self) {
        self.store().clear();
        info!("Logged out");
    }

    async fn load_profile(&self) -> Result<UserProfile, ClientError> {
        let profile = self.client.current_user().await?;
        self.store().set_user(Some(profile.clone()));
        Ok(profile)
    }
}

fn status_of(initializing: bool, session: &Session) -> AuthStatus {
    if initializing {
        AuthStatus::Initializing
    } else if session.is_authenticated() {
        AuthStatus::Authenticated
    } else {
        AuthStatus::Unauthenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::TokenPair;

    #[test]
    fn status_follows_session() {
        let mut session = Session::default();
        assert_eq!(status_of(true, &session), AuthStatus::Initializing);
        assert_eq!(status_of(false, &session), AuthStatus::Unauthenticated);

        session.tokens = Some(TokenPair::new("a", "r"));
        assert_eq!(status_of(false, &session), AuthStatus::Unauthenticated);
    }
}
