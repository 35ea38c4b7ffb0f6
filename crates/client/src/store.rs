//! Process-wide session state
//!
//! [`TokenStore`] is the single source of truth for the current [`Session`].
//! Every mutation replaces the whole value, is published to subscribers, and
//! is written through to the configured [`SessionStorage`].

use crate::storage::{SESSION_STORAGE_KEY, SessionStorage};
use portal_core::{Session, TokenPair, UserProfile};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Shared handle to the session; clones observe the same state
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: watch::Sender<Session>,
    storage: Arc<dyn SessionStorage>,
}

impl TokenStore {
    /// Create a store, restoring whatever session `storage` holds
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Self {
        let session = load_session(storage.as_ref());
        let (state, _) = watch::channel(session);
        Self {
            inner: Arc::new(StoreInner { state, storage }),
        }
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token().map(str::to_string)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.state.borrow().refresh_token().map(str::to_string)
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Receive every future session value
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Replace the stored credentials; the cached profile is left alone
    pub fn set_tokens(&self, tokens: Option<TokenPair>) {
        self.replace(|current| Session {
            tokens,
            user: current.user.clone(),
        });
    }

    /// Replace the cached profile
    pub fn set_user(&self, user: Option<UserProfile>) {
        self.replace(|current| Session {
            tokens: current.tokens.clone(),
            user,
        });
    }

    /// Drop both credentials and profile in one step
    pub fn clear(&self) {
        self.replace(|_| Session::default());
    }

    /// Apply a mutation and write it through to storage.
    ///
    /// The write happens while the session's write lock is held, so storage
    /// always ends up with the last mutation. Backends are synchronous;
    /// [`crate::FileStorage`] blocks the calling thread for one small file
    /// write, which is fine for a CLI but worth knowing when embedding the
    /// store in a busy async service.
    fn replace(&self, next: impl FnOnce(&Session) -> Session) {
        let storage = self.inner.storage.as_ref();
        self.inner.state.send_modify(|session| {
            *session = next(session);
            persist_session(storage, session);
        });
    }
}

fn load_session(storage: &dyn SessionStorage) -> Session {
    match storage.load(SESSION_STORAGE_KEY) {
        Ok(Some(raw)) => match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                debug!(
                    has_tokens = session.tokens.is_some(),
                    has_user = session.user.is_some(),
                    "Restored persisted session"
                );
                session
            }
            Err(err) => {
                warn!(error = %err, "Discarding unreadable persisted session");
                Session::default()
            }
        },
        Ok(None) => Session::default(),
        Err(err) => {
            warn!(error = %err, "Failed to read persisted session");
            Session::default()
        }
    }
}

fn persist_session(storage: &dyn SessionStorage, session: &Session) {
    let result = if session == &Session::default() {
        storage.remove(SESSION_STORAGE_KEY)
    } else {
        match serde_json::to_string(session) {
            Ok(serialized) => storage.save(SESSION_STORAGE_KEY, &serialized),
            Err(err) => {
                warn!(error = %err, "Failed to serialize session");
                return;
            }
        }
    };

    if let Err(err) = result {
        warn!(error = %err, "Failed to persist session");
    }
}
