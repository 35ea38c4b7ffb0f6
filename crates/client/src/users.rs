//! User management for superusers
//!
//! Keeps a cached copy of the user list. Every successful mutation
//! invalidates the cache and fetches the list again.

use crate::auth::{GuardDecision, Route, SessionGuard};
use crate::client::ApiClient;
use crate::error::ClientError;
use portal_core::{CreateUserRequest, UpdateUserRequest, UserProfile, Validate};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Result of opening the user management area
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryView {
    /// The guard did not let the navigation through
    Blocked(GuardDecision),
    /// Current user list
    Ready(Vec<UserProfile>),
}

#[derive(Clone)]
pub struct UserDirectory {
    guard: SessionGuard,
    cache: Arc<Mutex<UserCache>>,
}

/// Cached list plus a generation bumped on every invalidation
#[derive(Default)]
struct UserCache {
    generation: u64,
    users: Option<Vec<UserProfile>>,
}

impl UserDirectory {
    pub fn new(guard: SessionGuard) -> Self {
        Self {
            guard,
            cache: Arc::new(Mutex::new(UserCache::default())),
        }
    }

    fn client(&self) -> &ApiClient {
        self.guard.auth().client()
    }

    /// Navigate to the user management route.
    ///
    /// The guard runs first; if it does not render, no request is made.
    pub async fn open(&self) -> Result<DirectoryView, ClientError> {
        match self.guard.check(&Route::USERS) {
            GuardDecision::Render => Ok(DirectoryView::Ready(self.users().await?)),
            decision => {
                debug!(?decision, "User management blocked by guard");
                Ok(DirectoryView::Blocked(decision))
            }
        }
    }

    /// The cached list, fetching it if needed
    pub async fn users(&self) -> Result<Vec<UserProfile>, ClientError> {
        if let Some(users) = self.cached() {
            return Ok(users);
        }
        self.fetch().await
    }

    /// Cached list without touching the network
    pub fn cached(&self) -> Option<Vec<UserProfile>> {
        self.lock_cache().users.clone()
    }

    /// Forget the cached list; fetches already in flight will not repopulate it
    pub fn invalidate(&self) {
        let mut cache = self.lock_cache();
        cache.generation += 1;
        cache.users = None;
    }

    pub async fn create(&self, request: &CreateUserRequest) -> Result<UserProfile, ClientError> {
        request.validate()?;
        let user = self.client().create_user(request).await?;
        info!(user_id = %user.id, "Created user");
        self.refresh_cache().await;
        Ok(user)
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateUserRequest,
    ) -> Result<UserProfile, ClientError> {
        request.validate()?;
        let user = self.client().update_user(id, request).await?;
        info!(user_id = %user.id, "Updated user");
        self.refresh_cache().await;
        Ok(user)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.client().delete_user(id).await?;
        info!(user_id = %id, "Deleted user");
        self.refresh_cache().await;
        Ok(())
    }

    async fn fetch(&self) -> Result<Vec<UserProfile>, ClientError> {
        let started = self.lock_cache().generation;
        let users = self.client().list_users().await?;

        let mut cache = self.lock_cache();
        if cache.generation == started {
            debug!(count = users.len(), "Fetched user list");
            cache.users = Some(users.clone());
        } else {
            debug!(count = users.len(), "Discarding user list fetched before an invalidation");
        }
        Ok(users)
    }

    fn lock_cache(&self) -> MutexGuard<'_, UserCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn refresh_cache(&self) {
        self.invalidate();
        if let Err(err) = self.fetch().await {
            warn!(error = %err, "Failed to reload user list");
        }
    }
}
