//! Single-flight access token renewal
//!
//! However many requests notice an expired access token at the same time, at
//! most one call to `/auth/refresh` is outstanding. The in-flight call is kept
//! in a slot as a [`Shared`] future: the first trigger creates it, later
//! triggers clone and await it, and everyone observes the same outcome.

use crate::error::{RefreshError, extract_error_message};
use crate::store::TokenStore;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use portal_core::{RefreshRequest, TokenPair};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Path of the renewal endpoint
pub const REFRESH_PATH: &str = "/auth/refresh";

type PendingRefresh = Shared<BoxFuture<'static, Result<TokenPair, RefreshError>>>;

/// Deduplicates concurrent refresh attempts
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    http: reqwest::Client,
    refresh_url: String,
    store: TokenStore,
    pending: Mutex<Option<PendingRefresh>>,
    calls: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(http: reqwest::Client, base_url: &str, store: TokenStore) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                http,
                refresh_url: format!("{base_url}{REFRESH_PATH}"),
                store,
                pending: Mutex::new(None),
                calls: AtomicU64::new(0),
            }),
        }
    }

    /// Number of refresh network calls issued so far
    pub fn refresh_calls(&self) -> u64 {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Whether a refresh call is currently in flight
    pub fn is_pending(&self) -> bool {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Obtain a renewed token pair.
    ///
    /// `stale_access_token` is the token the failed request was sent with. If
    /// the store already holds a different one, a refresh cycle completed
    /// after that request left and its result is returned directly.
    ///
    /// On failure the session has been cleared by the time this returns.
    pub async fn refresh(
        &self,
        stale_access_token: Option<&str>,
    ) -> Result<TokenPair, RefreshError> {
        let pending = {
            let mut slot = self
                .inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if let Some(pending) = slot.as_ref() {
                debug!("Joining in-flight token refresh");
                pending.clone()
            } else {
                let session = self.inner.store.session();

                if let (Some(stale), Some(current)) = (stale_access_token, session.access_token())
                {
                    if stale != current {
                        if let Some(tokens) = &session.tokens {
                            debug!("Access token already renewed, skipping refresh");
                            return Ok(tokens.clone());
                        }
                    }
                }

                let Some(refresh_token) = session.refresh_token().map(str::to_string) else {
                    drop(slot);
                    warn!("No refresh token available; clearing session");
                    self.inner.store.clear();
                    return Err(RefreshError::MissingRefreshToken);
                };

                let pending = run_refresh(self.inner.clone(), refresh_token)
                    .boxed()
                    .shared();
                *slot = Some(pending.clone());
                pending
            }
        };

        pending.await
    }
}

async fn run_refresh(
    inner: Arc<CoordinatorInner>,
    refresh_token: String,
) -> Result<TokenPair, RefreshError> {
    inner.calls.fetch_add(1, Ordering::SeqCst);
    debug!(url = %inner.refresh_url, "Refreshing access token");

    let outcome = request_tokens(&inner.http, &inner.refresh_url, refresh_token).await;
    match &outcome {
        Ok(tokens) => {
            inner.store.set_tokens(Some(tokens.clone()));
            info!("Access token refreshed");
        }
        Err(err) => {
            warn!(error = %err, "Token refresh failed; clearing session");
            inner.store.clear();
        }
    }

    // Release the slot so the next expiry starts a fresh cycle.
    *inner
        .pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = None;

    outcome
}

async fn request_tokens(
    http: &reqwest::Client,
    url: &str,
    refresh_token: String,
) -> Result<TokenPair, RefreshError> {
    let response = http
        .post(url)
        .json(&RefreshRequest { refresh_token })
        .send()
        .await
        .map_err(|err| RefreshError::Transport(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body).unwrap_or_else(|| status.to_string());
        return Err(RefreshError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<TokenPair>()
        .await
        .map_err(|err| RefreshError::Decode(err.to_string()))
}
