//! Session-aware client for the Portal REST API
//!
//! Credentials live in a [`TokenStore`] that persists across restarts.
//! [`ApiClient`] attaches them to every request and transparently renews an
//! expired access token once per request, with at most one renewal in flight
//! at a time. [`AuthContext`] and [`SessionGuard`] decide what the current
//! session may see, and [`UserDirectory`] is the superuser area.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod refresh;
pub mod storage;
pub mod store;
pub mod users;

pub use auth::{AuthContext, AuthStatus, GuardDecision, Route, SessionGuard};
pub use client::{ApiClient, ApiClientBuilder, ApiRequest};
pub use config::ClientConfig;
pub use error::{ClientError, RefreshError};
pub use refresh::RefreshCoordinator;
pub use storage::{FileStorage, MemoryStorage, SESSION_STORAGE_KEY, SessionStorage};
pub use store::TokenStore;
pub use users::{DirectoryView, UserDirectory};

pub use portal_core::{
    CreateUserRequest, LoginRequest, RegisterRequest, Session, TokenPair, UpdateUserRequest,
    UserProfile, ValidationError,
};
