//! Shared fixtures for the client integration tests

#![allow(dead_code)]

use portal_client::{ApiClient, MemoryStorage, Session, TokenPair, TokenStore, UserProfile};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::MockServer;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("portal_client=debug")
        .with_test_writer()
        .try_init();
}

pub fn profile_json(id: &str, email: &str, is_superuser: bool) -> Value {
    json!({
        "id": id,
        "email": email,
        "full_name": null,
        "is_active": true,
        "is_superuser": is_superuser,
        "created_at": "2024-05-01T12:00:00Z",
        "updated_at": "2024-05-01T12:00:00Z"
    })
}

pub fn profile(id: &str, email: &str, is_superuser: bool) -> UserProfile {
    serde_json::from_value(profile_json(id, email, is_superuser)).unwrap()
}

pub fn tokens_json(access: &str, refresh: &str) -> Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer"
    })
}

/// Client against `server` with an empty in-memory session
pub fn client_for(server: &MockServer) -> ApiClient {
    client_with_session(server, Session::default())
}

/// Client against `server` whose session starts as `session`
pub fn client_with_session(server: &MockServer, session: Session) -> ApiClient {
    let store = TokenStore::restore(Arc::new(MemoryStorage::new()));
    store.set_tokens(session.tokens);
    store.set_user(session.user);

    ApiClient::builder()
        .base_url(server.uri())
        .store(store)
        .build()
        .unwrap()
}

pub fn session(access: &str, refresh: &str, user: Option<UserProfile>) -> Session {
    Session {
        tokens: Some(TokenPair::new(access, refresh)),
        user,
    }
}
