//! Auth context, guard and user directory against a mock backend

mod common;

use common::{client_for, client_with_session, profile, profile_json, session, tokens_json};
use portal_client::{
    ApiClient, AuthContext, AuthStatus, ClientError, CreateUserRequest, DirectoryView, FileStorage,
    GuardDecision, LoginRequest, RegisterRequest, Route, SessionGuard, TokenStore,
    UpdateUserRequest, UserDirectory, ValidationError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn guard_for(client: ApiClient) -> SessionGuard {
    SessionGuard::new(AuthContext::new(client))
}

#[tokio::test]
async fn login_then_profile_makes_session_authenticated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_json("a1", "r1")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(profile_json("u1", "a@b.com", false)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let guard = guard_for(client_for(&mock_server));
    let auth = guard.auth();

    assert_eq!(auth.status(), AuthStatus::Initializing);
    assert_eq!(auth.initialize().await, AuthStatus::Unauthenticated);
    assert_eq!(guard.check(&Route::DASHBOARD), GuardDecision::Redirect("/login"));

    let user = auth
        .login(&LoginRequest {
            email: "a@b.com".into(),
            password: "secret".into(),
        })
        .await
        .unwrap();

    assert_eq!(user.id, "u1");
    assert_eq!(auth.status(), AuthStatus::Authenticated);
    assert_eq!(guard.check(&Route::DASHBOARD), GuardDecision::Render);

    auth.logout();
    assert_eq!(auth.status(), AuthStatus::Unauthenticated);
}

#[tokio::test]
async fn invalid_forms_never_reach_the_network() {
    let mock_server = MockServer::start().await;
    let auth = AuthContext::new(client_for(&mock_server));

    let err = auth
        .login(&LoginRequest {
            email: String::new(),
            password: "secret".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(ValidationError::Required("Email"))));

    let err = auth
        .register(&RegisterRequest {
            email: "a@b.com".into(),
            password: "123".into(),
            full_name: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.user_message("Registration failed"), "Password must be at least 6 characters");

    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn register_stores_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({"email": "new@b.com", "password": "secret1", "full_name": "New"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_json("a1", "r1")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(profile_json("u9", "new@b.com", false)),
        )
        .mount(&mock_server)
        .await;

    let auth = AuthContext::new(client_for(&mock_server));
    auth.register(&RegisterRequest {
        email: "new@b.com".into(),
        password: "secret1".into(),
        full_name: Some("New".into()),
    })
    .await
    .unwrap();

    assert!(auth.is_authenticated());
    assert_eq!(auth.user().unwrap().id, "u9");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn guard_shows_loading_until_profile_resolves() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(profile_json("u1", "a@b.com", true))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let guard = guard_for(client_with_session(&mock_server, session("a1", "r1", None)));
    let mut statuses = guard.auth().subscribe_status();

    let auth = guard.auth().clone();
    let resolving = tokio::spawn(async move { auth.initialize().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(guard.check(&Route::DASHBOARD), GuardDecision::Loading);
    assert_eq!(guard.check(&Route::USERS), GuardDecision::Loading);

    assert_eq!(resolving.await.unwrap(), AuthStatus::Authenticated);
    assert_eq!(guard.check(&Route::USERS), GuardDecision::Render);

    let status = statuses
        .wait_for(|status| *status != AuthStatus::Initializing)
        .await
        .unwrap();
    assert_eq!(*status, AuthStatus::Authenticated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn status_subscription_racing_initialize_sees_the_outcome() {
    let mock_server = MockServer::start().await;
    let user = profile("u1", "a@b.com", false);

    for _ in 0..500 {
        let client = client_with_session(&mock_server, session("a1", "r1", Some(user.clone())));
        let auth = AuthContext::new(client);

        let resolving = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.initialize().await })
        };
        let mut statuses = auth.subscribe_status();

        let status = tokio::time::timeout(
            Duration::from_secs(2),
            statuses.wait_for(|status| *status == AuthStatus::Authenticated),
        )
        .await
        .expect("status update was lost")
        .unwrap();
        assert_eq!(*status, AuthStatus::Authenticated);
        drop(status);

        assert_eq!(resolving.await.unwrap(), AuthStatus::Authenticated);
    }
}

#[tokio::test]
async fn failed_profile_resolution_clears_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let guard = guard_for(client_with_session(&mock_server, session("a1", "r1", None)));

    assert_eq!(guard.auth().initialize().await, AuthStatus::Unauthenticated);
    assert!(guard.auth().store().session().tokens.is_none());
    assert_eq!(guard.check(&Route::DASHBOARD), GuardDecision::Redirect("/login"));
}

#[tokio::test]
async fn restored_profile_skips_the_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let user = profile("u1", "a@b.com", false);
    let auth = AuthContext::new(client_with_session(&mock_server, session("a1", "r1", Some(user))));
    assert_eq!(auth.initialize().await, AuthStatus::Authenticated);
}

#[tokio::test]
async fn session_survives_restart() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_json("a1", "r1")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(profile_json("u1", "a@b.com", false)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let build = || {
        let store = TokenStore::restore(Arc::new(FileStorage::new(dir.path())));
        let client = ApiClient::builder()
            .base_url(mock_server.uri())
            .store(store)
            .build()
            .unwrap();
        AuthContext::new(client)
    };

    let auth = build();
    auth.login(&LoginRequest {
        email: "a@b.com".into(),
        password: "secret".into(),
    })
    .await
    .unwrap();

    let restarted = build();
    assert_eq!(restarted.store().access_token().as_deref(), Some("a1"));
    assert_eq!(restarted.initialize().await, AuthStatus::Authenticated);
}

#[tokio::test]
async fn non_superuser_is_redirected_without_listing_users() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let user = profile("u1", "a@b.com", false);
    let guard = guard_for(client_with_session(&mock_server, session("a1", "r1", Some(user))));
    guard.auth().initialize().await;

    let directory = UserDirectory::new(guard);
    let view = directory.open().await.unwrap();
    assert_eq!(view, DirectoryView::Blocked(GuardDecision::Redirect("/dashboard")));
}

#[tokio::test]
async fn delete_invalidates_and_refetches_the_list() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            profile_json("admin", "admin@b.com", true),
            profile_json("u1", "a@b.com", false),
        ])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([profile_json("admin", "admin@b.com", true)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/users/u1"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let admin = profile("admin", "admin@b.com", true);
    let guard = guard_for(client_with_session(&mock_server, session("a1", "r1", Some(admin))));
    guard.auth().initialize().await;

    let directory = UserDirectory::new(guard);
    let DirectoryView::Ready(users) = directory.open().await.unwrap() else {
        panic!("superuser should see the user list");
    };
    assert_eq!(users.len(), 2);

    // A second open is served from the cache.
    directory.open().await.unwrap();

    directory.delete("u1").await.unwrap();
    let cached = directory.cached().unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].id, "admin");
}

#[tokio::test]
async fn create_reports_backend_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Email already registered"})),
        )
        .mount(&mock_server)
        .await;

    let admin = profile("admin", "admin@b.com", true);
    let guard = guard_for(client_with_session(&mock_server, session("a1", "r1", Some(admin))));
    let directory = UserDirectory::new(guard);

    let err = directory
        .create(&CreateUserRequest {
            email: "a@b.com".into(),
            password: "secret".into(),
            full_name: None,
            is_active: Some(true),
            is_superuser: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.user_message("Unable to create user."), "Email already registered");
    assert!(directory.cached().is_none());
}

fn admin_directory(server: &MockServer) -> UserDirectory {
    let admin = profile("admin", "admin@b.com", true);
    UserDirectory::new(guard_for(client_with_session(server, session("a1", "r1", Some(admin)))))
}

#[tokio::test]
async fn create_reloads_the_list() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users/"))
        .and(body_json(json!({"email": "new@b.com", "password": "secret1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(profile_json("u2", "new@b.com", false)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            profile_json("admin", "admin@b.com", true),
            profile_json("u2", "new@b.com", false),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let directory = admin_directory(&mock_server);
    let created = directory
        .create(&CreateUserRequest {
            email: "new@b.com".into(),
            password: "secret1".into(),
            full_name: None,
            is_active: None,
            is_superuser: None,
        })
        .await
        .unwrap();

    assert_eq!(created.id, "u2");
    let cached = directory.cached().unwrap();
    assert_eq!(cached.len(), 2);
    assert!(cached.iter().any(|user| user.id == "u2"));
}

#[tokio::test]
async fn update_reloads_the_list() {
    let mock_server = MockServer::start().await;

    let mut renamed = profile_json("u1", "a@b.com", false);
    renamed["full_name"] = json!("Renamed");

    Mock::given(method("PATCH"))
        .and(path("/users/u1"))
        .and(body_json(json!({"full_name": "Renamed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(renamed.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            profile_json("admin", "admin@b.com", true),
            renamed,
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let directory = admin_directory(&mock_server);
    let updated = directory
        .update(
            "u1",
            &UpdateUserRequest {
                full_name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.full_name.as_deref(), Some("Renamed"));
    let cached = directory.cached().unwrap();
    let user = cached.iter().find(|user| user.id == "u1").unwrap();
    assert_eq!(user.full_name.as_deref(), Some("Renamed"));
}

#[tokio::test]
async fn failed_reload_keeps_mutation_result_and_empty_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([profile_json("admin", "admin@b.com", true)])),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(profile_json("u2", "new@b.com", false)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let directory = admin_directory(&mock_server);
    assert_eq!(directory.users().await.unwrap().len(), 1);
    assert!(directory.cached().is_some());

    let created = directory
        .create(&CreateUserRequest {
            email: "new@b.com".into(),
            password: "secret1".into(),
            full_name: None,
            is_active: None,
            is_superuser: None,
        })
        .await
        .unwrap();

    assert_eq!(created.id, "u2");
    assert!(directory.cached().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_fetch_does_not_overwrite_a_newer_reload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    profile_json("admin", "admin@b.com", true),
                    profile_json("u1", "a@b.com", false),
                ]))
                .set_delay(Duration::from_millis(400)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([profile_json("admin", "admin@b.com", true)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/users/u1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let directory = admin_directory(&mock_server);
    let slow = {
        let directory = directory.clone();
        tokio::spawn(async move { directory.users().await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    directory.delete("u1").await.unwrap();
    assert_eq!(directory.cached().unwrap().len(), 1);

    // The stale caller still gets its own answer.
    assert_eq!(slow.await.unwrap().unwrap().len(), 2);

    let cached = directory.cached().unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].id, "admin");
}
