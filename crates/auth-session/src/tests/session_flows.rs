//! Password flows, credential handling and the cached current user.

use super::harness::{auth_body, user_json, TestHarness};
use crate::{AuthError, AuthSnapshot};
use credential_storage::{ClientStorage, StorageKeys};
use httpmock::prelude::*;
use serde_json::json;

#[tokio::test]
async fn no_credential_means_no_request_and_no_user() {
    let h = TestHarness::new().await;
    let me = h
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/me");
            then.status(200)
                .json_body(json!({ "success": true, "data": user_json("u1") }));
        })
        .await;

    assert!(!h.session.hydrate().unwrap());
    assert_eq!(h.session.current_user().await.unwrap(), None);
    me.assert_calls_async(0).await;
}

#[tokio::test]
async fn login_seeds_user_without_refetch() {
    let h = TestHarness::new().await;
    let login = h
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/login").json_body(json!({
                "email": "u1@example.com",
                "password": "hunter2",
                "recaptcha_token": "proof-1"
            }));
            then.status(200).json_body(auth_body("tok-1", "u1"));
        })
        .await;
    let me = h
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/me");
            then.status(200)
                .json_body(json!({ "success": true, "data": user_json("other") }));
        })
        .await;

    let user = h
        .session
        .login("u1@example.com", "hunter2", Some("proof-1"))
        .await
        .unwrap();
    assert_eq!(user.id, "u1");

    assert_eq!(
        h.storage.get(StorageKeys::AUTH_TOKEN).unwrap(),
        Some("tok-1".to_string())
    );
    let cached = h.session.current_user().await.unwrap().unwrap();
    assert_eq!(cached.id, "u1");

    login.assert_async().await;
    me.assert_calls_async(0).await;
    assert!(h.navigator.visited().is_empty());
}

#[tokio::test]
async fn login_401_is_returned_without_teardown_redirect() {
    let h = TestHarness::new().await;
    h.server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(401)
                .json_body(json!({ "detail": "Invalid email or password" }));
        })
        .await;

    let err = h
        .session
        .login("u1@example.com", "wrong", None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AuthError::Api { status: 401, ref message } if message == "Invalid email or password"
    ));
    assert!(!h.storage.has(StorageKeys::AUTH_TOKEN).unwrap());
    assert!(h.navigator.visited().is_empty());
}

#[tokio::test]
async fn register_401_is_returned_without_teardown_redirect() {
    let h = TestHarness::new().await;
    h.server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/register");
            then.status(401).json_body(json!({ "message": "Verification failed" }));
        })
        .await;

    let err = h
        .session
        .register("u1@example.com", "pw", "Test User", None)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(!h.storage.has(StorageKeys::AUTH_TOKEN).unwrap());
    assert!(h.navigator.visited().is_empty());
}

#[tokio::test]
async fn failed_login_keeps_existing_session() {
    let h = TestHarness::new().await;
    h.storage.set(StorageKeys::AUTH_TOKEN, "tok").unwrap();
    assert!(h.session.hydrate().unwrap());
    h.server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(401)
                .json_body(json!({ "detail": "Invalid email or password" }));
        })
        .await;

    let err = h
        .session
        .login("someone@example.com", "wrong", None)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(
        h.storage.get(StorageKeys::AUTH_TOKEN).unwrap(),
        Some("tok".to_string())
    );
    assert_eq!(
        h.session.context().credentials().get().unwrap(),
        Some("tok".to_string())
    );
    assert!(h.navigator.visited().is_empty());
}

#[tokio::test]
async fn token_written_by_another_owner_is_used() {
    let h = TestHarness::new().await;
    let me = h
        .server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/me")
                .header("authorization", "Bearer tok-other");
            then.status(200)
                .json_body(json!({ "success": true, "data": user_json("u2") }));
        })
        .await;

    assert_eq!(h.session.current_user().await.unwrap(), None);

    h.storage.set(StorageKeys::AUTH_TOKEN, "tok-other").unwrap();
    let user = h.session.current_user().await.unwrap().unwrap();

    assert_eq!(user.id, "u2");
    me.assert_calls_async(1).await;
}

#[tokio::test]
async fn register_success_establishes_session() {
    let h = TestHarness::new().await;
    h.server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/register").json_body(json!({
                "email": "new@example.com",
                "password": "pw",
                "name": "New User"
            }));
            then.status(201).json_body(auth_body("tok-new", "new"));
        })
        .await;

    let user = h
        .session
        .register("new@example.com", "pw", "New User", None)
        .await
        .unwrap();

    assert_eq!(user.id, "new");
    assert_eq!(
        h.session.status().unwrap(),
        AuthSnapshot {
            authenticated: true,
            user: Some(user),
        }
    );
}

#[tokio::test]
async fn rejected_envelope_surfaces_message() {
    let h = TestHarness::new().await;
    h.server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(200).json_body(json!({
                "success": false,
                "data": null,
                "message": "Account disabled"
            }));
        })
        .await;

    let err = h.session.login("u1@example.com", "pw", None).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected(ref m) if m == "Account disabled"));
    assert!(!h.session.status().unwrap().authenticated);
}

#[tokio::test]
async fn protected_401_tears_down_and_redirects() {
    let h = TestHarness::new().await;
    h.storage.set(StorageKeys::AUTH_TOKEN, "expired").unwrap();
    h.session.hydrate().unwrap();

    let change = h
        .server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/change-password")
                .header("authorization", "Bearer expired")
                .json_body(json!({ "current_password": "old", "new_password": "new" }));
            then.status(401).json_body(json!({ "detail": "Token expired" }));
        })
        .await;

    let err = h.session.change_password("old", "new").await.unwrap_err();

    assert!(matches!(err, AuthError::SessionExpired));
    change.assert_async().await;
    assert!(!h.storage.has(StorageKeys::AUTH_TOKEN).unwrap());
    assert_eq!(h.session.status().unwrap().user, None);
    assert_eq!(
        h.navigator.last(),
        Some(h.login_url("reason=session-expired"))
    );
}

#[tokio::test]
async fn current_user_401_tears_down() {
    let h = TestHarness::new().await;
    h.storage.set(StorageKeys::AUTH_TOKEN, "expired").unwrap();

    h.server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/me");
            then.status(401);
        })
        .await;

    let err = h.session.current_user().await.unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired));
    assert!(!h.session.status().unwrap().authenticated);
    assert_eq!(
        h.navigator.last(),
        Some(h.login_url("reason=session-expired"))
    );
}

#[tokio::test]
async fn hydrated_credential_fetches_user_once() {
    let h = TestHarness::new().await;
    h.storage.set(StorageKeys::AUTH_TOKEN, "persisted").unwrap();

    let me = h
        .server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/me")
                .header("authorization", "Bearer persisted");
            then.status(200)
                .json_body(json!({ "success": true, "data": user_json("u1") }));
        })
        .await;

    assert!(h.session.hydrate().unwrap());
    assert_eq!(h.session.status().unwrap().user, None);

    let first = h.session.current_user().await.unwrap();
    let second = h.session.current_user().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.unwrap().id, "u1");
    me.assert_calls_async(1).await;
}

#[tokio::test]
async fn logout_then_query_makes_no_request() {
    let h = TestHarness::new().await;
    h.server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(200).json_body(auth_body("tok-1", "u1"));
        })
        .await;
    let me = h
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/me");
            then.status(200)
                .json_body(json!({ "success": true, "data": user_json("u1") }));
        })
        .await;

    h.session.login("u1@example.com", "pw", None).await.unwrap();
    h.session.logout();

    assert_eq!(h.session.current_user().await.unwrap(), None);
    assert!(!h.storage.has(StorageKeys::AUTH_TOKEN).unwrap());
    assert_eq!(
        h.session.status().unwrap(),
        AuthSnapshot {
            authenticated: false,
            user: None,
        }
    );
    me.assert_calls_async(0).await;
    assert!(h.navigator.visited().is_empty());
}

#[tokio::test]
async fn stale_entry_is_refetched() {
    let h = TestHarness::with_config(crate::HumanVerificationGate::disabled(), |config| {
        config.user_cache.fresh_secs = 0;
    })
    .await;
    h.server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(200).json_body(auth_body("tok-1", "u1"));
        })
        .await;
    let me = h
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/me");
            then.status(200).json_body(json!({
                "success": true,
                "data": {
                    "id": "u1",
                    "email": "u1@example.com",
                    "name": "Renamed",
                    "created_at": "2024-01-01T00:00:00Z",
                    "is_active": true
                }
            }));
        })
        .await;

    h.session.login("u1@example.com", "pw", None).await.unwrap();
    let user = h.session.current_user().await.unwrap().unwrap();

    assert_eq!(user.name.as_deref(), Some("Renamed"));
    assert_eq!(
        h.session.status().unwrap().user.unwrap().name.as_deref(),
        Some("Renamed")
    );
    me.assert_calls_async(1).await;
}

#[tokio::test]
async fn failed_refetch_keeps_stale_entry() {
    let h = TestHarness::with_config(crate::HumanVerificationGate::disabled(), |config| {
        config.user_cache.fresh_secs = 0;
    })
    .await;
    h.server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(200).json_body(auth_body("tok-1", "u1"));
        })
        .await;
    h.server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/me");
            then.status(503).body("maintenance");
        })
        .await;

    h.session.login("u1@example.com", "pw", None).await.unwrap();
    let err = h.session.current_user().await.unwrap_err();

    assert!(err.is_transient());
    let snapshot = h.session.status().unwrap();
    assert!(snapshot.authenticated);
    assert_eq!(snapshot.user.unwrap().id, "u1");
}

#[tokio::test]
async fn forgot_and_reset_password_do_not_sign_in() {
    let h = TestHarness::new().await;
    h.server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/forgot-password")
                .json_body(json!({ "email": "u1@example.com" }));
            then.status(200).json_body(
                json!({ "success": true, "data": null, "message": "Reset link sent" }),
            );
        })
        .await;
    h.server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/reset-password")
                .json_body(json!({ "token": "reset-1", "password": "new-pw" }));
            then.status(200)
                .json_body(json!({ "success": true, "data": null }));
        })
        .await;

    let message = h.session.forgot_password("u1@example.com").await.unwrap();
    assert_eq!(message.as_deref(), Some("Reset link sent"));

    assert_eq!(
        h.session.reset_password("reset-1", "new-pw").await.unwrap(),
        None
    );
    assert!(!h.session.status().unwrap().authenticated);
}

#[tokio::test]
async fn domain_error_keeps_session() {
    let h = TestHarness::new().await;
    h.storage.set(StorageKeys::AUTH_TOKEN, "tok").unwrap();
    h.server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/change-password");
            then.status(400)
                .json_body(json!({ "detail": "Current password is incorrect" }));
        })
        .await;

    let err = h.session.change_password("wrong", "new").await.unwrap_err();
    assert_eq!(err.to_string(), "API error (400): Current password is incorrect");
    assert!(h.session.status().unwrap().authenticated);
    assert!(h.navigator.visited().is_empty());
}
