//! End-to-end credential flow against an ephemeral-port server.

use serde_json::Value;
use tokio::task::JoinHandle;

use tradewind_server::config::{AppConfig, BootstrapConfig, ClientSeed, UserSeed};
use tradewind_server::{build_router, build_state};

fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.issuer = "http://localhost:0".to_string();
    cfg.auth.signing_key = "integration-test-signing-key-0123".to_string();
    cfg.bootstrap = BootstrapConfig {
        clients: vec![
            ClientSeed {
                client_id: "webclient".to_string(),
                secret: "webclientsecret".to_string(),
                name: None,
            },
            ClientSeed {
                client_id: "trades-service".to_string(),
                secret: "tradeservicesecret".to_string(),
                name: None,
            },
        ],
        users: vec![UserSeed {
            username: "alice".to_string(),
            password: "pw123".to_string(),
        }],
    };
    cfg
}

async fn start_server() -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let state = build_state(&test_config()).await.expect("build state");
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

async fn password_grant(client: &reqwest::Client, base: &str) -> Value {
    let resp = client
        .post(format!("{base}/oauth/token"))
        .form(&[
            ("grant_type", "password"),
            ("client_id", "webclient"),
            ("client_secret", "webclientsecret"),
            ("username", "alice"),
            ("password", "pw123"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

async fn introspect(client: &reqwest::Client, base: &str, token: &str) -> Value {
    let resp = client
        .post(format!("{base}/oauth/introspect"))
        .form(&[("token", token)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn password_grant_introspect_revoke_cycle() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // Health check.
    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    // Grant for the seeded principal.
    let grant = password_grant(&client, &base).await;
    let access_token = grant["access_token"].as_str().unwrap().to_string();
    assert_eq!(grant["token_type"], "Bearer");
    assert!(grant["expires_in"].as_u64().unwrap() > 0);
    let refresh_token = grant["refresh_token"].as_str().unwrap().to_string();
    assert!(!refresh_token.is_empty());

    // The protected endpoint identifies the caller.
    let me: Value = client
        .get(format!("{base}/auth/me"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], "alice");
    assert_eq!(me["client_id"], "webclient");
    let alice_id = me["user_id"].as_str().unwrap().to_string();

    // Immediate introspection reports active with matching identity.
    let info = introspect(&client, &base, &access_token).await;
    assert_eq!(info["active"], true);
    assert_eq!(info["client_id"], "webclient");
    assert_eq!(info["sub"], alice_id.as_str());
    assert!(info["iat"].as_i64().is_some());
    assert!(info["exp"].as_i64().is_some());

    // Revocation always reports success.
    let resp = client
        .post(format!("{base}/oauth/revoke"))
        .form(&[("token", access_token.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The record is gone: inactive, with no identity fields.
    let info = introspect(&client, &base, &access_token).await;
    assert_eq!(info, serde_json::json!({ "active": false }));

    // And the protected endpoint now rejects the token.
    let resp = client
        .get(format!("{base}/auth/me"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Re-revoking is still 200.
    let resp = client
        .post(format!("{base}/oauth/revoke"))
        .form(&[("token", access_token.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn revocation_by_refresh_token_with_wrong_hint() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    let grant = password_grant(&client, &base).await;
    let access_token = grant["access_token"].as_str().unwrap();
    let refresh_token = grant["refresh_token"].as_str().unwrap();

    // Revoke by the refresh value while hinting access_token; the
    // fallback lookup must still find the record.
    let resp = client
        .post(format!("{base}/oauth/revoke"))
        .form(&[
            ("token", refresh_token),
            ("token_type_hint", "access_token"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let info = introspect(&client, &base, access_token).await;
    assert_eq!(info["active"], false);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn client_credentials_grant_is_self_scoped() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/oauth/token"))
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", "trades-service"),
            ("client_secret", "tradeservicesecret"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let grant: Value = resp.json().await.unwrap();

    // No refresh token for machine grants.
    assert!(grant.get("refresh_token").is_none());

    let info = introspect(&client, &base, grant["access_token"].as_str().unwrap()).await;
    assert_eq!(info["active"], true);
    assert_eq!(info["sub"], "trades-service");
    assert_eq!(info["client_id"], "trades-service");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn grant_failures_use_correct_statuses() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // Wrong password: 401 invalid_grant with a generic description.
    let resp = client
        .post(format!("{base}/oauth/token"))
        .form(&[
            ("grant_type", "password"),
            ("client_id", "webclient"),
            ("client_secret", "webclientsecret"),
            ("username", "alice"),
            ("password", "wrong"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_grant");

    // Unknown user: byte-identical failure to the wrong-password case.
    let resp = client
        .post(format!("{base}/oauth/token"))
        .form(&[
            ("grant_type", "password"),
            ("client_id", "webclient"),
            ("client_secret", "webclientsecret"),
            ("username", "mallory"),
            ("password", "pw123"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let unknown_user: Value = resp.json().await.unwrap();
    assert_eq!(unknown_user, body);

    // Unknown client: 401 invalid_client.
    let resp = client
        .post(format!("{base}/oauth/token"))
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", "ghost"),
            ("client_secret", "boo"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_client");

    // Unsupported grant type: 400.
    let resp = client
        .post(format!("{base}/oauth/token"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", "webclient"),
            ("client_secret", "webclientsecret"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Missing token on revoke: 400.
    let resp = client
        .post(format!("{base}/oauth/revoke"))
        .form(&[("token_type_hint", "access_token")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn registration_then_grant() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/auth/register"))
        .json(&serde_json::json!({ "username": "bob", "password": "hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    // Duplicate registration is a client error.
    let resp = client
        .post(format!("{base}/auth/register"))
        .json(&serde_json::json!({ "username": "bob", "password": "other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // The new user can obtain a token.
    let resp = client
        .post(format!("{base}/oauth/token"))
        .form(&[
            ("grant_type", "password"),
            ("client_id", "webclient"),
            ("client_secret", "webclientsecret"),
            ("username", "bob"),
            ("password", "hunter2"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
