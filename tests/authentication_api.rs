use std::net::TcpListener;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use keystone::auth::{password, AuthenticationService};
use keystone::email_client::EmailSender;
use keystone::error::AppError;
use keystone::recovery::RecoveryService;
use keystone::startup::run;
use keystone::store::{InMemoryAccessTokenStore, InMemoryRecoveryTokenStore};
use keystone::token::TokenCodec;
use keystone::users::{
    InMemoryRoleDirectory, InMemoryUserDirectory, Privilege, Role, User, UserStatus,
};

const SECRET: &str = "test-secret-key-at-least-32-characters-long";
const PASSWORD: &str = "CorrectHorse1";

struct NullEmailSender;

#[async_trait]
impl EmailSender for NullEmailSender {
    async fn send_recovery_email(&self, _: &[String], _: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn send_welcome_email(&self, _: &[String], _: &str, _: &str) -> Result<(), AppError> {
        Ok(())
    }
}

struct TestApp {
    address: String,
}

fn client_user() -> User {
    User {
        id: 1,
        email: "u1@example.com".to_string(),
        name: "u1".to_string(),
        password_hash: password::encode(PASSWORD).unwrap(),
        status: UserStatus::Active,
        role: Role {
            id: 1,
            name: "CLIENT".to_string(),
            privileges: vec![
                Privilege {
                    id: 1,
                    name: "GET_CLIENT".to_string(),
                },
                Privilege {
                    id: 2,
                    name: "CREATE_CLIENT".to_string(),
                },
            ],
        },
    }
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let users = Arc::new(InMemoryUserDirectory::new());
    let roles = Arc::new(InMemoryRoleDirectory::new());
    let user = client_user();
    roles.insert(&user.role);
    users.insert(user);

    let codec = TokenCodec::new(SECRET);
    let auth = AuthenticationService::new(
        Arc::new(InMemoryAccessTokenStore::new()),
        users.clone(),
        roles,
        codec.clone(),
        86400,
    );
    let recovery = RecoveryService::new(
        Arc::new(InMemoryRecoveryTokenStore::new()),
        users,
        Arc::new(NullEmailSender),
        codec,
        1800,
        2592000,
    );

    let server = run(listener, auth, recovery).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp { address }
}

async fn login(client: &reqwest::Client, app: &TestApp, email: &str, password: &str) -> reqwest::Response {
    client
        .post(format!("{}/authentication/login", app.address))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute request.")
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health_check", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn login_returns_a_token_for_valid_credentials() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = login(&client, &app, "u1@example.com", PASSWORD).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    let token = body["token"].as_str().expect("response carries a token");
    assert!(!token.is_empty());
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = login(&client, &app, "nobody@example.com", PASSWORD).await;
    assert_eq!(401, response.status().as_u16());

    let response = login(&client, &app, "u1@example.com", "WrongPassword1").await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn login_reuses_the_live_token() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let first: Value = login(&client, &app, "u1@example.com", PASSWORD)
        .await
        .json()
        .await
        .unwrap();
    let second: Value = login(&client, &app, "u1@example.com", PASSWORD)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(first["token"], second["token"]);
}

#[tokio::test]
async fn session_lifecycle_enforces_privileges_and_currency() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let body: Value = login(&client, &app, "u1@example.com", PASSWORD)
        .await
        .json()
        .await
        .unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    // Granted privilege passes.
    let response = client
        .post(format!("{}/authentication/validate", app.address))
        .header("x-access-token", &token)
        .json(&json!({ "privileges": ["GET_CLIENT"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    // Missing privilege is forbidden and named.
    let response = client
        .post(format!("{}/authentication/validate", app.address))
        .header("x-access-token", &token)
        .json(&json!({ "privileges": ["UPDATE_CLIENT"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "FORBIDDEN");
    assert!(body["message"].as_str().unwrap().contains("UPDATE_CLIENT"));

    // Logout deletes the record.
    let response = client
        .post(format!("{}/authentication/logout", app.address))
        .header("x-access-token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    // Even the identity-only check now fails: the token is no longer on
    // record, although it still verifies cryptographically.
    let response = client
        .post(format!("{}/authentication/validate", app.address))
        .header("x-access-token", &token)
        .json(&json!({ "privileges": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn logout_with_malformed_token_is_a_bad_request() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/authentication/logout", app.address))
        .header("x-access-token", "not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    let response = client
        .post(format!("{}/authentication/logout", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn validate_without_a_token_is_unauthorized() {
    let app = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/authentication/validate", app.address))
        .json(&json!({ "privileges": ["GET_CLIENT"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());
}
