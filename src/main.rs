use std::net::TcpListener;
use std::sync::Arc;

use keystone::auth::AuthenticationService;
use keystone::configuration::get_configuration;
use keystone::email_client::EmailClient;
use keystone::recovery::RecoveryService;
use keystone::startup::run;
use keystone::store::{InMemoryAccessTokenStore, InMemoryRecoveryTokenStore};
use keystone::telemetry::init_telemetry;
use keystone::token::TokenCodec;
use keystone::users::{InMemoryRoleDirectory, InMemoryUserDirectory};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let codec = TokenCodec::new(&configuration.token.secret);
    let email_client = Arc::new(EmailClient::new(
        configuration.email.clone(),
        reqwest::Client::new(),
    ));

    // Token stores are in-process keyed maps; user and role data come from
    // the user-management side of the deployment, wired here as empty
    // in-memory directories until provisioning fills them.
    let users = Arc::new(InMemoryUserDirectory::new());
    let roles = Arc::new(InMemoryRoleDirectory::new());

    let auth = AuthenticationService::new(
        Arc::new(InMemoryAccessTokenStore::new()),
        users.clone(),
        roles,
        codec.clone(),
        configuration.token.access_token_expiry,
    );
    let recovery = RecoveryService::new(
        Arc::new(InMemoryRecoveryTokenStore::new()),
        users,
        email_client,
        codec,
        configuration.token.recovery_token_expiry,
        configuration.token.welcome_token_expiry,
    );

    let address = format!("127.0.0.1:{}", configuration.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, auth, recovery)?.await
}
