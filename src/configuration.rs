use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub token: TokenSettings,
    pub email: EmailSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
}

/// Token signing settings
///
/// The signing secret is explicit configuration injected into the codec at
/// construction time; it is never read from process-wide mutable state.
#[derive(serde::Deserialize, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (86400 = 1 day)
    pub recovery_token_expiry: i64, // seconds (1800 = 30 minutes)
    pub welcome_token_expiry: i64,  // seconds (2592000 = 1 month)
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailSettings {
    pub base_url: String,
    pub api_key: String,
    pub sender_address: String,
    /// Prefix the recovery token is appended to when building the link
    /// embedded in outgoing emails.
    pub recovery_url: String,
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.port", 8080_i64)?
        .set_default("token.access_token_expiry", 86400_i64)?
        .set_default("token.recovery_token_expiry", 1800_i64)?
        .set_default("token.welcome_token_expiry", 2592000_i64)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    settings.try_deserialize::<Settings>()
}
