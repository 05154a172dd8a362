//! HTTP surface. Handlers only adapt requests to the services; all
//! decisions live in `auth` and `recovery`.

mod authentication;
mod health_check;
mod recovery;

pub use authentication::{login, logout, validate, ACCESS_TOKEN_HEADER};
pub use health_check::health_check;
pub use recovery::{
    change_password, create_recovery_token, validate_recovery_token, RECOVERY_TOKEN_HEADER,
};

use actix_web::HttpRequest;

/// Reads a token-bearing header, if present and valid UTF-8.
fn header_token(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)?
        .to_str()
        .ok()
        .map(|s| s.to_string())
}
