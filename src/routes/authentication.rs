/// Authentication endpoints: login, logout and privilege validation.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::AuthenticationService;
use crate::error::AppError;
use crate::routes::header_token;
use crate::validators::is_valid_email;

pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

#[derive(Deserialize)]
pub struct CredentialsBody {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ValidateBody {
    #[serde(default)]
    pub privileges: Vec<String>,
}

/// POST /authentication/login
///
/// Returns the user's single live access token: 200 with `{token}`,
/// 401 on rejected credentials.
pub async fn login(
    form: web::Json<CredentialsBody>,
    auth: web::Data<AuthenticationService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    let token = auth.login(&email, &form.password).await?;
    Ok(HttpResponse::Ok().json(token))
}

/// POST /authentication/logout (header: x-access-token)
///
/// 200 on success, 400 on a malformed token or when no session exists.
pub async fn logout(
    req: HttpRequest,
    auth: web::Data<AuthenticationService>,
) -> Result<HttpResponse, AppError> {
    let token = header_token(&req, ACCESS_TOKEN_HEADER)
        .ok_or_else(|| AppError::BadRequest(format!("missing {} header", ACCESS_TOKEN_HEADER)))?;

    auth.logout(&token).await?;
    Ok(HttpResponse::Ok().finish())
}

/// POST /authentication/validate (header: x-access-token)
///
/// Body may carry the required privilege names; an absent or empty list is
/// an identity check only. 200, 401 or 403 naming the missing privileges.
pub async fn validate(
    req: HttpRequest,
    body: Option<web::Json<ValidateBody>>,
    auth: web::Data<AuthenticationService>,
) -> Result<HttpResponse, AppError> {
    let token =
        header_token(&req, ACCESS_TOKEN_HEADER).ok_or(AppError::Unauthorized(None))?;
    let privileges = body.map(|b| b.into_inner().privileges).unwrap_or_default();

    auth.check_privileges(&token, &privileges).await?;
    Ok(HttpResponse::Ok().finish())
}
