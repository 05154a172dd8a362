/// Password recovery endpoints.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::recovery::RecoveryService;
use crate::routes::header_token;
use crate::validators::is_valid_email;

pub const RECOVERY_TOKEN_HEADER: &str = "x-recovery-token";

#[derive(Deserialize)]
pub struct CreateRecoveryTokenBody {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordBody {
    pub password: String,
}

/// POST /recovery
///
/// Issues (or reuses) a recovery token and emails the link. The token
/// itself travels only by email; the response body is empty.
pub async fn create_recovery_token(
    form: web::Json<CreateRecoveryTokenBody>,
    recovery: web::Data<RecoveryService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    recovery.create_recovery_token(&email).await?;
    Ok(HttpResponse::Ok().finish())
}

/// POST /recovery/validate (header: x-recovery-token)
///
/// 200 when the token is still usable, 401 otherwise.
pub async fn validate_recovery_token(
    req: HttpRequest,
    recovery: web::Data<RecoveryService>,
) -> Result<HttpResponse, AppError> {
    let token =
        header_token(&req, RECOVERY_TOKEN_HEADER).ok_or(AppError::Unauthorized(None))?;

    if recovery.validate_token(&token).await {
        Ok(HttpResponse::Ok().finish())
    } else {
        Err(AppError::Unauthorized(None))
    }
}

/// PUT /recovery/change-password (header: x-recovery-token)
///
/// Consumes the token and sets the new password. 200, 400 on a weak
/// password, 401 on a stale or unknown token.
pub async fn change_password(
    req: HttpRequest,
    form: web::Json<ChangePasswordBody>,
    recovery: web::Data<RecoveryService>,
) -> Result<HttpResponse, AppError> {
    let token =
        header_token(&req, RECOVERY_TOKEN_HEADER).ok_or(AppError::Unauthorized(None))?;

    recovery.change_user_password(&token, &form.password).await?;
    Ok(HttpResponse::Ok().finish())
}
