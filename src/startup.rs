use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::AuthenticationService;
use crate::recovery::RecoveryService;
use crate::routes::{
    change_password, create_recovery_token, health_check, login, logout, validate,
    validate_recovery_token,
};

pub fn run(
    listener: TcpListener,
    auth: AuthenticationService,
    recovery: RecoveryService,
) -> Result<Server, std::io::Error> {
    let auth = web::Data::new(auth);
    let recovery = web::Data::new(recovery);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(auth.clone())
            .app_data(recovery.clone())
            .route("/health_check", web::get().to(health_check))
            .route("/authentication/login", web::post().to(login))
            .route("/authentication/logout", web::post().to(logout))
            .route("/authentication/validate", web::post().to(validate))
            .route("/recovery", web::post().to(create_recovery_token))
            .route("/recovery/validate", web::post().to(validate_recovery_token))
            .route("/recovery/change-password", web::put().to(change_password))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
