//! Access sessions: password checking, login/logout and privilege
//! evaluation against the current token of record.

pub mod password;
mod session;

pub use session::AuthenticationService;
