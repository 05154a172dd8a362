//! Signed token issuing and verification.
//!
//! Pure functions of the token string and the injected secret; nothing in
//! this module consults storage.

mod claims;
mod codec;

pub use claims::{Claims, TokenKind, UserSnapshot, SNAPSHOT_SCHEMA_VERSION};
pub use codec::{TokenCodec, VerificationError};
