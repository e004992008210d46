use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of an access token. Carries the identity projection so request
/// handling does not need a user lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Payload of a refresh token: the user id only, plus a unique token id so
/// every rotation produces a distinct value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}
