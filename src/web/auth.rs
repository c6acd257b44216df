// src/web/auth.rs
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::types::ServerState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Request guard requiring the shared API key. Header lookup is case-insensitive.
pub struct ApiKey;

#[derive(Debug)]
pub enum ApiKeyError {
    Missing,
    Invalid,
    StateUnavailable,
}

/// Compares SHA-256 digests in constant time so neither the content nor the
/// length of the configured key leaks through timing.
fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.ct_eq(&expected).into()
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ApiKey {
    type Error = ApiKeyError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let state = match req.guard::<&State<ServerState>>().await {
            Outcome::Success(state) => state,
            Outcome::Error((status, _)) => {
                return Outcome::Error((status, ApiKeyError::StateUnavailable))
            }
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        match req.headers().get_one(API_KEY_HEADER) {
            Some(key) if keys_match(key, &state.api_key) => Outcome::Success(ApiKey),
            Some(_) => {
                warn!(uri = %req.uri(), "Rejected request with invalid API key");
                Outcome::Error((Status::Unauthorized, ApiKeyError::Invalid))
            }
            None => {
                warn!(uri = %req.uri(), "Rejected request without API key");
                Outcome::Error((Status::Unauthorized, ApiKeyError::Missing))
            }
        }
    }
}
