// =============================================================================
// Bearer Token Authentication — HS256 tokens + Axum extractor
// =============================================================================
//
// Tokens are compact JWTs signed with HMAC-SHA256 by the account service. This
// module only verifies them and exposes the caller's identity; signup, login
// and password storage live elsewhere.
//
// Usage as an Axum extractor:
//
//   async fn handler(AuthUser(claims): AuthUser, ...) { ... }
//
// Missing or invalid tokens short-circuit the request with 401.
// =============================================================================

use crate::error::AdvisorError;
use crate::Result;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_ALGORITHM: &str = "HS256";

/// Identity carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id,
            email: None,
            name: None,
            is_admin: false,
            iat: None,
            exp: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

// =============================================================================
// Verifier
// =============================================================================

pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AdvisorError::Config(format!("Unusable token secret: {}", e)))
    }

    /// Sign claims into a token. Used by tooling and tests; login lives elsewhere.
    pub fn issue(&self, claims: &Claims) -> Result<String> {
        let header = TokenHeader {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Check signature, algorithm and expiry; return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let (signing_input, signature) = token
            .rsplit_once('.')
            .ok_or_else(|| invalid("token must have three segments"))?;
        let (header, payload) = signing_input
            .split_once('.')
            .filter(|(_, payload)| !payload.contains('.'))
            .ok_or_else(|| invalid("token must have three segments"))?;

        let header: TokenHeader = decode_segment(header)?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(invalid("unsupported algorithm"));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| invalid("signature is not base64url"))?;

        // The signature covers the segments exactly as received.
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| invalid("signature mismatch"))?;

        let claims: Claims = decode_segment(payload)?;

        if let Some(exp) = claims.exp {
            if exp <= chrono::Utc::now().timestamp() {
                return Err(AdvisorError::Unauthorized("Token expired".to_string()));
            }
        }

        Ok(claims)
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| invalid("segment is not base64url"))?;
    serde_json::from_slice(&bytes).map_err(|_| invalid("segment is not valid JSON"))
}

fn invalid(reason: &str) -> AdvisorError {
    debug!("Token rejected: {}", reason);
    AdvisorError::Unauthorized("Invalid token".to_string())
}

// =============================================================================
// Extractor
// =============================================================================

/// Authenticated caller. Rejects with 401 before the handler body runs.
pub struct AuthUser(pub Claims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
{
    type Rejection = AdvisorError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AdvisorError::Unauthorized("No token provided".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AdvisorError::Unauthorized("No token provided".to_string()))?;

        let verifier = Arc::<TokenVerifier>::from_ref(state);
        verifier.verify(token).map(AuthUser)
    }
}

// =============================================================================
// Tests
// =============================================================================
