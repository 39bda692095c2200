//! JWT-based authentication
//!
//! Session tokens identify the caller. Approval tokens are issued to an
//! approver for one private transaction and are handed to the requester,
//! who submits them with the reveal request.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Issuer accepted by [`JwtAuth`]
pub const ISSUER: &str = "twin-api";

/// May open reveal requests and unseal under their own tickets
pub const ROLE_REQUESTER: &str = "requester";
/// May sign approval tokens
pub const ROLE_APPROVER: &str = "approver";
/// May inspect and reject reveal requests
pub const ROLE_GOVERNANCE: &str = "governance";
/// Holds every role
pub const ROLE_ADMIN: &str = "admin";

/// Custom claim naming the private transaction an approval covers
pub const APPROVES_CLAIM: &str = "approves";

/// Minimum secret length accepted from the environment
pub const MIN_SECRET_LEN: usize = 32;

/// JWT claims for API authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
    pub role: String,
    /// Custom claims
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

impl Claims {
    pub fn for_user(user_id: &str, role: &str, expires_in: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
            iss: ISSUER.to_string(),
            role: role.to_string(),
            extra: std::collections::HashMap::new(),
        }
    }

    /// Approval of one private transaction's reveal by `approver_id`
    pub fn approval(approver_id: &str, private_tx_id: &str, expires_in: Duration) -> Self {
        let mut claims = Self::for_user(approver_id, ROLE_APPROVER, expires_in);
        claims.extra.insert(
            APPROVES_CLAIM.to_string(),
            serde_json::Value::String(private_tx_id.to_string()),
        );
        claims
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Admin holds every role
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role || self.role == ROLE_ADMIN
    }

    /// True for an approver's token bound to `private_tx_id`
    pub fn approves(&self, private_tx_id: &str) -> bool {
        self.has_role(ROLE_APPROVER)
            && self
                .extra
                .get(APPROVES_CLAIM)
                .and_then(serde_json::Value::as_str)
                == Some(private_tx_id)
    }
}

/// JWT authentication handler
#[derive(Clone)]
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuth").field("secret", &"[REDACTED]").finish()
    }
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;

        Self {
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Create from `TWIN_JWT_SECRET` (required)
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("TWIN_JWT_SECRET").ok_or_else(|| {
            ApiError::Internal(
                "TWIN_JWT_SECRET environment variable is required. \
                     Generate with: openssl rand -base64 32"
                    .to_string(),
            )
        })?;

        if secret.len() < MIN_SECRET_LEN {
            return Err(ApiError::Internal(format!(
                "TWIN_JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self::new(&secret))
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, ApiError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT encoding error: {}", e)))
    }

    /// Validate and decode a token
    pub fn decode(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::Unauthorized("Invalid token".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token validation failed: {}", e)),
            })
    }

    /// Extract token from Authorization header
    pub fn extract_from_header(header: &str) -> Result<&str, ApiError> {
        header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })
    }
}
