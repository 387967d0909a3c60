use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use hrdesk_application::{TokenClaims, TokenVerifier};
use hrdesk_core::{AppError, AppResult, UserIdentity};

/// Shortest accepted HS256 secret.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

/// HS256 bearer token signer and verifier.
#[derive(Clone)]
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: Option<String>,
}

impl JwtTokenService {
    /// Creates a service from a shared secret and an optional required issuer.
    pub fn new(secret: &str, issuer: Option<String>) -> AppResult<Self> {
        if secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(AppError::Validation(format!(
                "token secret must be at least {MIN_TOKEN_SECRET_LEN} characters"
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        })
    }

    /// Signs a token for an identity that expires after `ttl`.
    pub fn issue(&self, identity: &UserIdentity, ttl: Duration) -> AppResult<String> {
        let expires_at = (Utc::now() + ttl).timestamp();
        let claims = TokenClaims {
            sub: identity.subject().to_owned(),
            role_id: identity.role_id().to_string(),
            email: identity.email().map(str::to_owned),
            exp: u64::try_from(expires_at).unwrap_or_default(),
            iss: self.issuer.clone(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|error| AppError::Internal(format!("failed to sign bearer token: {error}")))
    }
}

impl TokenVerifier for JwtTokenService {
    fn verify(&self, token: &str) -> AppResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }

        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|error| AppError::Unauthorized(format!("invalid bearer token: {error}")))
    }
}
