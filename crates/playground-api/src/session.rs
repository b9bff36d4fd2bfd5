//! Signed session tokens carried in the `Token` cookie.

use axum_extra::extract::cookie::Cookie;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use playground_types::api::Claims;

pub const TOKEN_COOKIE: &str = "Token";

/// Lifetime of a freshly issued token.
pub const SESSION_TTL_SECS: i64 = 15 * 60;

/// Tokens closer than this to expiry are reissued.
pub const REFRESH_WINDOW_SECS: i64 = 15 * 60;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, username: &str) -> Result<(String, Claims), SessionError> {
        self.issue_with_ttl(username, SESSION_TTL_SECS)
    }

    /// Same as [`issue`](Self::issue) with an explicit lifetime, which may be
    /// negative.
    pub fn issue_with_ttl(
        &self,
        username: &str,
        ttl_secs: i64,
    ) -> Result<(String, Claims), SessionError> {
        let claims = Claims {
            username: username.to_string(),
            exp: Utc::now().timestamp() + ttl_secs,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok((token, claims))
    }

    /// Checks signature, structure and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        Ok(decode::<Claims>(token, &self.decoding, &self.validation)?.claims)
    }

    pub fn needs_refresh(claims: &Claims, now: i64) -> bool {
        claims.exp - now < REFRESH_WINDOW_SECS
    }

    /// Reissues `claims` when it is about to expire.
    pub fn refresh(&self, claims: &Claims) -> Result<Option<(String, Claims)>, SessionError> {
        if Self::needs_refresh(claims, Utc::now().timestamp()) {
            self.issue(&claims.username).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Session-scoped cookie: no Max-Age, no Expires.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token)).path("/").http_only(true).build()
}

/// Empty, already expired cookie that makes the client drop the session.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((TOKEN_COOKIE, "")).path("/").http_only(true).build();
    cookie.make_removal();
    cookie
}
