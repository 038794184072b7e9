use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::GatewayError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iss: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies the gateway's own session tokens (HS256, subject = user id).
#[derive(Clone)]
pub struct JwtIssuer {
    inner: Arc<JwtKeys>,
}

struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl_secs: i64,
}

impl JwtIssuer {
    pub fn new(cfg: &JwtConfig) -> Result<Self, GatewayError> {
        if cfg.secret.is_empty() {
            return Err(GatewayError::Misconfigured(
                "jwt.secret must be set".to_string(),
            ));
        }
        Ok(Self {
            inner: Arc::new(JwtKeys {
                encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
                decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
                issuer: cfg.issuer.clone(),
                ttl_secs: cfg.expiration_secs as i64,
            }),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.inner.issuer
    }

    pub fn ttl_secs(&self) -> i64 {
        self.inner.ttl_secs
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, GatewayError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.inner.issuer.clone(),
            iat: now,
            exp: now + self.inner.ttl_secs,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.inner.encoding,
        )?)
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, GatewayError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.inner.issuer.as_str()]);
        let data = decode::<Claims>(token, &self.inner.decoding, &validation)?;
        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| GatewayError::Unauthenticated("invalid token subject".to_string()))
    }
}

/// Caller identity taken from `Authorization: Bearer <gateway jwt>`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    JwtIssuer: FromRef<S>,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| GatewayError::Unauthenticated("missing bearer token".to_string()))?;
        let issuer = JwtIssuer::from_ref(state);
        Ok(Self(issuer.verify(bearer.token())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> JwtIssuer {
        JwtIssuer::new(&JwtConfig {
            secret: secret.to_string(),
            ..JwtConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn issued_token_verifies_to_the_same_user() {
        let jwt = issuer("s3cret");
        let user = Uuid::new_v4();
        let token = jwt.issue(user).unwrap();
        assert_eq!(jwt.verify(&token).unwrap(), user);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = issuer("one").issue(Uuid::new_v4()).unwrap();
        let err = issuer("two").verify(&token).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        assert!(matches!(
            JwtIssuer::new(&JwtConfig::default()),
            Err(GatewayError::Misconfigured(_))
        ));
    }
}
