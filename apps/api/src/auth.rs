//! Bearer-token sessions issued by the external identity provider.
//!
//! The provider signs HS256 tokens whose `sub` is the user id. A request without
//! an `Authorization` header is an anonymous caller; a header that fails
//! verification is always rejected, never downgraded to anonymous.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub exp: usize,
}

/// The authenticated identity for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Session, AppError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("token rejected: {e}");
            AppError::Unauthorized
        })?;
        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)?;
        Ok(Session {
            user_id,
            email: data.claims.email,
        })
    }

    fn from_parts(&self, parts: &Parts) -> Result<Option<Session>, AppError> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        let token = header
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;
        self.verify(token.trim()).map(Some)
    }
}

/// Extractor for routes that require a signed-in user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Session);

/// Extractor for routes open to anonymous callers.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    SessionVerifier: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        SessionVerifier::from_ref(state)
            .from_parts(parts)?
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    SessionVerifier: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        SessionVerifier::from_ref(state)
            .from_parts(parts)
            .map(MaybeUser)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::Claims;

    pub const SECRET: &str = "supersecretjwtsecretforunittesting123";

    pub fn token_for(sub: &str, email: Option<&str>, exp: usize, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            email: email.map(str::to_string),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::testing::{token_for, SECRET};
    use super::*;

    const FAR_FUTURE: usize = 9_999_999_999;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_valid_token_yields_session() {
        let user_id = Uuid::new_v4();
        let token = token_for(&user_id.to_string(), Some("a@b.co"), FAR_FUTURE, SECRET);
        let session = SessionVerifier::new(SECRET).verify(&token).unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.email.as_deref(), Some("a@b.co"));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = token_for(&Uuid::new_v4().to_string(), None, 1, SECRET);
        assert!(matches!(
            SessionVerifier::new(SECRET).verify(&token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = token_for(&Uuid::new_v4().to_string(), None, FAR_FUTURE, "wrongsecret");
        assert!(SessionVerifier::new(SECRET).verify(&token).is_err());
    }

    #[test]
    fn test_non_uuid_subject_is_rejected() {
        let token = token_for("not-a-uuid", None, FAR_FUTURE, SECRET);
        assert!(SessionVerifier::new(SECRET).verify(&token).is_err());
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous_for_maybe_user() {
        let verifier = SessionVerifier::new(SECRET);
        let mut parts = parts_with(None);
        let MaybeUser(session) = MaybeUser::from_request_parts(&mut parts, &verifier)
            .await
            .unwrap();
        assert!(session.is_none());

        let mut parts = parts_with(None);
        assert!(AuthUser::from_request_parts(&mut parts, &verifier)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_malformed_header_is_rejected_even_when_optional() {
        let verifier = SessionVerifier::new(SECRET);
        let mut parts = parts_with(Some("Token abc"));
        assert!(MaybeUser::from_request_parts(&mut parts, &verifier)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_bearer_header_resolves_auth_user() {
        let verifier = SessionVerifier::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = token_for(&user_id.to_string(), None, FAR_FUTURE, SECRET);
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let AuthUser(session) = AuthUser::from_request_parts(&mut parts, &verifier)
            .await
            .unwrap();
        assert_eq!(session.user_id, user_id);
    }
}
