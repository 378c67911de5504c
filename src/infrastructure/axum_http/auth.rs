use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error_responses::ErrorResponse;
use crate::{config::config_loader, domain::value_objects::bookings::BookingRequester};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

impl From<&AuthUser> for BookingRequester {
    fn from(auth: &AuthUser) -> Self {
        Self {
            user_id: auth.user_id,
            is_admin: auth.is_admin(),
        }
    }
}

#[derive(Debug)]
pub struct AuthError(String);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ErrorResponse::new(StatusCode::UNAUTHORIZED, "unauthorized", self.0).into_response()
    }
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<AuthUser, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| AuthError(format!("JWT validation failed: {e}")))?;

    let user_id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AuthError("Invalid user ID in token".to_string()))?;

    Ok(AuthUser {
        user_id,
        role: token_data.claims.role,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_str = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AuthError("Missing Authorization header".to_string()))?
            .to_str()
            .map_err(|_| AuthError("Invalid Authorization header".to_string()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthError("Invalid Authorization header format".to_string()))?;

        let user_secret = config_loader::get_user_secret().map_err(|e| {
            tracing::error!(error = %e, "auth: user secret is not configured");
            AuthError("Authentication is unavailable".to_string())
        })?;

        validate_jwt(token, &user_secret.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "supersecretjwtsecretforunittesting123";

    fn token(sub: &str, role: &str, exp: usize, secret: &str) -> String {
        encode(
            &Header::default(),
            &Claims {
                sub: sub.to_string(),
                role: role.to_string(),
                exp,
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_user_and_role() {
        let sub = "123e4567-e89b-12d3-a456-426614174000";
        let user = validate_jwt(&token(sub, "admin", 9_999_999_999, SECRET), SECRET).unwrap();

        assert_eq!(user.user_id.to_string(), sub);
        assert!(user.is_admin());
    }

    #[test]
    fn members_only_act_for_themselves() {
        let member = AuthUser {
            user_id: Uuid::new_v4(),
            role: "member".to_string(),
        };
        let requester = BookingRequester::from(&member);

        assert!(!requester.is_admin);
        assert!(requester.may_act_for(member.user_id));
        assert!(!requester.may_act_for(Uuid::new_v4()));

        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: ADMIN_ROLE.to_string(),
        };
        assert!(BookingRequester::from(&admin).may_act_for(Uuid::new_v4()));
    }

    #[test]
    fn expired_token_is_rejected() {
        let sub = "123e4567-e89b-12d3-a456-426614174000";
        assert!(validate_jwt(&token(sub, "user", 1, SECRET), SECRET).is_err());
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let sub = "123e4567-e89b-12d3-a456-426614174000";
        assert!(validate_jwt(&token(sub, "user", 9_999_999_999, "wrongsecret"), SECRET).is_err());
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        assert!(validate_jwt(&token("alice", "user", 9_999_999_999, SECRET), SECRET).is_err());
    }
}
