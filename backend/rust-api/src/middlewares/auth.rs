use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::handlers::ApiError;
use crate::models::{parse_object_id, user::UserRole};
use crate::services::{AppState, ServiceError};

/// Token payload issued by the identity side of the platform.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JwtClaims {
    pub user_id: String,
    pub email: String,
    pub roles: Vec<UserRole>,
    pub exp: usize, // expiration timestamp
    pub iat: usize, // issued at timestamp
}

/// Authenticated caller, stored in request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub email: String,
    pub roles: Vec<UserRole>,
}

impl CurrentUser {
    pub fn has_any_role(&self, allowed: &[UserRole]) -> bool {
        self.roles.iter().any(|role| allowed.contains(role))
    }
}

#[derive(Debug)]
pub enum AuthError {
    InvalidToken,
    ExpiredToken,
    MissingToken,
    InvalidSignature,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token expired"),
            AuthError::MissingToken => write!(f, "Missing authorization token"),
            AuthError::InvalidSignature => write!(f, "Invalid token signature"),
        }
    }
}

impl std::error::Error for AuthError {}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn generate_token(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|_| AuthError::InvalidToken)
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let validation = Validation::default();

        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken,
            })
    }
}

/// Middleware для проверки JWT токена
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::Unauthenticated(AuthError::MissingToken.to_string()))?;

    let claims = state.jwt.validate_token(token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        ServiceError::Unauthenticated(e.to_string())
    })?;

    let id = parse_object_id(&claims.user_id, "user ID").map_err(|_| {
        tracing::warn!("JWT carries malformed userId: {}", claims.user_id);
        ServiceError::Unauthenticated(AuthError::InvalidToken.to_string())
    })?;

    tracing::debug!(
        "Authenticated user: {} (roles: {:?})",
        claims.user_id,
        claims.roles
    );

    request.extensions_mut().insert(CurrentUser {
        id,
        email: claims.email,
        roles: claims.roles,
    });

    Ok(next.run(request).await)
}

fn guard(request: &Request, allowed: &[UserRole]) -> Result<(), ApiError> {
    let Some(user) = request.extensions().get::<CurrentUser>() else {
        return Err(ServiceError::Unauthenticated("User not authenticated".to_string()).into());
    };
    if user.has_any_role(allowed) {
        return Ok(());
    }
    tracing::warn!(
        "Access denied for {}: one of {:?} required",
        user.email,
        allowed
    );
    Err(ServiceError::Forbidden.into())
}

/// Admin or teacher: structural edits of course content.
pub async fn staff_guard_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    guard(&request, &[UserRole::Admin, UserRole::Teacher])?;
    Ok(next.run(request).await)
}

pub async fn admin_guard_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    guard(&request, &[UserRole::Admin])?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp_offset: i64) -> JwtClaims {
        let now = chrono::Utc::now().timestamp();
        JwtClaims {
            user_id: ObjectId::new().to_hex(),
            email: "teacher@graidea.dev".to_string(),
            roles: vec![UserRole::Teacher],
            exp: (now + exp_offset) as usize,
            iat: now as usize,
        }
    }

    #[test]
    fn test_jwt_generation_and_validation() {
        let service = JwtService::new("test-secret");
        let claims = claims(3600);

        let token = service.generate_token(&claims).unwrap();
        let validated = service.validate_token(&token).unwrap();

        assert_eq!(validated.user_id, claims.user_id);
        assert_eq!(validated.roles, vec![UserRole::Teacher]);
    }

    #[test]
    fn test_jwt_wrong_secret_is_rejected() {
        let token = JwtService::new("secret-a")
            .generate_token(&claims(3600))
            .unwrap();
        let err = JwtService::new("secret-b").validate_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_jwt_expired_is_rejected() {
        let service = JwtService::new("test-secret");
        let token = service.generate_token(&claims(-3600)).unwrap();
        assert!(matches!(
            service.validate_token(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn test_role_check() {
        let user = CurrentUser {
            id: ObjectId::new(),
            email: "s@graidea.dev".to_string(),
            roles: vec![UserRole::Student],
        };
        assert!(!user.has_any_role(&[UserRole::Admin, UserRole::Teacher]));
        assert!(user.has_any_role(&[UserRole::Student]));
    }
}
