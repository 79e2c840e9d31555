//! Authentication: actor stamping and bearer-token validation.

use async_trait::async_trait;
use axum::{
    RequestPartsExt,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "gateway")]
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::AppState;
use crate::api::response;
use crate::config::GatewayConfig;
use crate::context::{Actor, RequestContext};
use crate::error::AppError;

/// Auth collaborator used by the request pipeline and the scheduler.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Stamp `actor` as the identity the context acts on behalf of.
    fn set_user_auth_info(&self, ctx: &mut RequestContext, actor: Actor);

    /// Validate a bearer token and return the identity it carries.
    async fn validate_token(&self, token: &str) -> Result<Actor, AppError>;

    /// Whether protected routes must present a token.
    fn requires_token(&self) -> bool;
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user name).
    pub sub: String,
    /// Numeric user id.
    pub uid: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
}

/// HMAC-signed JWT authentication.
///
/// Without a secret no token can be validated and protected routes are left
/// open.
#[derive(Debug, Clone)]
pub struct JwtAuth {
    secret: Option<String>,
}

impl JwtAuth {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
        }
    }

    /// An instance that stamps identities but validates nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self { secret: None }
    }

    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        match config.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Self::new(secret),
            _ => Self::disabled(),
        }
    }
}

#[async_trait]
impl AuthService for JwtAuth {
    fn set_user_auth_info(&self, ctx: &mut RequestContext, actor: Actor) {
        ctx.set_actor(actor);
    }

    async fn validate_token(&self, token: &str) -> Result<Actor, AppError> {
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| AppError::unauthorized("token validation is not configured"))?;

        let claims = validate_jwt(token, secret)
            .map_err(|e| AppError::unauthorized(format!("JWT validation failed: {e}")))?;

        Ok(Actor::new(claims.uid, claims.sub))
    }

    fn requires_token(&self) -> bool {
        self.secret.is_some()
    }
}

/// Generate a JWT token for `actor`.
#[cfg(feature = "gateway")]
pub fn generate_jwt(actor: &Actor, secret: &str, expiry_secs: u64) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: actor.name.clone(),
        uid: actor.id,
        exp: now + i64::try_from(expiry_secs)?,
        iat: now,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate a JWT token.
#[cfg(feature = "gateway")]
pub fn validate_jwt(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Stub for non-gateway builds.
#[cfg(not(feature = "gateway"))]
pub fn generate_jwt(_actor: &Actor, _secret: &str, _expiry_secs: u64) -> anyhow::Result<String> {
    Err(anyhow::anyhow!("JWT support requires 'gateway' feature"))
}

#[cfg(not(feature = "gateway"))]
pub fn validate_jwt(_token: &str, _secret: &str) -> anyhow::Result<Claims> {
    Err(anyhow::anyhow!("JWT support requires 'gateway' feature"))
}

/// Bearer-token middleware for the admin routes.
///
/// The validated identity is stamped into the request context.
pub async fn bearer_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();
    let Ok(ctx) = parts.extract::<RequestContext>().await;

    let token = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
        Ok(TypedHeader(authorization)) => authorization.token().to_string(),
        Err(_) => {
            return response::error(
                &ctx,
                AppError::unauthorized("Authorization header is required"),
            );
        }
    };

    let actor = match state.auth.validate_token(&token).await {
        Ok(actor) => actor,
        Err(err) => return response::error(&ctx, err),
    };

    if let Some(ctx) = parts.extensions.get_mut::<RequestContext>() {
        state.auth.set_user_auth_info(ctx, actor.clone());
    }
    parts.extensions.insert(actor);

    next.run(Request::from_parts(parts, body)).await
}

#[cfg(all(test, feature = "gateway"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_jwt_round_trip() {
        let auth = JwtAuth::new("test-secret");
        let token = generate_jwt(&Actor::new(42, "alice"), "test-secret", 60).unwrap();

        let actor = auth.validate_token(&token).await.unwrap();
        assert_eq!(actor, Actor::new(42, "alice"));
        assert!(auth.requires_token());
    }

    #[tokio::test]
    async fn test_wrong_secret_is_unauthorized() {
        let auth = JwtAuth::new("test-secret");
        let token = generate_jwt(&Actor::new(42, "alice"), "other-secret", 60).unwrap();

        let err = auth.validate_token(&token).await.unwrap_err();
        assert_eq!(err.code(), crate::codes::Code::Unauthorized);
    }

    #[tokio::test]
    async fn test_disabled_rejects_tokens() {
        let auth = JwtAuth::disabled();
        assert!(!auth.requires_token());
        assert!(auth.validate_token("anything").await.is_err());
    }

    #[test]
    fn test_from_config_ignores_empty_secret() {
        let config = GatewayConfig {
            jwt_secret: Some(String::new()),
            ..GatewayConfig::default()
        };
        assert!(!JwtAuth::from_config(&config).requires_token());
    }

    #[test]
    fn test_set_user_auth_info() {
        let auth = JwtAuth::disabled();
        let mut ctx = RequestContext::new();
        auth.set_user_auth_info(&mut ctx, Actor::system());
        assert!(ctx.actor().unwrap().is_system());
    }
}
