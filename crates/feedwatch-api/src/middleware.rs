use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, Cookie, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};

use feedwatch_types::api::Claims;

use crate::AppState;
use crate::auth::SESSION_COOKIE;
use crate::error::ApiError;

/// Resolve the caller from a bearer token or the session cookie and stash the
/// claims in request extensions. Every owner-scoped handler sits behind this.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(&req)
        .ok_or_else(|| ApiError::Unauthorized("Not signed in".into()))?;

    let claims = verify_token(&state.jwt_secret, &token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn session_token(req: &Request) -> Option<String> {
    let headers = req.headers();
    if let Some(auth) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(auth.token().to_string());
    }
    headers
        .typed_get::<Cookie>()
        .and_then(|cookies| cookies.get(SESSION_COOKIE).map(str::to_string))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("Invalid or expired session".into()))?;

    Ok(token_data.claims)
}
