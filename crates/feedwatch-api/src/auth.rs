use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use feedwatch_types::api::{CallbackQuery, Claims, SessionResponse};
use feedwatch_types::models::Session;

use crate::error::{ApiError, ExchangeError};
use crate::{AppState, with_db};

pub const SESSION_COOKIE: &str = "feedwatch_session";

/// Where the browser goes after the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectInstruction {
    pub location: String,
}

/// An application session minted for an identity the provider vouched for.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session: Session,
    /// Signed JWT handed to the browser.
    pub token: String,
}

#[derive(Debug)]
pub struct ExchangeOutcome {
    pub redirect: RedirectInstruction,
    pub issued: IssuedSession,
}

/// Trade a one-time authorization code for a session and record the
/// provider access token against the user.
///
/// Exactly one token row is written per successful exchange. Nothing is
/// written when the provider rejects the code or returns no session. No
/// retries: every failure goes straight back to the caller.
pub async fn exchange_and_persist(
    state: &AppState,
    code: &str,
    redirect_to: Option<&str>,
) -> Result<ExchangeOutcome, ExchangeError> {
    if code.is_empty() {
        return Err(ExchangeError::ExchangeFailed("Authorization code is required".into()));
    }

    let provider_session = state
        .provider
        .exchange_code(code)
        .await
        .map_err(|e| {
            warn!("Code exchange rejected: {}", e);
            ExchangeError::ExchangeFailed(e.to_string())
        })?
        .ok_or_else(|| {
            warn!("Code exchange succeeded without a session");
            ExchangeError::SessionMissing
        })?;

    let now = Utc::now();
    let session = Session {
        user_id: provider_session.user_id.clone(),
        created_at: now,
    };
    let token = create_token(&state.jwt_secret, &session.user_id, state.session_ttl).map_err(|e| {
        error!("Failed to issue session for {}: {:#}", session.user_id, e);
        ExchangeError::SessionIssueFailed(e)
    })?;
    let issued = IssuedSession { session, token };
    let redirect = resolve_redirect(redirect_to, &state.landing_path);

    let owner_id = provider_session.user_id;
    let fingerprint = token_fingerprint(&provider_session.access_token);
    let record_id = Uuid::new_v4().to_string();
    let created_at = now.to_rfc3339();
    let oid = owner_id.clone();
    let access_token = provider_session.access_token;

    let persisted = with_db(state, move |db| {
        db.insert_token(&record_id, &oid, &access_token, &created_at)
    })
    .await;

    if let Err(source) = persisted {
        // Orphaned session: the user is logged in but has no token on file.
        error!(
            owner_id = %owner_id,
            token_fingerprint = %fingerprint,
            "Provider token persistence failed: {:#}",
            source
        );
        return Err(ExchangeError::PersistenceFailed { issued, source });
    }

    info!(owner_id = %owner_id, token_fingerprint = %fingerprint, "Session established");
    Ok(ExchangeOutcome { redirect, issued })
}

/// Only same-origin absolute paths are honoured; anything else lands on
/// `landing_path`.
pub fn resolve_redirect(redirect_to: Option<&str>, landing_path: &str) -> RedirectInstruction {
    let location = match redirect_to {
        Some(path) if is_local_path(path) => path.to_string(),
        _ => landing_path.to_string(),
    };
    RedirectInstruction { location }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.starts_with("/\\")
        && path.chars().all(|c| c.is_ascii_graphic())
}

fn create_token(secret: &str, user_id: &str, ttl: chrono::Duration) -> anyhow::Result<String> {
    let expires_at = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("session lifetime of {} is out of range", ttl))?;
    if ttl <= chrono::Duration::zero() {
        anyhow::bail!("session lifetime must be positive, got {}", ttl);
    }

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expires_at.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Short digest used to correlate log lines with a stored token without
/// writing the token itself to the log.
fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..8])
}

fn session_cookie(token: &str, ttl: chrono::Duration) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        ttl.num_seconds()
    )
}

/// GET /auth/callback?code=..&redirect_to=..
pub async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
    let redirect_to = query.redirect_to.as_deref();

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        let redirect = resolve_redirect(redirect_to, &state.landing_path);
        return (StatusCode::FOUND, [(header::LOCATION, redirect.location)]).into_response();
    };

    match exchange_and_persist(&state, code, redirect_to).await {
        Ok(outcome) => (
            StatusCode::FOUND,
            [
                (header::LOCATION, outcome.redirect.location),
                (header::SET_COOKIE, session_cookie(&outcome.issued.token, state.session_ttl)),
            ],
        )
            .into_response(),
        Err(e) => {
            let cookie = e
                .issued_session()
                .map(|issued| session_cookie(&issued.token, state.session_ttl));
            let mut response = ApiError::from(e).into_response();
            if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            response
        }
    }
}

/// GET /auth/session: who the caller is and whether a provider token is on
/// file for them.
pub async fn current_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SessionResponse>, ApiError> {
    let owner_id = claims.sub.clone();
    let tokens = with_db(&state, move |db| db.count_tokens_for_owner(&owner_id)).await?;

    Ok(Json(SessionResponse {
        user_id: claims.sub,
        token_on_file: tokens > 0,
    }))
}
