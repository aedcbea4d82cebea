//! Session handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;

use weiser_core::error::AppError;

use crate::dto::response::{ApiResponse, SessionResponse, SessionValueResponse};
use crate::error::ApiError;
use crate::extractors::session::SessionHandle;
use crate::state::AppState;

/// Longest accepted data key.
const MAX_KEY_LEN: usize = 128;

fn validate_key(key: &str) -> Result<(), ApiError> {
    if key.trim().is_empty() || key.len() > MAX_KEY_LEN {
        return Err(AppError::validation(format!(
            "Session keys must be 1 to {MAX_KEY_LEN} bytes"
        ))
        .into());
    }
    Ok(())
}

/// GET /api/session
pub async fn get_session(
    session: SessionHandle,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let current = session.reload().await?;
    Ok(Json(ApiResponse::ok(current.into())))
}

/// GET /api/session/data/{key}
pub async fn get_value(
    session: SessionHandle,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<SessionValueResponse>>, ApiError> {
    validate_key(&key)?;
    let value = session.get(&key).await?;
    Ok(Json(ApiResponse::ok(SessionValueResponse { key, value })))
}

/// PUT /api/session/data/{key}
///
/// Stores the JSON body under `key` and re-issues the cookie with the
/// refreshed expiry.
pub async fn put_value(
    State(state): State<AppState>,
    session: SessionHandle,
    jar: CookieJar,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> Result<(CookieJar, Json<ApiResponse<SessionResponse>>), ApiError> {
    validate_key(&key)?;
    let updated = session.set(&key, value).await?;
    let jar = state
        .cookies
        .set_cookie(jar, &updated.id, updated.expires_at);
    Ok((jar, Json(ApiResponse::ok(updated.into()))))
}

/// DELETE /api/session/data/{key}
pub async fn delete_value(
    State(state): State<AppState>,
    session: SessionHandle,
    jar: CookieJar,
    Path(key): Path<String>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    validate_key(&key)?;
    session.delete(&key).await?;
    let refreshed = session.reload().await?;
    let jar = state
        .cookies
        .set_cookie(jar, &refreshed.id, refreshed.expires_at);
    Ok((jar, StatusCode::NO_CONTENT))
}

/// DELETE /api/session
///
/// Removes the session and expires the cookie.
pub async fn clear_session(
    State(state): State<AppState>,
    session: SessionHandle,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    session.clear().await?;
    Ok((state.cookies.remove_cookie(jar), StatusCode::NO_CONTENT))
}
