//! Session middleware: binds every request to a live session.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::error::ApiError;
use crate::extractors::session::CurrentSession;
use crate::state::AppState;

/// Resolves the session named by the cookie, or starts one when there is
/// no cookie.
///
/// An unknown or expired session is rejected with 401 and the cookie is
/// dropped so the next request starts fresh. A backend failure is a 503.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let manager = &state.session_manager;

    let (session, jar) = match state.cookies.get_cookie(&jar) {
        None => match manager.start_session().await {
            Ok(session) => {
                let jar = state
                    .cookies
                    .set_cookie(jar, &session.id, session.expires_at);
                (session, jar)
            }
            Err(e) => return ApiError(e).into_response(),
        },
        Some(id) => match manager.check_expiration(&id).await {
            Ok(session) => (session, jar),
            Err(e) if e.is_session_gone() => {
                debug!(
                    session_id = %id,
                    kind = %e.kind,
                    "Rejected request with stale session cookie"
                );
                return (state.cookies.remove_cookie(jar), ApiError(e)).into_response();
            }
            Err(e) => return ApiError(e).into_response(),
        },
    };

    request.extensions_mut().insert(CurrentSession(session));
    let response = next.run(request).await;

    // A handler that re-issued the cookie carries the fresher expiry.
    if sets_cookie(&response, state.cookies.name()) {
        return response;
    }
    (jar, response).into_response()
}

fn sets_cookie(response: &Response, name: &str) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.strip_prefix(name).is_some_and(|rest| rest.starts_with('=')))
}
