use crate::api::AppState;
use crate::api::client_context::ClientContext;
use crate::api::cookies::read_refresh_cookie;
use crate::api::middleware::AuthUser;
use crate::api::schemas::{LoginRequest, RefreshRequest, TokenPairResponse};
use crate::core::session::TokenPair;
use crate::error::{AppError, Result};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};

pub async fn login(
    State(state): State<AppState>,
    ClientContext(context): ClientContext,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    let Some(pair) = state.accounts.login(&payload.email, &payload.password, &context).await? else {
        return Err(AppError::AuthError);
    };

    issued(&state, pair)
}

pub async fn refresh(
    State(state): State<AppState>,
    ClientContext(context): ClientContext,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let presented = presented_refresh_token(&headers, &body)?
        .ok_or_else(|| AppError::BadRequest("Missing refresh token".into()))?;

    match state.sessions.rotate_session(&presented, &context).await? {
        Some(pair) => issued(&state, pair),
        None => {
            let cleared = state.cookies.cleared_cookie().map_err(|_| AppError::Internal)?;
            Ok(([(SET_COOKIE, cleared)], AppError::AuthError).into_response())
        }
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    if let Some(presented) = presented_refresh_token(&headers, &body).unwrap_or_default() {
        state.sessions.revoke_session(&presented).await?;
    }

    signed_out(&state)
}

pub async fn logout_all(auth_user: AuthUser, State(state): State<AppState>) -> Result<Response> {
    state.sessions.revoke_all_sessions(auth_user.user_id).await?;
    signed_out(&state)
}

fn issued(state: &AppState, pair: TokenPair) -> Result<Response> {
    let cookie = state.cookies.refresh_cookie(&pair.refresh_token).map_err(|_| AppError::Internal)?;
    Ok(([(SET_COOKIE, cookie)], Json(TokenPairResponse::from(pair))).into_response())
}

fn signed_out(state: &AppState) -> Result<Response> {
    let cleared = state.cookies.cleared_cookie().map_err(|_| AppError::Internal)?;
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cleared)]).into_response())
}

/// The cookie wins over the body. An empty body is fine; a non-JSON one is a bad request.
fn presented_refresh_token(headers: &HeaderMap, body: &Bytes) -> Result<Option<String>> {
    if let Some(token) = read_refresh_cookie(headers) {
        return Ok(Some(token));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let payload: RefreshRequest =
        serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?;

    Ok(payload.refresh_token.filter(|t| !t.trim().is_empty()))
}
