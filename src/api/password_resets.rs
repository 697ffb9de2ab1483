use crate::api::AppState;
use crate::api::client_context::ClientContext;
use crate::api::schemas::{ForgotPasswordRequest, PasswordResetConfirm};
use crate::error::{AppError, Result};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// Always 202, whether or not the email belongs to an account.
pub async fn request(
    State(state): State<AppState>,
    ClientContext(context): ClientContext,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse> {
    state.accounts.forgot_password(&payload.email, &context).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn confirm(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetConfirm>,
) -> Result<impl IntoResponse> {
    if !state.accounts.reset_password(&payload.token, &payload.new_password).await? {
        return Err(AppError::AuthError);
    }

    Ok(StatusCode::NO_CONTENT)
}
