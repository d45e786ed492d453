use axum::{Json, extract::State, response::IntoResponse};
use tracing::{debug, info};

use technews_db::models::LoginOutcome;
use technews_types::api::{LoginRequest, LoginResponse};
use technews_types::models::User;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_blocking};

/// Both failure cases get the same message so a caller cannot test for
/// registered emails.
const LOGIN_FAILED: &str = "Incorrect email or password";

/// POST /api/users/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        debug!("Login rejected: email or password missing");
        return Err(ApiError::BadRequest(LOGIN_FAILED.to_string()));
    };

    let lookup = email.clone();
    let outcome = run_blocking(&state, move |db| db.authenticate(&lookup, &password)).await?;

    match outcome {
        LoginOutcome::Verified(row) => {
            info!("User {} logged in", row.id);
            // The row carries the password hash; the response type does not.
            Ok(Json(LoginResponse {
                user: User::from(row),
                message: "You are now logged in!".to_string(),
            }))
        }
        LoginOutcome::UnknownEmail => {
            debug!("Login rejected: no user with email {}", email);
            Err(ApiError::BadRequest(LOGIN_FAILED.to_string()))
        }
        LoginOutcome::PasswordMismatch => {
            debug!("Login rejected: wrong password for {}", email);
            Err(ApiError::BadRequest(LOGIN_FAILED.to_string()))
        }
    }
}
