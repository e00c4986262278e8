//! Authentication handlers.

use actix_web::{HttpResponse, http::StatusCode, web};

use quill_core::domain::User;
use quill_core::services::accounts::{self, LoginInput, RegisterInput};
use quill_shared::dto::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};

use crate::envelope;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /v1/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let input = RegisterInput {
        name: req.name.unwrap_or_default(),
        username: req.username.unwrap_or_default(),
        email: req.email.unwrap_or_default(),
        password: req.password.unwrap_or_default(),
    };
    input.validate()?;

    let tx = state.store.begin().await?;
    let outcome = accounts::register(tx.as_ref(), state.passwords.as_ref(), input).await;
    let account = envelope::commit_or_rollback(tx, outcome).await?;

    tracing::info!(user_id = %account.user.id, "User registered");

    Ok(envelope::success(
        StatusCode::CREATED,
        "Registration successful",
        user_response(&account.user, &account.name),
    ))
}

/// POST /v1/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let input = LoginInput {
        email: req.email.unwrap_or_default(),
        password: req.password.unwrap_or_default(),
    };
    input.validate()?;

    let users = state.store.users();
    let user = accounts::authenticate(
        users,
        state.passwords.as_ref(),
        &input.email,
        &input.password,
    )
    .await?;

    let name = users
        .find_author(user.id)
        .await?
        .map(|author| author.name)
        .unwrap_or_else(|| user.username.clone());

    let token = state
        .tokens
        .generate_token(user.id, &user.email, user.role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(envelope::success(
        StatusCode::OK,
        "Login successful",
        AuthResponse {
            user: user_response(&user, &name),
            token,
            token_type: "Bearer".to_string(),
            expires_in: state.tokens.expiration_seconds(),
        },
    ))
}

fn user_response(user: &User, name: &str) -> UserResponse {
    UserResponse {
        id: user.id,
        name: name.to_string(),
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role.to_string(),
        created_at: user.created_at.to_rfc3339(),
    }
}

