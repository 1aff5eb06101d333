//! Auth API Handlers

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{
    AuthResponse, ChangePasswordRequest, Customer, CustomerCreate, LoginRequest, RefreshRequest,
    RegisterRequest, TokenPair, User,
};
use validator::Validate;

use crate::auth::jwt::TOKEN_TYPE_REFRESH;
use crate::auth::{CurrentUser, JwtError};
use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::security_log;
use crate::state::AppState;
use crate::util::{hash_password, normalize_email, verify_password};

fn issue(state: &AppState, user: &User) -> AppResult<TokenPair> {
    state
        .jwt
        .issue_pair(user)
        .map_err(|e| AppError::internal(format!("Failed to issue tokens: {e}")))
}

fn hash(password: &str) -> AppResult<String> {
    hash_password(password).map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
}

/// POST /api/auth/register - create an account and its customer profile
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ServiceResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;
    let email = normalize_email(&req.email);

    if db::users::email_exists(&state.pool, &email).await? {
        return Err(AppError::new(ErrorCode::EmailExists)
            .with_detail("email", email)
            .into());
    }

    let password_hash = hash(&req.password)?;
    let profile = CustomerCreate {
        first_name: req.first_name,
        last_name: req.last_name,
        email: email.clone(),
        phone: req.phone,
        address: None,
        city: None,
        country: None,
    };

    let user_id = register_account(&state, &email, &password_hash, &profile).await?;
    let user = db::users::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::internal("Registered user not found"))?;

    security_log!(INFO, "user_registered", user_id = user.id, email = %user.email);
    let tokens = issue(&state, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { tokens, user })))
}

/// User + profile in one transaction. An existing profile with the same
/// email is never adopted: signing up cannot take over a staff-created
/// customer record and its order history.
async fn register_account(
    state: &AppState,
    email: &str,
    password_hash: &str,
    profile: &CustomerCreate,
) -> Result<i64, ServiceError> {
    let mut tx = state.pool.begin().await?;
    let user_id = db::users::insert(&mut *tx, email, password_hash, false)
        .await
        .map_err(|e| {
            if crate::error::is_unique_violation(&e) {
                AppError::new(ErrorCode::EmailExists).into()
            } else {
                ServiceError::from(e)
            }
        })?;

    // Fails with CustomerEmailExists when a profile already holds the email
    db::customers::insert(&mut *tx, Some(user_id), profile).await?;

    tx.commit().await?;
    Ok(user_id)
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ServiceResult<Json<AuthResponse>> {
    let email = normalize_email(&req.email);
    let creds = db::users::find_credentials(&state.pool, &email).await?;

    let Some(creds) = creds.filter(|c| verify_password(&req.password, &c.password_hash)) else {
        security_log!(WARN, "login_failed", email = %email);
        return Err(AppError::invalid_credentials().into());
    };

    if !creds.is_active {
        security_log!(WARN, "login_disabled_account", user_id = creds.id);
        return Err(AppError::new(ErrorCode::AccountDisabled).into());
    }

    db::users::touch_last_login(&state.pool, creds.id).await?;
    let mut user = User::from(creds);
    user.last_login_at = Some(crate::util::now_millis());

    let tokens = issue(&state, &user)?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(AuthResponse { tokens, user }))
}

/// POST /api/auth/refresh - trade a refresh token for a new pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ServiceResult<Json<TokenPair>> {
    let claims = state
        .jwt
        .validate_kind(&req.refresh_token, TOKEN_TYPE_REFRESH)
        .map_err(|e| {
            security_log!(WARN, "refresh_rejected", error = %e);
            match e {
                JwtError::ExpiredToken => AppError::token_expired(),
                _ => AppError::invalid_token("Invalid refresh token"),
            }
        })?;
    let current = CurrentUser::try_from(claims)
        .map_err(|e| AppError::invalid_token(e.to_string()))?;

    let user = db::users::find_by_id(&state.pool, current.id)
        .await?
        .ok_or_else(|| AppError::invalid_token("Unknown user"))?;
    if !user.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled).into());
    }

    Ok(Json(issue(&state, &user)?))
}

#[derive(Serialize)]
pub struct MeResponse {
    user: User,
    customer: Option<Customer>,
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ServiceResult<Json<MeResponse>> {
    let user = db::users::find_by_id(&state.pool, current.id)
        .await?
        .ok_or_else(AppError::unauthorized)?;
    let customer = db::customers::find_by_user(&state.pool, current.id).await?;
    Ok(Json(MeResponse { user, customer }))
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ServiceResult<Json<ApiResponse<()>>> {
    req.validate()?;

    let creds = db::users::find_credentials_by_id(&state.pool, current.id)
        .await?
        .ok_or_else(AppError::unauthorized)?;
    if !verify_password(&req.current_password, &creds.password_hash) {
        security_log!(WARN, "password_change_failed", user_id = current.id);
        return Err(AppError::validation("Current password is incorrect")
            .with_detail("current_password", "incorrect")
            .into());
    }

    let new_hash = hash(&req.new_password)?;
    db::users::update_password(&state.pool, current.id, &new_hash)
        .await?;

    security_log!(INFO, "password_changed", user_id = current.id);
    Ok(Json(ApiResponse::ok()))
}
