//! Authentication middleware

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use shared::error::{AppError, ErrorCode};

use super::jwt::{CurrentUser, JwtError, JwtService, TOKEN_TYPE_ACCESS};
use crate::db;
use crate::error::ServiceError;
use crate::security_log;
use crate::state::AppState;

/// Resolve the bearer token of a request into a [`CurrentUser`]
fn authenticate(
    jwt: &JwtService,
    headers: &http::HeaderMap,
    uri: &http::Uri,
) -> Result<CurrentUser, AppError> {
    let auth_header = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => return Err(AppError::unauthorized()),
    };

    let claims = jwt.validate_kind(token, TOKEN_TYPE_ACCESS).map_err(|e| {
        security_log!(WARN, "auth_failed", error = %e, uri = %uri);
        match e {
            JwtError::ExpiredToken => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;

    CurrentUser::try_from(claims)
        .map_err(|e| AppError::invalid_token(format!("Malformed JWT claims: {e}")))
}

/// Check the token's account against the database. Disabled or deleted
/// accounts are refused and `is_staff` comes from the row, so demotion takes
/// effect before the token expires.
async fn load_account(state: &AppState, claimed: CurrentUser) -> Result<CurrentUser, AppError> {
    let account = db::users::find_by_id(&state.pool, claimed.id)
        .await
        .map_err(|e| AppError::from(ServiceError::from(e)))?;

    match account {
        None => {
            security_log!(WARN, "auth_unknown_account", user_id = claimed.id);
            Err(AppError::invalid_token("Account no longer exists"))
        }
        Some(user) if !user.is_active => {
            security_log!(WARN, "auth_disabled_account", user_id = user.id);
            Err(AppError::new(ErrorCode::AccountDisabled))
        }
        Some(user) => {
            if user.is_staff != claimed.is_staff {
                security_log!(INFO, "auth_staff_changed", user_id = user.id, is_staff = user.is_staff);
            }
            Ok(CurrentUser {
                id: user.id,
                email: user.email,
                is_staff: user.is_staff,
            })
        }
    }
}

/// Require a valid access token.
///
/// Extracts `Authorization: Bearer <token>` and inserts [`CurrentUser`] into
/// the request extensions.
///
/// | Failure | Response |
/// |---------|----------|
/// | no header | 401 NotAuthenticated |
/// | expired token | 401 TokenExpired |
/// | disabled account | 401 AccountDisabled |
/// | anything else | 401 TokenInvalid |
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let claimed = authenticate(&state.jwt, req.headers(), req.uri())?;
    let user = load_account(&state, claimed).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Require a staff account. Must run after [`require_auth`].
pub async fn require_staff(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(AppError::unauthorized)?;

    if !user.is_staff {
        security_log!(WARN, "staff_required", user_id = user.id, uri = %req.uri());
        return Err(AppError::new(ErrorCode::AdminRequired));
    }

    Ok(next.run(req).await)
}

/// Handlers can take `CurrentUser` directly; the value set by
/// [`require_auth`] is reused when present.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let claimed = authenticate(&state.jwt, &parts.headers, &parts.uri)?;
        let user = load_account(state, claimed).await?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
