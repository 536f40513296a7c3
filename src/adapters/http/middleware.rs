use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{adapters::http::app_state::AppState, app_error::AppError, application::jwt};

pub const ADMIN_COOKIE: &str = "admin_token";

/// Gate for admin endpoints. Handlers behind this layer may assume the
/// caller is authorized.
pub async fn admin_auth(
    State(app_state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(cookie) = jar.get(ADMIN_COOKIE) else {
        return Err(AppError::Unauthorized);
    };
    jwt::verify(cookie.value(), &app_state.config.jwt_secret)?;
    Ok(next.run(request).await)
}
