use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{instrument, warn};

use crate::shared::{AppError, AppState};

/// Bearer-token authentication middleware: validates the Authorization
/// header and attaches `UserClaims` to the request.
/// Usage: `.layer(middleware::from_fn_with_state(app_state.clone(), auth::jwt_auth))`.
/// Handlers extract `Extension(claims): Extension<UserClaims>`.
#[instrument(skip(state, req, next))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header in request");
            AppError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid Authorization header format (expected Bearer token)");
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    let claims = match state.token_config.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("Authentication failed: {}", e);
            return Err(AppError::Unauthorized("Invalid session token".to_string()));
        }
    };

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
