use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use tutuca_types::api::Claims;
use tutuca_types::models::UserType;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::with_db;

/// Extract and validate the session JWT from the Authorization header, then
/// check the session has not been signed out.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let unauthorized = || ApiError::Unauthorized("Not authenticated".into());

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| unauthorized())?
    .claims;

    let sid = claims.sid.to_string();
    let sub = claims.sub.to_string();
    let live = with_db(&state, move |db| db.is_session_active(&sid, &sub)).await?;
    if !live {
        return Err(ApiError::Unauthorized("Session has ended".into()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Rejects callers whose account type is not `expected`.
pub fn require_user_type(claims: &Claims, expected: UserType, action: &str) -> Result<(), ApiError> {
    if claims.user_type == expected {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Only {} accounts can {}",
            expected, action
        )))
    }
}
