use crate::api::error::AppError;
use crate::services::access::Principal;
use crate::utils::auth::validate_jwt;
use crate::{AppState, entities::prelude::Users};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sea_orm::EntityTrait;
use uuid::Uuid;

fn unauthorized(reason: &str) -> AppError {
    AppError::Unauthorized(reason.to_string())
}

/// Resolves the bearer token to an existing user and attaches it as a `Principal`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    let Some(token) = token else {
        return Err(unauthorized("Missing bearer token"));
    };

    let claims = validate_jwt(&token, &state.config.jwt_secret)
        .map_err(|_| unauthorized("Invalid or expired token"))?;
    let user_id =
        Uuid::parse_str(&claims.sub).map_err(|_| unauthorized("Invalid token subject"))?;

    // Check if user still exists in DB
    let user = Users::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| unauthorized("Unknown user"))?;

    req.extensions_mut().insert(Principal::from(&user));
    Ok(next.run(req).await)
}
