//! Middleware for access token validation and role checks

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{
    AppState,
    error::{AuthError, AuthResult},
    models::{Account, Role},
};

/// The authenticated account, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

/// Extract the token of an `Authorization: Bearer <token>` header value.
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Validate the access token and load the live account it names
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> AuthResult<Response> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AuthError::Unauthorized)?;

    let claims = state
        .session_manager
        .jwt_service()
        .validate_access_token(token)
        .map_err(|e| {
            warn!("Access token rejected: {}", e);
            AuthError::Unauthorized
        })?;

    // Tokens outlive deletions; the account must still be live
    let account = match state.account_service.find_by_id(claims.sub).await {
        Ok(account) => account,
        Err(AuthError::AccountNotFound) => {
            warn!(account_id = %claims.sub, "Access token names a missing account");
            return Err(AuthError::Unauthorized);
        }
        Err(e) => return Err(e),
    };

    req.extensions_mut().insert(CurrentAccount(account));

    Ok(next.run(req).await)
}

/// Reject requests whose account does not satisfy `required`.
///
/// Mount with `from_fn_with_state(Role::Admin, require_role)` inside
/// [`auth_middleware`].
pub async fn require_role(
    State(required): State<Role>,
    req: Request<Body>,
    next: Next,
) -> AuthResult<Response> {
    let CurrentAccount(account) = req
        .extensions()
        .get::<CurrentAccount>()
        .ok_or(AuthError::Unauthorized)?;

    if !account.role.satisfies(required) {
        warn!(account_id = %account.id, role = %account.role, %required, "Role check failed");
        return Err(AuthError::Forbidden);
    }

    Ok(next.run(req).await)
}
