//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AuthError, AuthResult},
    middleware::{CurrentAccount, auth_middleware, require_role},
    models::{Account, LoginCredentials, Role},
    session::TokenPair,
};

/// Response for token issuance (login and refresh)
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Request carrying a refresh token (refresh and logout)
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Response for account creation
#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// Admin request for account creation
#[derive(Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Deserialize)]
pub struct UpdateEmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct UpdatePasswordRequest {
    pub password: String,
}

/// Unwrap a JSON body, reporting malformed payloads as validation failures
fn payload<T>(body: Result<Json<T>, JsonRejection>) -> AuthResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            warn!("Malformed request body: {}", rejection.body_text());
            Err(AuthError::Validation(rejection.body_text()))
        }
    }
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout));

    let authenticated = Router::new()
        .route("/persons/me", get(current_account))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    // Layers run outermost-last: authentication precedes the role check
    let admin = Router::new()
        .route("/persons", post(create_account).get(find_account_by_email))
        .route("/persons/:id", get(find_account).delete(delete_account))
        .route("/persons/:id/email", put(update_email))
        .route("/persons/:id/password", put(update_password))
        .route_layer(from_fn_with_state(Role::Admin, require_role))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/v1", public.merge(authenticated).merge(admin))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

fn token_response(state: &AppState, pair: TokenPair) -> TokenResponse {
    TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.session_manager.jwt_service().access_token_expiry(),
    }
}

/// Self-service registration endpoint
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<LoginCredentials>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let credentials = payload(body)?;
    let account = state
        .account_service
        .register(&credentials.email, &credentials.password)
        .await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: account.id })))
}

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginCredentials>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let credentials = payload(body)?;
    info!("Login attempt");

    let pair = state
        .session_manager
        .login(&credentials.email, &credentials.password)
        .await?;

    Ok((StatusCode::OK, Json(token_response(&state, pair))))
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AppState>,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let request = payload(body)?;
    info!("Token refresh request");

    let pair = state.session_manager.refresh(&request.refresh_token).await?;

    Ok((StatusCode::OK, Json(token_response(&state, pair))))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> AuthResult<StatusCode> {
    let request = payload(body)?;
    info!("Logout request");

    state.session_manager.logout(&request.refresh_token).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own account
pub async fn current_account(
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Json<Account> {
    Json(account)
}

pub async fn create_account(
    State(state): State<AppState>,
    body: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let request = payload(body)?;
    let account = state
        .account_service
        .create_with_role(&request.email, &request.password, request.role)
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn find_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AuthResult<Json<Account>> {
    Ok(Json(state.account_service.find_by_id(id).await?))
}

pub async fn find_account_by_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> AuthResult<Json<Account>> {
    Ok(Json(state.account_service.find_by_email(&query.email).await?))
}

pub async fn update_email(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateEmailRequest>, JsonRejection>,
) -> AuthResult<StatusCode> {
    let request = payload(body)?;
    state.account_service.update_email(id, &request.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> AuthResult<StatusCode> {
    let request = payload(body)?;
    state
        .account_service
        .update_password(id, &request.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AuthResult<StatusCode> {
    state.account_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
