//! Account API handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::dto::account::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, RoleMembershipResponse,
    RolesResponse, UserInfo,
};
use crate::api::dto::ApiResponse;
use crate::api::validated_json::ValidatedJson;
use crate::application::{AccountError, AccountService, RoleUpdate};
use crate::auth::AuthenticatedUser;

/// Account handler state
#[derive(Clone)]
pub struct AccountHandlerState {
    pub service: Arc<AccountService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/account/login",
    tag = "Account",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Token issuance not configured")
    )
)]
pub async fn login(
    State(state): State<AccountHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, (StatusCode, Json<ApiResponse<LoginResponse>>)> {
    let session = state
        .service
        .login(&request.username, &request.password)
        .map_err(|err| match err {
            AccountError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Invalid credentials")),
            ),
            AccountError::Token(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(err.to_string())),
            ),
        })?;

    let response = LoginResponse {
        token: session.token,
        token_type: "Bearer".to_string(),
        expires_at: session.expires_at,
        user: UserInfo {
            username: session.username,
            role: session.role,
        },
    };

    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/account/me",
    tag = "Account",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user and roles", body = ApiResponse<RolesResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    State(state): State<AccountHandlerState>,
    user: Option<axum::Extension<AuthenticatedUser>>,
) -> Result<Json<ApiResponse<RolesResponse>>, (StatusCode, Json<ApiResponse<RolesResponse>>)> {
    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Not authenticated")),
        ));
    };

    // Roles come from the directory, not the token, so a grant made after
    // login is visible immediately.
    let roles = state.service.query_roles(&user.username);
    Ok(Json(ApiResponse::success(RolesResponse {
        username: user.username.clone(),
        roles,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/register",
    tag = "Account",
    security(("bearer_auth" = [])),
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registration accepted; an existing username is left unchanged", body = ApiResponse<RegisterResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn register(
    State(state): State<AccountHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Json<ApiResponse<RegisterResponse>> {
    let username = state.service.register(&request.username, &request.password);
    Json(ApiResponse::success(RegisterResponse { username }))
}

#[utoipa::path(
    get,
    path = "/api/v1/account/{username}/roles",
    tag = "Account",
    security(("bearer_auth" = [])),
    params(
        ("username" = String, Path, description = "Target user")
    ),
    responses(
        (status = 200, description = "Roles of the user, empty for unknown users", body = ApiResponse<RolesResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn get_roles(
    State(state): State<AccountHandlerState>,
    Path(username): Path<String>,
) -> Json<ApiResponse<RolesResponse>> {
    let roles = state.service.query_roles(&username);
    Json(ApiResponse::success(RolesResponse { username, roles }))
}

#[utoipa::path(
    put,
    path = "/api/v1/account/{username}/roles/{role}",
    tag = "Account",
    security(("bearer_auth" = [])),
    params(
        ("username" = String, Path, description = "Target user"),
        ("role" = String, Path, description = "Role to grant")
    ),
    responses(
        (status = 200, description = "Roles after the grant; unknown users are a no-op", body = ApiResponse<RolesResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn grant_role(
    State(state): State<AccountHandlerState>,
    Path((username, role)): Path<(String, String)>,
) -> Json<ApiResponse<RolesResponse>> {
    state.service.set_role(&username, &role, RoleUpdate::Grant);
    let roles = state.service.query_roles(&username);
    Json(ApiResponse::success(RolesResponse { username, roles }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/account/{username}/roles/{role}",
    tag = "Account",
    security(("bearer_auth" = [])),
    params(
        ("username" = String, Path, description = "Target user"),
        ("role" = String, Path, description = "Role to revoke")
    ),
    responses(
        (status = 200, description = "Roles after the revocation; unknown users are a no-op", body = ApiResponse<RolesResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn revoke_role(
    State(state): State<AccountHandlerState>,
    Path((username, role)): Path<(String, String)>,
) -> Json<ApiResponse<RolesResponse>> {
    state.service.set_role(&username, &role, RoleUpdate::Revoke);
    let roles = state.service.query_roles(&username);
    Json(ApiResponse::success(RolesResponse { username, roles }))
}

#[utoipa::path(
    get,
    path = "/api/v1/account/{username}/roles/{role}",
    tag = "Account",
    security(("bearer_auth" = [])),
    params(
        ("username" = String, Path, description = "Target user"),
        ("role" = String, Path, description = "Role to check")
    ),
    responses(
        (status = 200, description = "Membership flag, false for unknown users", body = ApiResponse<RoleMembershipResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn check_role(
    State(state): State<AccountHandlerState>,
    Path((username, role)): Path<(String, String)>,
) -> Json<ApiResponse<RoleMembershipResponse>> {
    let is_member = state.service.is_in_role(&username, &role);
    Json(ApiResponse::success(RoleMembershipResponse {
        username,
        role,
        is_member,
    }))
}
