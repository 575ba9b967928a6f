//! User administration request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use shopfloor_core::models::user::{User, UserProfile};
use shopfloor_core::users::{NewUser, UserPatch};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AssignSupervisorResponse, MessageResponse};

fn profiles(users: Vec<User>) -> Vec<UserProfile> {
    users.iter().map(User::profile).collect()
}

/// `POST /users`
pub async fn create_user_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<NewUser>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let user = state.users.create(&caller.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(user.profile())))
}

/// `GET /users`
pub async fn list_users_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<UserProfile>>> {
    let users = state.users.list(&caller.principal()).await?;
    Ok(Json(profiles(users)))
}

/// `GET /users/{id}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<UserProfile>> {
    let user = state.users.get(&caller.principal(), &id).await?;
    Ok(Json(user.profile()))
}

/// `PUT /users/{id}`
pub async fn update_user_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<UserPatch>,
) -> AppResult<Json<UserProfile>> {
    let user = state.users.update(&caller.principal(), &id, body).await?;
    Ok(Json(user.profile()))
}

/// `DELETE /users/{id}`
pub async fn delete_user_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<MessageResponse>> {
    state.users.delete(&caller.principal(), &id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// `GET /users/type/{role}`
pub async fn list_by_role_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(role): ApiPath<String>,
) -> AppResult<Json<Vec<UserProfile>>> {
    let users = state.users.list_by_role(&caller.principal(), &role).await?;
    Ok(Json(profiles(users)))
}

/// `PUT /users/{id}/supervisor/{supervisor_id}`
pub async fn assign_supervisor_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath((id, supervisor_id)): ApiPath<(String, String)>,
) -> AppResult<Json<AssignSupervisorResponse>> {
    let technician = state
        .users
        .assign_supervisor(&caller.principal(), &id, &supervisor_id)
        .await?;
    Ok(Json(AssignSupervisorResponse {
        message: "Supervisor assigned successfully".into(),
        technician: technician.profile(),
    }))
}

/// `GET /users/supervisor/{supervisor_id}/technicians`
pub async fn technicians_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(supervisor_id): ApiPath<String>,
) -> AppResult<Json<Vec<UserProfile>>> {
    let users = state
        .users
        .technicians_of(&caller.principal(), &supervisor_id)
        .await?;
    Ok(Json(profiles(users)))
}
