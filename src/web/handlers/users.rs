use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::middleware::{AdminOnly, RequireRole},
    database::queries::UserChanges,
    errors::AppError,
    models::User,
    state::AppState,
    web::pagination::{PageQuery, Paginated, Pagination},
};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub login: String,
    pub name: Option<String>,
    pub role: String,
    pub password: String,
}

pub async fn create(
    State(state): State<AppState>,
    _user: RequireRole<AdminOnly>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, AppError> {
    if req.login.is_empty() || req.password.is_empty() || req.role.is_empty() {
        return Err(AppError::InvalidInput(
            "login, role and password are required".to_owned(),
        ));
    }

    let user = state
        .users
        .create(User {
            id: Uuid::new_v4(),
            login: req.login,
            name: req.name,
            role: req.role,
            password: req.password,
            created_at: Utc::now(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list(
    State(state): State<AppState>,
    _user: RequireRole<AdminOnly>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (page, limit) = query.clamp();
    let (items, total) = state.users.list(page, limit).await?;
    Ok(Json(Paginated {
        items,
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn get(
    State(state): State<AppState>,
    _user: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse + std::fmt::Debug, AppError> {
    let user = state.users.find_by_id(id).await.map_err(AppError::from)?;
    Ok(Json(user))
}

pub async fn update(
    State(state): State<AppState>,
    _user: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(changes): Json<UserChanges>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users.update(id, changes).await?;
    Ok(Json(user))
}

pub async fn delete(
    State(state): State<AppState>,
    _user: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users.delete(id).await?;
    Ok(Json(user))
}
