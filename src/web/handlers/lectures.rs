use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    auth::middleware::{AdminOnly, RequireRole, Staff},
    database::queries::LectureChanges,
    errors::AppError,
    models::Lecture,
    state::AppState,
    web::pagination::{PageQuery, Paginated, Pagination},
};

pub async fn create(
    State(state): State<AppState>,
    _user: RequireRole<Staff>,
    Json(fields): Json<LectureChanges>,
) -> Result<impl IntoResponse + std::fmt::Debug, AppError> {
    let date = fields
        .date
        .ok_or_else(|| AppError::InvalidInput("date is required".to_owned()))?;
    let lecture = state.lectures.create(date, fields).await?;
    Ok((StatusCode::CREATED, Json(lecture)))
}

pub async fn list(
    State(state): State<AppState>,
    _user: RequireRole<Staff>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (page, limit) = query.clamp();
    let (items, total) = state.lectures.list(page, limit).await?;
    Ok(Json(Paginated {
        items,
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn get(
    State(state): State<AppState>,
    _user: RequireRole<Staff>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let lecture = state.lectures.find_by_id(id).await?;
    Ok(Json(lecture))
}

/// Sparse update; as with meetings, a URL the lecture did not already
/// point at gets a fresh short code.
pub async fn update(
    State(state): State<AppState>,
    _user: RequireRole<Staff>,
    Path(id): Path<i32>,
    Json(mut changes): Json<LectureChanges>,
) -> Result<Json<Lecture>, AppError> {
    if let Some(url) = changes.url.clone() {
        let old = state.lectures.find_by_id(id).await?;
        if old.url.as_deref() != Some(url.as_str()) {
            let code = state.short_links.short_url(&url).await?;
            changes.short_url = Some(code);
        }
    }

    let lecture = state.lectures.update(id, changes).await?;
    Ok(Json(lecture))
}

pub async fn delete(
    State(state): State<AppState>,
    _user: RequireRole<AdminOnly>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let lecture = state.lectures.delete(id).await?;
    Ok(Json(lecture))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::queries::LectureStore;
    use crate::{auth::middleware::AuthenticatedUser, test_utils::test_app_state};
    use chrono::Utc;
    use uuid::Uuid;

    fn caller() -> RequireRole<Staff> {
        RequireRole::new(AuthenticatedUser {
            id: Uuid::new_v4(),
            role: "moderator".to_owned(),
        })
    }

    #[tokio::test]
    async fn create_without_date_is_rejected() {
        let ts = test_app_state();

        let err = create(
            State(ts.state.clone()),
            caller(),
            Json(LectureChanges::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn url_patch_mints_a_short_link() {
        let ts = test_app_state();
        let lecture = ts
            .lectures
            .create(Utc::now(), LectureChanges::default())
            .await
            .unwrap();

        let Json(updated) = update(
            State(ts.state.clone()),
            caller(),
            Path(lecture.id),
            Json(LectureChanges {
                url: Some("https://vc.example.com/lecture/5".to_owned()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let code = updated.short_url.expect("short link must be minted");
        assert_eq!(
            ts.state.short_links.get_url(&code).await.unwrap(),
            "https://vc.example.com/lecture/5"
        );
    }
}
