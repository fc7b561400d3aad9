use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{
    auth::middleware::{AuthenticatedUser, RequireRole, Staff},
    database::queries::{MeetingChanges, MeetingListQuery, SortOrder},
    errors::AppError,
    models::{Meeting, MeetingStatus},
    state::AppState,
    web::pagination::{PageQuery, Paginated, Pagination},
};

#[derive(Debug, Default, Deserialize)]
pub struct MeetingQueryParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<MeetingStatus>,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
}

/// Open to unauthenticated callers so customers can book meetings.
pub async fn create(
    State(state): State<AppState>,
    Json(fields): Json<MeetingChanges>,
) -> Result<impl IntoResponse, AppError> {
    let meeting = state.meetings.create(fields).await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<MeetingQueryParams>,
) -> Result<impl IntoResponse, AppError> {
    let (page, limit) = PageQuery {
        page: params.page,
        limit: params.limit,
    }
    .clamp();
    let (items, total) = state
        .meetings
        .list(MeetingListQuery {
            page,
            limit,
            status: params.status,
            sort_by: params.sort_by,
            order: params.order,
        })
        .await?;
    Ok(Json(Paginated {
        items,
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn get(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let meeting = state.meetings.find_by_id(id).await?;
    Ok(Json(meeting))
}

/// Sparse update. A patch that carries a URL promotes a `new` meeting to
/// `approved`, and a URL the meeting did not already point at gets a
/// fresh short code stored alongside it.
pub async fn update(
    State(state): State<AppState>,
    _user: RequireRole<Staff>,
    Path(id): Path<i32>,
    Json(mut changes): Json<MeetingChanges>,
) -> Result<Json<Meeting>, AppError> {
    if let Some(url) = changes.url.clone() {
        let old = state.meetings.find_by_id(id).await?;

        if old.status == MeetingStatus::New && changes.status.is_none() {
            changes.status = Some(MeetingStatus::Approved);
        }

        if old.url.as_deref() != Some(url.as_str()) {
            let code = state.short_links.short_url(&url).await?;
            changes.short_url = Some(code);
        }
    }

    let meeting = state.meetings.update(id, changes).await?;
    Ok(Json(meeting))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::queries::MeetingStore;
    use crate::test_utils::test_app_state;
    use uuid::Uuid;

    fn caller() -> AuthenticatedUser {
        AuthenticatedUser {
            id: Uuid::new_v4(),
            role: "admin".to_owned(),
        }
    }

    fn staff() -> RequireRole<Staff> {
        RequireRole::new(caller())
    }

    #[tokio::test]
    async fn url_patch_promotes_and_mints_a_short_link() {
        let ts = test_app_state();
        let meeting = ts
            .meetings
            .create(MeetingChanges::default())
            .await
            .unwrap();
        assert_eq!(meeting.status, MeetingStatus::New);

        let Json(updated) = update(
            State(ts.state.clone()),
            staff(),
            Path(meeting.id),
            Json(MeetingChanges {
                url: Some("https://vc.example.com/room/1".to_owned()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(updated.status, MeetingStatus::Approved);
        let code = updated.short_url.expect("short link must be minted");
        assert_eq!(
            ts.state.short_links.get_url(&code).await.unwrap(),
            "https://vc.example.com/room/1"
        );
    }

    #[tokio::test]
    async fn repatching_the_same_url_keeps_the_code() {
        let ts = test_app_state();
        let meeting = ts
            .meetings
            .create(MeetingChanges::default())
            .await
            .unwrap();

        let url = "https://vc.example.com/room/2".to_owned();
        let Json(first) = update(
            State(ts.state.clone()),
            staff(),
            Path(meeting.id),
            Json(MeetingChanges {
                url: Some(url.clone()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let Json(second) = update(
            State(ts.state.clone()),
            staff(),
            Path(meeting.id),
            Json(MeetingChanges {
                url: Some(url),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(first.short_url, second.short_url);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let ts = test_app_state();
        ts.meetings
            .create(MeetingChanges::default())
            .await
            .unwrap();
        ts.meetings
            .create(MeetingChanges {
                status: Some(MeetingStatus::Canceled),
                ..Default::default()
            })
            .await
            .unwrap();

        let resp = list(
            State(ts.state.clone()),
            caller(),
            Query(MeetingQueryParams {
                status: Some(MeetingStatus::Canceled),
                ..Default::default()
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
