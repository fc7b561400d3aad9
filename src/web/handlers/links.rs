use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::middleware::{RequireRole, Staff},
    errors::AppError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub code: String,
}

/// Mint a fresh code for a target URL.
pub async fn shorten(
    State(state): State<AppState>,
    _user: RequireRole<Staff>,
    Json(req): Json<ShortenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let code = state.short_links.short_url(&req.url).await?;
    Ok(Json(ShortenResponse { code }))
}

/// Public redirect endpoint; resolving counts the click.
pub async fn redirect(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse + std::fmt::Debug, AppError> {
    let url = state.short_links.get_url(&code).await?;
    Ok(Redirect::temporary(&url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_app_state;
    use axum::http::{header, StatusCode};

    #[tokio::test]
    async fn redirect_points_at_the_target_url() {
        let ts = test_app_state();
        let code = ts
            .state
            .short_links
            .short_url("https://example.com/room/7")
            .await
            .unwrap();

        let resp = redirect(State(ts.state.clone()), Path(code.clone()))
            .await
            .unwrap()
            .into_response();

        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://example.com/room/7"
        );
        assert_eq!(ts.links.click_count(&code), Some(1));
    }

    #[tokio::test]
    async fn redirect_for_unknown_code_is_not_found() {
        let ts = test_app_state();

        let err = redirect(State(ts.state.clone()), Path("zzz".to_owned()))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::NotFound);
    }
}
