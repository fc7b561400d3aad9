use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::{errors::AppError, models::User, state::AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, AppError> {
    if req.login.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "login and password are required".to_owned(),
        ));
    }

    let (user, access_token, refresh_token) = state.auth.login(&req.login, &req.password).await?;
    Ok(Json(LoginResponse {
        user,
        access_token,
        refresh_token,
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.refresh_token.is_empty() {
        return Err(AppError::InvalidInput("refresh_token is required".to_owned()));
    }

    let (access_token, refresh_token) = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(TokenPairResponse {
        access_token,
        refresh_token,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout(&req.refresh_token).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_app_state;
    use axum::http::StatusCode;
    use chrono::Utc;
    use uuid::Uuid;

    fn seed_user(ts: &crate::test_utils::TestState) {
        ts.users.insert(User {
            id: Uuid::new_v4(),
            login: "alice123".to_owned(),
            name: None,
            role: "editor".to_owned(),
            password: "secret1".to_owned(),
            created_at: Utc::now(),
        });
    }

    #[tokio::test]
    async fn login_returns_token_pair() {
        let ts = test_app_state();
        seed_user(&ts);

        let resp = login(
            State(ts.state.clone()),
            Json(LoginRequest {
                login: "alice123".to_owned(),
                password: "secret1".to_owned(),
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_with_blank_credentials_is_rejected() {
        let ts = test_app_state();

        let err = login(
            State(ts.state.clone()),
            Json(LoginRequest {
                login: String::new(),
                password: String::new(),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn logout_of_unknown_token_succeeds() {
        let ts = test_app_state();

        logout(
            State(ts.state.clone()),
            Json(LogoutRequest {
                refresh_token: "never-issued".to_owned(),
            }),
        )
        .await
        .unwrap();
    }
}
