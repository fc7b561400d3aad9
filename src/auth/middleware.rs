use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::state::AppState;

/// The authenticated caller, extracted from a Bearer access token.
/// Placing this extractor in a handler signature protects the route.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub role: String,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync + 'static,
    AppState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response()
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header format",
            )
                .into_response()
        })?;

        let claims = app_state
            .auth
            .verify_access_token(token)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid token").into_response())?;

        Ok(AuthenticatedUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// The set of roles a [`RequireRole`] guard lets through.
pub trait RolePolicy {
    const ALLOWED: &'static [&'static str];
}

/// Administrators only.
#[derive(Debug)]
pub struct AdminOnly;

/// Administrators and moderators.
#[derive(Debug)]
pub struct Staff;

impl RolePolicy for AdminOnly {
    const ALLOWED: &'static [&'static str] = &["admin"];
}

impl RolePolicy for Staff {
    const ALLOWED: &'static [&'static str] = &["admin", "moderator"];
}

/// An [`AuthenticatedUser`] whose role is in the policy's allow list.
/// Authentication failures reject with 401, a disallowed role with 403.
#[derive(Debug)]
pub struct RequireRole<P>(pub AuthenticatedUser, PhantomData<P>);

impl<P> RequireRole<P> {
    pub fn new(user: AuthenticatedUser) -> Self {
        Self(user, PhantomData)
    }
}

impl<S, P> FromRequestParts<S> for RequireRole<P>
where
    S: Send + Sync + 'static,
    AppState: FromRef<S>,
    P: RolePolicy + Send,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !P::ALLOWED.contains(&user.role.as_str()) {
            return Err((StatusCode::FORBIDDEN, "Insufficient role").into_response());
        }

        Ok(Self::new(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::Utc;

    use crate::{models::User, test_utils::test_app_state};

    async fn access_token_for(role: &str) -> (crate::test_utils::TestState, String) {
        let ts = test_app_state();
        ts.users.insert(User {
            id: Uuid::new_v4(),
            login: "carol".to_owned(),
            name: None,
            role: role.to_owned(),
            password: "pw".to_owned(),
            created_at: Utc::now(),
        });
        let (_, access, _) = ts.state.auth.login("carol", "pw").await.unwrap();
        (ts, access)
    }

    fn parts_with_bearer(token: &str) -> Parts {
        Request::builder()
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn staff_guard_admits_a_moderator() {
        let (ts, access) = access_token_for("moderator").await;
        let mut parts = parts_with_bearer(&access);

        let guard = RequireRole::<Staff>::from_request_parts(&mut parts, &ts.state)
            .await
            .unwrap();
        assert_eq!(guard.0.role, "moderator");
    }

    #[tokio::test]
    async fn staff_guard_rejects_an_editor() {
        let (ts, access) = access_token_for("editor").await;
        let mut parts = parts_with_bearer(&access);

        let rejection = RequireRole::<Staff>::from_request_parts(&mut parts, &ts.state)
            .await
            .unwrap_err();
        assert_eq!(rejection.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_guard_rejects_a_moderator() {
        let (ts, access) = access_token_for("moderator").await;
        let mut parts = parts_with_bearer(&access);

        let rejection = RequireRole::<AdminOnly>::from_request_parts(&mut parts, &ts.state)
            .await
            .unwrap_err();
        assert_eq!(rejection.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_bearer_is_unauthorized() {
        let ts = test_app_state();
        let mut parts = Request::builder().body(()).unwrap().into_parts().0;

        let rejection = RequireRole::<AdminOnly>::from_request_parts(&mut parts, &ts.state)
            .await
            .unwrap_err();
        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
    }
}
