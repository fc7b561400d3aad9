use std::sync::Arc;

use chrono::{Duration, Utc};
use secrecy::SecretString;
use uuid::Uuid;

use crate::{
    database::{
        error::RepositoryError,
        queries::{RefreshTokenStore, UserStore},
    },
    errors::AppError,
    models::{RefreshToken, User},
};

use super::token::{generate_refresh_token, AccessClaims, TokenSigner, REFRESH_TOKEN_TTL_DAYS};

/// Issues access/refresh token pairs and manages the refresh token
/// lifecycle: login, single-use rotation, logout.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn RefreshTokenStore>,
    signer: TokenSigner,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        jwt_secret: &SecretString,
    ) -> Self {
        Self {
            users,
            tokens,
            signer: TokenSigner::new(jwt_secret),
        }
    }

    pub async fn login(
        &self,
        login: &str,
        password: &str,
    ) -> Result<(User, String, String), AppError> {
        let user = self.users.find_by_login(login).await.map_err(not_found)?;

        // Plain equality, matching the upstream user directory's storage.
        if password != user.password {
            return Err(AppError::Forbidden);
        }

        let access = self.signer.sign(user.id, &user.role)?;
        let refresh = self.issue_refresh_token(user.id).await?;
        Ok((user, access, refresh))
    }

    /// Rotates a refresh token: the presented token is consumed and a new
    /// pair is issued. The replacement is persisted before the presented
    /// token is conditionally deleted, so a crash mid-rotation can at
    /// worst leave an extra valid token, never zero. A conditional delete
    /// that matches no rows means a concurrent rotation already consumed
    /// the token; the replacement is withdrawn and the call fails.
    pub async fn refresh(&self, presented: &str) -> Result<(String, String), AppError> {
        let record = self
            .tokens
            .find_by_token(presented)
            .await
            .map_err(forbidden)?;
        if record.expires_at <= Utc::now() {
            return Err(AppError::Forbidden);
        }

        let user = self
            .users
            .find_by_id(record.user_id)
            .await
            .map_err(not_found)?;

        let access = self.signer.sign(user.id, &user.role)?;
        let refresh = self.issue_refresh_token(user.id).await?;

        match self.tokens.delete_by_token(presented).await {
            Ok(0) => {
                if let Err(err) = self.tokens.delete_by_token(&refresh).await {
                    tracing::warn!("failed to withdraw replacement after lost rotation: {err}");
                }
                Err(AppError::Forbidden)
            }
            Ok(_) => Ok((access, refresh)),
            Err(err) => {
                // The new pair is already durable; removal of the old
                // token is best-effort and must not block the client.
                tracing::warn!("failed to delete rotated refresh token: {err}");
                Ok((access, refresh))
            }
        }
    }

    /// Idempotent: deleting an absent token is a success, since the end
    /// state (token unusable) already holds.
    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        self.tokens.delete_by_token(token).await?;
        Ok(())
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        self.signer.verify(token)
    }

    async fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = generate_refresh_token();
        let now = Utc::now();
        self.tokens
            .create(RefreshToken {
                id: Uuid::new_v4(),
                user_id,
                token: token.clone(),
                expires_at: now + Duration::days(REFRESH_TOKEN_TTL_DAYS),
                created_at: now,
            })
            .await?;
        Ok(token)
    }
}

fn not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound,
        other => other.into(),
    }
}

fn forbidden(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::Forbidden,
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sea_orm::DbErr;

    use crate::test_utils::{MockRefreshTokenStore, MockUserStore};

    /// Backing store whose conditional delete reports zero rows for one
    /// chosen token, as when a concurrent rotation consumed it first.
    struct ContestedTokenStore {
        inner: MockRefreshTokenStore,
        contested: String,
    }

    #[async_trait]
    impl RefreshTokenStore for ContestedTokenStore {
        async fn create(&self, token: RefreshToken) -> Result<(), RepositoryError> {
            self.inner.create(token).await
        }

        async fn find_by_token(&self, token: &str) -> Result<RefreshToken, RepositoryError> {
            self.inner.find_by_token(token).await
        }

        async fn delete_by_token(&self, token: &str) -> Result<u64, RepositoryError> {
            if token == self.contested {
                return Ok(0);
            }
            self.inner.delete_by_token(token).await
        }

        async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
            self.inner.delete_by_user(user_id).await
        }
    }

    /// Backing store whose deletes fail outright.
    struct DeleteFailingStore {
        inner: MockRefreshTokenStore,
    }

    #[async_trait]
    impl RefreshTokenStore for DeleteFailingStore {
        async fn create(&self, token: RefreshToken) -> Result<(), RepositoryError> {
            self.inner.create(token).await
        }

        async fn find_by_token(&self, token: &str) -> Result<RefreshToken, RepositoryError> {
            self.inner.find_by_token(token).await
        }

        async fn delete_by_token(&self, _token: &str) -> Result<u64, RepositoryError> {
            Err(RepositoryError::Database(DbErr::Custom(
                "connection reset".to_owned(),
            )))
        }

        async fn delete_by_user(&self, _user_id: Uuid) -> Result<u64, RepositoryError> {
            Err(RepositoryError::Database(DbErr::Custom(
                "connection reset".to_owned(),
            )))
        }
    }

    fn service(
        users: Arc<MockUserStore>,
        tokens: Arc<MockRefreshTokenStore>,
    ) -> AuthService {
        AuthService::new(users, tokens, &SecretString::from("test-secret"))
    }

    fn seed_user(users: &MockUserStore) -> User {
        let user = User {
            id: Uuid::new_v4(),
            login: "alice123".to_owned(),
            name: Some("Alice".to_owned()),
            role: "editor".to_owned(),
            password: "secret1".to_owned(),
            created_at: Utc::now(),
        };
        users.insert(user.clone());
        user
    }

    #[tokio::test]
    async fn login_issues_a_valid_pair() {
        let users = Arc::new(MockUserStore::default());
        let tokens = Arc::new(MockRefreshTokenStore::default());
        let user = seed_user(&users);
        let svc = service(users, tokens.clone());

        let (logged_in, access, refresh) = svc.login("alice123", "secret1").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let claims = svc.verify_access_token(&access).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, "editor");
        let lifetime = claims.exp - Utc::now().timestamp();
        assert!((890..=900).contains(&lifetime), "lifetime was {lifetime}s");

        assert_eq!(refresh.len(), 43);
        let record = tokens.get(&refresh).unwrap();
        assert_eq!(record.user_id, user.id);
        assert!(record.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn login_unknown_user_is_not_found() {
        let users = Arc::new(MockUserStore::default());
        let tokens = Arc::new(MockRefreshTokenStore::default());
        let svc = service(users, tokens);

        let err = svc.login("nobody", "pw").await.unwrap_err();
        assert_eq!(err, AppError::NotFound);
    }

    #[tokio::test]
    async fn login_wrong_password_is_forbidden() {
        let users = Arc::new(MockUserStore::default());
        let tokens = Arc::new(MockRefreshTokenStore::default());
        seed_user(&users);
        let svc = service(users, tokens);

        let err = svc.login("alice123", "wrong").await.unwrap_err();
        assert_eq!(err, AppError::Forbidden);
    }

    #[tokio::test]
    async fn refresh_rotation_is_single_use() {
        let users = Arc::new(MockUserStore::default());
        let tokens = Arc::new(MockRefreshTokenStore::default());
        seed_user(&users);
        let svc = service(users, tokens.clone());

        let (_, _, first) = svc.login("alice123", "secret1").await.unwrap();

        let (_, second) = svc.refresh(&first).await.unwrap();
        assert_ne!(first, second);
        assert!(tokens.get(&first).is_none(), "consumed token must be gone");
        assert!(tokens.get(&second).is_some());

        // replaying the consumed token must fail
        let err = svc.refresh(&first).await.unwrap_err();
        assert_eq!(err, AppError::Forbidden);

        // the replacement still works
        svc.refresh(&second).await.unwrap();
    }

    #[tokio::test]
    async fn refresh_lost_to_concurrent_rotation_is_forbidden() {
        let users = Arc::new(MockUserStore::default());
        let user = seed_user(&users);

        let inner = MockRefreshTokenStore::default();
        inner
            .create(RefreshToken {
                id: Uuid::new_v4(),
                user_id: user.id,
                token: "contested".to_owned(),
                expires_at: Utc::now() + Duration::days(7),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let tokens = Arc::new(ContestedTokenStore {
            inner,
            contested: "contested".to_owned(),
        });
        let svc = AuthService::new(users, tokens.clone(), &SecretString::from("test-secret"));

        let err = svc.refresh("contested").await.unwrap_err();
        assert_eq!(err, AppError::Forbidden);

        // the replacement was persisted first and must be withdrawn again,
        // leaving only the seeded record behind
        assert_eq!(tokens.inner.count(), 1);
    }

    #[tokio::test]
    async fn refresh_survives_a_failing_delete_of_the_old_token() {
        let users = Arc::new(MockUserStore::default());
        let user = seed_user(&users);

        let inner = MockRefreshTokenStore::default();
        inner
            .create(RefreshToken {
                id: Uuid::new_v4(),
                user_id: user.id,
                token: "sticky".to_owned(),
                expires_at: Utc::now() + Duration::days(7),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let tokens = Arc::new(DeleteFailingStore { inner });
        let svc = AuthService::new(
            users,
            tokens.clone(),
            &SecretString::from("test-secret"),
        );

        // the new pair is already durable, so a failed delete of the old
        // token must not fail the call
        let (access, refresh) = svc.refresh("sticky").await.unwrap();

        let claims = svc.verify_access_token(&access).unwrap();
        assert_eq!(claims.sub, user.id);
        assert!(tokens.inner.get(&refresh).is_some());
        assert!(tokens.inner.get("sticky").is_some());
    }

    #[tokio::test]
    async fn refresh_expired_token_is_forbidden() {
        let users = Arc::new(MockUserStore::default());
        let tokens = Arc::new(MockRefreshTokenStore::default());
        let user = seed_user(&users);
        let svc = service(users, tokens.clone());

        tokens
            .create(RefreshToken {
                id: Uuid::new_v4(),
                user_id: user.id,
                token: "stale".to_owned(),
                expires_at: Utc::now() - Duration::hours(1),
                created_at: Utc::now() - Duration::days(8),
            })
            .await
            .unwrap();

        let err = svc.refresh("stale").await.unwrap_err();
        assert_eq!(err, AppError::Forbidden);
    }

    #[tokio::test]
    async fn refresh_unknown_token_is_forbidden() {
        let users = Arc::new(MockUserStore::default());
        let tokens = Arc::new(MockRefreshTokenStore::default());
        let svc = service(users, tokens);

        let err = svc.refresh("never-issued").await.unwrap_err();
        assert_eq!(err, AppError::Forbidden);
    }

    #[tokio::test]
    async fn refresh_for_vanished_user_is_not_found() {
        let users = Arc::new(MockUserStore::default());
        let tokens = Arc::new(MockRefreshTokenStore::default());
        let user = seed_user(&users);
        let svc = service(users.clone(), tokens);

        let (_, _, refresh) = svc.login("alice123", "secret1").await.unwrap();
        users.remove(user.id);

        let err = svc.refresh(&refresh).await.unwrap_err();
        assert_eq!(err, AppError::NotFound);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let users = Arc::new(MockUserStore::default());
        let tokens = Arc::new(MockRefreshTokenStore::default());
        seed_user(&users);
        let svc = service(users, tokens.clone());

        let (_, _, refresh) = svc.login("alice123", "secret1").await.unwrap();

        svc.logout(&refresh).await.unwrap();
        assert!(tokens.get(&refresh).is_none());
        // second logout of the same token is still a success
        svc.logout(&refresh).await.unwrap();
    }
}
