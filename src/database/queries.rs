use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use uuid::Uuid;

use super::error::RepositoryError;
use crate::models::{
    lectures, meetings, refresh_tokens, short_links, users, Lecture, Meeting, MeetingStatus,
    RefreshToken, ShortLink, User,
};

/// Sort direction accepted by the list endpoints.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Sparse update for a user. Each field maps by hand to its column;
/// absent fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserChanges {
    pub login: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

impl UserChanges {
    fn is_empty(&self) -> bool {
        self.login.is_none() && self.name.is_none() && self.role.is_none() && self.password.is_none()
    }
}

/// Sparse create/update fields for a meeting.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MeetingChanges {
    pub event_name: Option<String>,
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub platform: Option<String>,
    pub devices: Option<String>,
    pub url: Option<String>,
    pub short_url: Option<String>,
    pub status: Option<MeetingStatus>,
    pub description: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl MeetingChanges {
    pub fn is_empty(&self) -> bool {
        self.event_name.is_none()
            && self.customer_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.location.is_none()
            && self.platform.is_none()
            && self.devices.is_none()
            && self.url.is_none()
            && self.short_url.is_none()
            && self.status.is_none()
            && self.description.is_none()
            && self.start.is_none()
            && self.end.is_none()
    }

    fn apply(self, model: &mut meetings::ActiveModel) {
        if let Some(v) = self.event_name {
            model.event_name = Set(Some(v));
        }
        if let Some(v) = self.customer_name {
            model.customer_name = Set(Some(v));
        }
        if let Some(v) = self.email {
            model.email = Set(Some(v));
        }
        if let Some(v) = self.phone {
            model.phone = Set(Some(v));
        }
        if let Some(v) = self.location {
            model.location = Set(Some(v));
        }
        if let Some(v) = self.platform {
            model.platform = Set(Some(v));
        }
        if let Some(v) = self.devices {
            model.devices = Set(Some(v));
        }
        if let Some(v) = self.url {
            model.url = Set(Some(v));
        }
        if let Some(v) = self.short_url {
            model.short_url = Set(Some(v));
        }
        if let Some(v) = self.status {
            model.status = Set(v);
        }
        if let Some(v) = self.description {
            model.description = Set(Some(v));
        }
        if let Some(v) = self.start {
            model.start = Set(Some(v));
        }
        if let Some(v) = self.end {
            model.end = Set(Some(v));
        }
    }
}

/// Sparse create/update fields for a lecture.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LectureChanges {
    pub group_name: Option<String>,
    pub lector: Option<String>,
    pub platform: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub short_url: Option<String>,
    pub stream_key: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl LectureChanges {
    pub fn is_empty(&self) -> bool {
        self.group_name.is_none()
            && self.lector.is_none()
            && self.platform.is_none()
            && self.location.is_none()
            && self.url.is_none()
            && self.short_url.is_none()
            && self.stream_key.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.start.is_none()
            && self.end.is_none()
    }

    fn apply(self, model: &mut lectures::ActiveModel) {
        if let Some(v) = self.group_name {
            model.group_name = Set(Some(v));
        }
        if let Some(v) = self.lector {
            model.lector = Set(Some(v));
        }
        if let Some(v) = self.platform {
            model.platform = Set(Some(v));
        }
        if let Some(v) = self.location {
            model.location = Set(Some(v));
        }
        if let Some(v) = self.url {
            model.url = Set(Some(v));
        }
        if let Some(v) = self.short_url {
            model.short_url = Set(Some(v));
        }
        if let Some(v) = self.stream_key {
            model.stream_key = Set(Some(v));
        }
        if let Some(v) = self.description {
            model.description = Set(Some(v));
        }
        if let Some(v) = self.date {
            model.date = Set(v);
        }
        if let Some(v) = self.start {
            model.start = Set(Some(v));
        }
        if let Some(v) = self.end {
            model.end = Set(Some(v));
        }
    }
}

/// Paging and filtering for the meeting list endpoint. Sorting is
/// restricted to a whitelist of columns; anything else falls back to
/// newest-first.
#[derive(Clone, Debug, Default)]
pub struct MeetingListQuery {
    pub page: u64,
    pub limit: u64,
    pub status: Option<MeetingStatus>,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
}

fn meeting_sort_column(name: &str) -> Option<meetings::Column> {
    match name {
        "event_name" => Some(meetings::Column::EventName),
        "customer_name" => Some(meetings::Column::CustomerName),
        "status" => Some(meetings::Column::Status),
        "platform" => Some(meetings::Column::Platform),
        "location" => Some(meetings::Column::Location),
        "start" => Some(meetings::Column::Start),
        "end" => Some(meetings::Column::End),
        "created_at" => Some(meetings::Column::CreatedAt),
        _ => None,
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<User, RepositoryError>;
    async fn find_by_login(&self, login: &str) -> Result<User, RepositoryError>;
    async fn list(&self, page: u64, limit: u64) -> Result<(Vec<User>, u64), RepositoryError>;
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<User, RepositoryError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(&self, token: RefreshToken) -> Result<(), RepositoryError>;
    async fn find_by_token(&self, token: &str) -> Result<RefreshToken, RepositoryError>;
    /// Conditional delete; returns the number of rows removed so callers
    /// can detect a token that was already rotated away.
    async fn delete_by_token(&self, token: &str) -> Result<u64, RepositoryError>;
    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait ShortLinkStore: Send + Sync {
    async fn create(&self, url: &str, code: &str) -> Result<ShortLink, RepositoryError>;
    async fn find_by_code(&self, code: &str) -> Result<ShortLink, RepositoryError>;
    async fn is_unique(&self, code: &str) -> Result<bool, RepositoryError>;
    /// Atomic `click_count = click_count + 1 where id = ?`; NotFound when
    /// no row matched.
    async fn increment_click_count(&self, id: i32) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn create(&self, fields: MeetingChanges) -> Result<Meeting, RepositoryError>;
    async fn find_by_id(&self, id: i32) -> Result<Meeting, RepositoryError>;
    async fn list(&self, query: MeetingListQuery) -> Result<(Vec<Meeting>, u64), RepositoryError>;
    async fn update(&self, id: i32, changes: MeetingChanges) -> Result<Meeting, RepositoryError>;
    /// Bulk conditional update: every non-terminal meeting whose end time
    /// has passed becomes `completed`. Returns the number of rows moved,
    /// which is zero when re-run on an already swept dataset.
    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait LectureStore: Send + Sync {
    async fn create(
        &self,
        date: DateTime<Utc>,
        fields: LectureChanges,
    ) -> Result<Lecture, RepositoryError>;
    async fn find_by_id(&self, id: i32) -> Result<Lecture, RepositoryError>;
    async fn list(&self, page: u64, limit: u64) -> Result<(Vec<Lecture>, u64), RepositoryError>;
    async fn update(&self, id: i32, changes: LectureChanges) -> Result<Lecture, RepositoryError>;
    async fn delete(&self, id: i32) -> Result<Lecture, RepositoryError>;
}

/// SeaORM-backed store shared by all repositories.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for SeaOrmStore {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let model = users::ActiveModel {
            id: Set(user.id),
            login: Set(user.login),
            name: Set(user.name),
            role: Set(user.role),
            password: Set(user.password),
            created_at: Set(user.created_at),
        };
        model
            .insert(self.db.as_ref())
            .await
            .map_err(RepositoryError::from_db)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, RepositoryError> {
        users::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_login(&self, login: &str) -> Result<User, RepositoryError> {
        users::Entity::find()
            .filter(users::Column::Login.eq(login))
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, page: u64, limit: u64) -> Result<(Vec<User>, u64), RepositoryError> {
        let paginator = users::Entity::find()
            .order_by_desc(users::Column::CreatedAt)
            .paginate(self.db.as_ref(), limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, RepositoryError> {
        if changes.is_empty() {
            return UserStore::find_by_id(self, id).await;
        }

        let mut model = users::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        if let Some(v) = changes.login {
            model.login = Set(v);
        }
        if let Some(v) = changes.name {
            model.name = Set(Some(v));
        }
        if let Some(v) = changes.role {
            model.role = Set(v);
        }
        if let Some(v) = changes.password {
            model.password = Set(v);
        }

        match model.update(self.db.as_ref()).await {
            Ok(user) => Ok(user),
            Err(sea_orm::DbErr::RecordNotUpdated) => Err(RepositoryError::NotFound),
            Err(err) => Err(RepositoryError::from_db(err)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<User, RepositoryError> {
        let user = UserStore::find_by_id(self, id).await?;
        users::Entity::delete_by_id(id).exec(self.db.as_ref()).await?;
        Ok(user)
    }
}

#[async_trait]
impl RefreshTokenStore for SeaOrmStore {
    async fn create(&self, token: RefreshToken) -> Result<(), RepositoryError> {
        let model = refresh_tokens::ActiveModel {
            id: Set(token.id),
            user_id: Set(token.user_id),
            token: Set(token.token),
            expires_at: Set(token.expires_at),
            created_at: Set(token.created_at),
        };
        model
            .insert(self.db.as_ref())
            .await
            .map_err(RepositoryError::from_db)?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<RefreshToken, RepositoryError> {
        refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_by_token(&self, token: &str) -> Result<u64, RepositoryError> {
        let res = refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::Token.eq(token))
            .exec(self.db.as_ref())
            .await?;
        Ok(res.rows_affected)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let res = refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl ShortLinkStore for SeaOrmStore {
    async fn create(&self, url: &str, code: &str) -> Result<ShortLink, RepositoryError> {
        let model = short_links::ActiveModel {
            url: Set(url.to_owned()),
            code: Set(code.to_owned()),
            click_count: Set(0),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        model
            .insert(self.db.as_ref())
            .await
            .map_err(RepositoryError::from_db)
    }

    async fn find_by_code(&self, code: &str) -> Result<ShortLink, RepositoryError> {
        short_links::Entity::find()
            .filter(short_links::Column::Code.eq(code))
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn is_unique(&self, code: &str) -> Result<bool, RepositoryError> {
        let count = short_links::Entity::find()
            .filter(short_links::Column::Code.eq(code))
            .count(self.db.as_ref())
            .await?;
        Ok(count == 0)
    }

    async fn increment_click_count(&self, id: i32) -> Result<(), RepositoryError> {
        let res = short_links::Entity::update_many()
            .col_expr(
                short_links::Column::ClickCount,
                Expr::col(short_links::Column::ClickCount).add(1),
            )
            .filter(short_links::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if res.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl MeetingStore for SeaOrmStore {
    async fn create(&self, fields: MeetingChanges) -> Result<Meeting, RepositoryError> {
        let mut model = meetings::ActiveModel {
            status: Set(MeetingStatus::New),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        fields.apply(&mut model);
        model
            .insert(self.db.as_ref())
            .await
            .map_err(RepositoryError::from_db)
    }

    async fn find_by_id(&self, id: i32) -> Result<Meeting, RepositoryError> {
        meetings::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, query: MeetingListQuery) -> Result<(Vec<Meeting>, u64), RepositoryError> {
        let mut find = meetings::Entity::find();

        if let Some(status) = query.status {
            find = find.filter(meetings::Column::Status.eq(status));
        }

        let sort = query
            .sort_by
            .as_deref()
            .and_then(meeting_sort_column)
            .zip(query.order);
        find = match sort {
            Some((column, order)) => find.order_by(column, order.into()),
            None => find.order_by_desc(meetings::Column::CreatedAt),
        };

        let paginator = find.paginate(self.db.as_ref(), query.limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(query.page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    async fn update(&self, id: i32, changes: MeetingChanges) -> Result<Meeting, RepositoryError> {
        if changes.is_empty() {
            return MeetingStore::find_by_id(self, id).await;
        }

        let mut model = meetings::ActiveModel {
            id: Set(id),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        changes.apply(&mut model);

        match model.update(self.db.as_ref()).await {
            Ok(meeting) => Ok(meeting),
            Err(sea_orm::DbErr::RecordNotUpdated) => Err(RepositoryError::NotFound),
            Err(err) => Err(RepositoryError::from_db(err)),
        }
    }

    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let res = meetings::Entity::update_many()
            .col_expr(
                meetings::Column::Status,
                Expr::value(MeetingStatus::Completed),
            )
            .filter(meetings::Column::End.lte(now))
            .filter(
                meetings::Column::Status.is_in([MeetingStatus::New, MeetingStatus::Approved]),
            )
            .exec(self.db.as_ref())
            .await?;
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl LectureStore for SeaOrmStore {
    async fn create(
        &self,
        date: DateTime<Utc>,
        fields: LectureChanges,
    ) -> Result<Lecture, RepositoryError> {
        let mut model = lectures::ActiveModel {
            date: Set(date),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        fields.apply(&mut model);
        model
            .insert(self.db.as_ref())
            .await
            .map_err(RepositoryError::from_db)
    }

    async fn find_by_id(&self, id: i32) -> Result<Lecture, RepositoryError> {
        lectures::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, page: u64, limit: u64) -> Result<(Vec<Lecture>, u64), RepositoryError> {
        let paginator = lectures::Entity::find()
            .order_by_desc(lectures::Column::Date)
            .paginate(self.db.as_ref(), limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    async fn update(&self, id: i32, changes: LectureChanges) -> Result<Lecture, RepositoryError> {
        if changes.is_empty() {
            return LectureStore::find_by_id(self, id).await;
        }

        let mut model = lectures::ActiveModel {
            id: Set(id),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        changes.apply(&mut model);

        match model.update(self.db.as_ref()).await {
            Ok(lecture) => Ok(lecture),
            Err(sea_orm::DbErr::RecordNotUpdated) => Err(RepositoryError::NotFound),
            Err(err) => Err(RepositoryError::from_db(err)),
        }
    }

    async fn delete(&self, id: i32) -> Result<Lecture, RepositoryError> {
        let lecture = LectureStore::find_by_id(self, id).await?;
        lectures::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        Ok(lecture)
    }
}
