use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a meeting. `Completed` and `Canceled` are terminal: the
/// background sweep only ever moves non-terminal meetings into `Completed`
/// and never touches `Canceled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

// Users entity
pub mod users {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(unique)]
        pub login: String,
        pub name: Option<String>,
        pub role: String,
        #[serde(skip_serializing)]
        pub password: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

// Refresh tokens entity. One row per outstanding session lineage; rows
// are deleted on rotation and on logout.
pub mod refresh_tokens {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "refresh_tokens")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub user_id: Uuid,
        #[sea_orm(unique)]
        pub token: String,
        pub expires_at: DateTime<Utc>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

// Short links entity. `code` is unique among all records; `click_count`
// only ever grows, through a single atomic increment statement.
pub mod short_links {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "short_links")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub url: String,
        #[sea_orm(unique)]
        pub code: String,
        pub click_count: i32,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

// Meetings entity
pub mod meetings {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "meetings")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub event_name: Option<String>,
        pub customer_name: Option<String>,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub location: Option<String>,
        pub platform: Option<String>,
        pub devices: Option<String>,
        pub url: Option<String>,
        pub short_url: Option<String>,
        pub status: MeetingStatus,
        pub description: Option<String>,
        pub start: Option<DateTime<Utc>>,
        pub end: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
        pub updated_at: Option<DateTime<Utc>>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

// Lectures entity
pub mod lectures {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "lectures")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub group_name: Option<String>,
        pub lector: Option<String>,
        pub platform: Option<String>,
        pub location: Option<String>,
        pub url: Option<String>,
        pub short_url: Option<String>,
        pub stream_key: Option<String>,
        pub description: Option<String>,
        pub date: DateTime<Utc>,
        pub start: Option<DateTime<Utc>>,
        pub end: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
        pub updated_at: Option<DateTime<Utc>>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub type User = users::Model;
pub type RefreshToken = refresh_tokens::Model;
pub type ShortLink = short_links::Model;
pub type Meeting = meetings::Model;
pub type Lecture = lectures::Model;
