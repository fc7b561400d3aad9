use std::sync::Arc;

use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use secrecy::ExposeSecret;

use crate::{
    auth::AuthService,
    config::Config,
    database::{
        queries::{LectureStore, MeetingStore, SeaOrmStore, UserStore},
        Migrator,
    },
    shortlink::ShortLinkService,
};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub short_links: Arc<ShortLinkService>,
    pub users: Arc<dyn UserStore>,
    pub meetings: Arc<dyn MeetingStore>,
    pub lectures: Arc<dyn LectureStore>,
}

impl AppState {
    pub fn build(db: Arc<DatabaseConnection>, config: &Config) -> Self {
        let store = Arc::new(SeaOrmStore::new(db));
        Self {
            auth: Arc::new(AuthService::new(
                store.clone(),
                store.clone(),
                &config.auth.jwt_secret,
            )),
            short_links: Arc::new(ShortLinkService::new(store.clone())),
            users: store.clone(),
            meetings: store.clone(),
            lectures: store,
        }
    }
}

pub async fn setup(config: &Config) -> color_eyre::Result<AppState> {
    let db: DatabaseConnection = Database::connect(config.database.url.expose_secret()).await?;
    Migrator::up(&db, None).await?;
    Ok(AppState::build(Arc::new(db), config))
}
