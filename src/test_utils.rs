//! In-memory store mocks for tests. Maps are guarded by reader/writer
//! locks and every mutation happens under a single write-lock section, so
//! the mocks preserve the atomicity the SQL stores get from
//! single-statement updates.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc, RwLock,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use uuid::Uuid;

use crate::{
    auth::AuthService,
    database::{
        error::RepositoryError,
        queries::{
            LectureChanges, LectureStore, MeetingChanges, MeetingListQuery, MeetingStore,
            RefreshTokenStore, ShortLinkStore, SortOrder, UserChanges, UserStore,
        },
    },
    models::{Lecture, Meeting, MeetingStatus, RefreshToken, ShortLink, User},
    shortlink::ShortLinkService,
    state::AppState,
};

#[derive(Default)]
pub struct MockUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MockUserStore {
    pub fn insert(&self, user: User) {
        self.users.write().unwrap().insert(user.id, user);
    }

    pub fn remove(&self, id: Uuid) {
        self.users.write().unwrap().remove(&id);
    }
}

#[async_trait]
impl UserStore for MockUserStore {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().unwrap();
        if users.values().any(|u| u.login == user.login) {
            return Err(RepositoryError::AlreadyExists);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, RepositoryError> {
        self.users
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_login(&self, login: &str) -> Result<User, RepositoryError> {
        self.users
            .read()
            .unwrap()
            .values()
            .find(|u| u.login == login)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, page: u64, limit: u64) -> Result<(Vec<User>, u64), RepositoryError> {
        let users = self.users.read().unwrap();
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = all.len() as u64;
        let start = ((page.saturating_sub(1)) * limit).min(total) as usize;
        let end = (start + limit as usize).min(total as usize);
        Ok((all[start..end].to_vec(), total))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, RepositoryError> {
        let mut users = self.users.write().unwrap();
        let user = users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(v) = changes.login {
            user.login = v;
        }
        if let Some(v) = changes.name {
            user.name = Some(v);
        }
        if let Some(v) = changes.role {
            user.role = v;
        }
        if let Some(v) = changes.password {
            user.password = v;
        }
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<User, RepositoryError> {
        self.users
            .write()
            .unwrap()
            .remove(&id)
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default)]
pub struct MockRefreshTokenStore {
    tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl MockRefreshTokenStore {
    pub fn get(&self, token: &str) -> Option<RefreshToken> {
        self.tokens.read().unwrap().get(token).cloned()
    }

    pub fn count(&self) -> usize {
        self.tokens.read().unwrap().len()
    }
}

#[async_trait]
impl RefreshTokenStore for MockRefreshTokenStore {
    async fn create(&self, token: RefreshToken) -> Result<(), RepositoryError> {
        let mut tokens = self.tokens.write().unwrap();
        if tokens.contains_key(&token.token) {
            return Err(RepositoryError::AlreadyExists);
        }
        tokens.insert(token.token.clone(), token);
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<RefreshToken, RepositoryError> {
        self.get(token).ok_or(RepositoryError::NotFound)
    }

    async fn delete_by_token(&self, token: &str) -> Result<u64, RepositoryError> {
        match self.tokens.write().unwrap().remove(token) {
            Some(_) => Ok(1),
            None => Ok(0),
        }
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let mut tokens = self.tokens.write().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }
}

#[derive(Default)]
pub struct MockShortLinkStore {
    links: RwLock<HashMap<i32, ShortLink>>,
    next_id: AtomicI32,
}

impl MockShortLinkStore {
    pub fn click_count(&self, code: &str) -> Option<i32> {
        self.links
            .read()
            .unwrap()
            .values()
            .find(|l| l.code == code)
            .map(|l| l.click_count)
    }
}

#[async_trait]
impl ShortLinkStore for MockShortLinkStore {
    async fn create(&self, url: &str, code: &str) -> Result<ShortLink, RepositoryError> {
        let mut links = self.links.write().unwrap();
        if links.values().any(|l| l.code == code) {
            return Err(RepositoryError::AlreadyExists);
        }
        let link = ShortLink {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            url: url.to_owned(),
            code: code.to_owned(),
            click_count: 0,
            created_at: Utc::now(),
        };
        links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn find_by_code(&self, code: &str) -> Result<ShortLink, RepositoryError> {
        self.links
            .read()
            .unwrap()
            .values()
            .find(|l| l.code == code)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn is_unique(&self, code: &str) -> Result<bool, RepositoryError> {
        Ok(!self.links.read().unwrap().values().any(|l| l.code == code))
    }

    async fn increment_click_count(&self, id: i32) -> Result<(), RepositoryError> {
        let mut links = self.links.write().unwrap();
        let link = links.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        link.click_count += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockMeetingStore {
    meetings: RwLock<HashMap<i32, Meeting>>,
    next_id: AtomicI32,
}

impl MockMeetingStore {
    pub fn status_of(&self, id: i32) -> Option<MeetingStatus> {
        self.meetings.read().unwrap().get(&id).map(|m| m.status)
    }

    /// The full dataset ordered by id, for before/after comparisons.
    pub fn snapshot(&self) -> Vec<Meeting> {
        let mut all: Vec<Meeting> = self.meetings.read().unwrap().values().cloned().collect();
        all.sort_by_key(|m| m.id);
        all
    }
}

fn apply_meeting_changes(meeting: &mut Meeting, changes: MeetingChanges) {
    if let Some(v) = changes.event_name {
        meeting.event_name = Some(v);
    }
    if let Some(v) = changes.customer_name {
        meeting.customer_name = Some(v);
    }
    if let Some(v) = changes.email {
        meeting.email = Some(v);
    }
    if let Some(v) = changes.phone {
        meeting.phone = Some(v);
    }
    if let Some(v) = changes.location {
        meeting.location = Some(v);
    }
    if let Some(v) = changes.platform {
        meeting.platform = Some(v);
    }
    if let Some(v) = changes.devices {
        meeting.devices = Some(v);
    }
    if let Some(v) = changes.url {
        meeting.url = Some(v);
    }
    if let Some(v) = changes.short_url {
        meeting.short_url = Some(v);
    }
    if let Some(v) = changes.status {
        meeting.status = v;
    }
    if let Some(v) = changes.description {
        meeting.description = Some(v);
    }
    if let Some(v) = changes.start {
        meeting.start = Some(v);
    }
    if let Some(v) = changes.end {
        meeting.end = Some(v);
    }
}

#[async_trait]
impl MeetingStore for MockMeetingStore {
    async fn create(&self, fields: MeetingChanges) -> Result<Meeting, RepositoryError> {
        let mut meeting = Meeting {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            event_name: None,
            customer_name: None,
            email: None,
            phone: None,
            location: None,
            platform: None,
            devices: None,
            url: None,
            short_url: None,
            status: MeetingStatus::New,
            description: None,
            start: None,
            end: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        apply_meeting_changes(&mut meeting, fields);
        self.meetings
            .write()
            .unwrap()
            .insert(meeting.id, meeting.clone());
        Ok(meeting)
    }

    async fn find_by_id(&self, id: i32) -> Result<Meeting, RepositoryError> {
        self.meetings
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, query: MeetingListQuery) -> Result<(Vec<Meeting>, u64), RepositoryError> {
        let meetings = self.meetings.read().unwrap();
        let mut all: Vec<Meeting> = meetings
            .values()
            .filter(|m| query.status.is_none_or(|s| m.status == s))
            .cloned()
            .collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(SortOrder::Asc) = query.order {
            all.reverse();
        }

        let total = all.len() as u64;
        let start = ((query.page.saturating_sub(1)) * query.limit).min(total) as usize;
        let end = (start + query.limit as usize).min(total as usize);
        Ok((all[start..end].to_vec(), total))
    }

    async fn update(&self, id: i32, changes: MeetingChanges) -> Result<Meeting, RepositoryError> {
        let mut meetings = self.meetings.write().unwrap();
        let meeting = meetings.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        apply_meeting_changes(meeting, changes);
        meeting.updated_at = Some(Utc::now());
        Ok(meeting.clone())
    }

    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut meetings = self.meetings.write().unwrap();
        let mut moved = 0;
        for meeting in meetings.values_mut() {
            let elapsed = meeting.end.is_some_and(|end| end <= now);
            let non_terminal =
                matches!(meeting.status, MeetingStatus::New | MeetingStatus::Approved);
            if elapsed && non_terminal {
                meeting.status = MeetingStatus::Completed;
                moved += 1;
            }
        }
        Ok(moved)
    }
}

#[derive(Default)]
pub struct MockLectureStore {
    lectures: RwLock<HashMap<i32, Lecture>>,
    next_id: AtomicI32,
}

fn apply_lecture_changes(lecture: &mut Lecture, changes: LectureChanges) {
    if let Some(v) = changes.group_name {
        lecture.group_name = Some(v);
    }
    if let Some(v) = changes.lector {
        lecture.lector = Some(v);
    }
    if let Some(v) = changes.platform {
        lecture.platform = Some(v);
    }
    if let Some(v) = changes.location {
        lecture.location = Some(v);
    }
    if let Some(v) = changes.url {
        lecture.url = Some(v);
    }
    if let Some(v) = changes.short_url {
        lecture.short_url = Some(v);
    }
    if let Some(v) = changes.stream_key {
        lecture.stream_key = Some(v);
    }
    if let Some(v) = changes.description {
        lecture.description = Some(v);
    }
    if let Some(v) = changes.date {
        lecture.date = v;
    }
    if let Some(v) = changes.start {
        lecture.start = Some(v);
    }
    if let Some(v) = changes.end {
        lecture.end = Some(v);
    }
}

#[async_trait]
impl LectureStore for MockLectureStore {
    async fn create(
        &self,
        date: DateTime<Utc>,
        fields: LectureChanges,
    ) -> Result<Lecture, RepositoryError> {
        let mut lecture = Lecture {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            group_name: None,
            lector: None,
            platform: None,
            location: None,
            url: None,
            short_url: None,
            stream_key: None,
            description: None,
            date,
            start: None,
            end: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        apply_lecture_changes(&mut lecture, fields);
        self.lectures
            .write()
            .unwrap()
            .insert(lecture.id, lecture.clone());
        Ok(lecture)
    }

    async fn find_by_id(&self, id: i32) -> Result<Lecture, RepositoryError> {
        self.lectures
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, page: u64, limit: u64) -> Result<(Vec<Lecture>, u64), RepositoryError> {
        let lectures = self.lectures.read().unwrap();
        let mut all: Vec<Lecture> = lectures.values().cloned().collect();
        all.sort_by(|a, b| b.date.cmp(&a.date));

        let total = all.len() as u64;
        let start = ((page.saturating_sub(1)) * limit).min(total) as usize;
        let end = (start + limit as usize).min(total as usize);
        Ok((all[start..end].to_vec(), total))
    }

    async fn update(&self, id: i32, changes: LectureChanges) -> Result<Lecture, RepositoryError> {
        let mut lectures = self.lectures.write().unwrap();
        let lecture = lectures.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        apply_lecture_changes(lecture, changes);
        lecture.updated_at = Some(Utc::now());
        Ok(lecture.clone())
    }

    async fn delete(&self, id: i32) -> Result<Lecture, RepositoryError> {
        self.lectures
            .write()
            .unwrap()
            .remove(&id)
            .ok_or(RepositoryError::NotFound)
    }
}

/// Mock-backed application state plus handles to the underlying stores,
/// so tests can seed and inspect them directly.
pub struct TestState {
    pub state: AppState,
    pub users: Arc<MockUserStore>,
    pub tokens: Arc<MockRefreshTokenStore>,
    pub links: Arc<MockShortLinkStore>,
    pub meetings: Arc<MockMeetingStore>,
    pub lectures: Arc<MockLectureStore>,
}

pub fn test_app_state() -> TestState {
    let users = Arc::new(MockUserStore::default());
    let tokens = Arc::new(MockRefreshTokenStore::default());
    let links = Arc::new(MockShortLinkStore::default());
    let meetings = Arc::new(MockMeetingStore::default());
    let lectures = Arc::new(MockLectureStore::default());

    let state = AppState {
        auth: Arc::new(AuthService::new(
            users.clone(),
            tokens.clone(),
            &SecretString::from("test-secret"),
        )),
        short_links: Arc::new(ShortLinkService::new(links.clone())),
        users: users.clone(),
        meetings: meetings.clone(),
        lectures: lectures.clone(),
    };

    TestState {
        state,
        users,
        tokens,
        links,
        meetings,
        lectures,
    }
}
