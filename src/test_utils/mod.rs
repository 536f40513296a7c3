//! In-memory mock repositories and factories for unit and HTTP tests.

use std::sync::{
    Mutex,
    atomic::{AtomicU32, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        admin::{RegistrantListQuery, RegistrantQueryRepo, SortField, SortOrder},
        signup::{NewRegistrant, WaitlistRepo},
    },
    domain::entities::waitlist_user::WaitlistUser,
};

mod app_state_builder;
pub use app_state_builder::{TEST_ADMIN_EMAIL, TEST_ADMIN_PASSWORD, TestAppStateBuilder};

/// In-memory implementation of the waitlist store for testing.
#[derive(Default)]
pub struct InMemoryWaitlistRepo {
    users: Mutex<Vec<WaitlistUser>>,
    // Remaining insert calls to fail with `ReferralCodeTaken`; lets tests
    // exercise the signup retry budget deterministically.
    code_collisions: AtomicU32,
}

impl InMemoryWaitlistRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repo with initial registrants for testing.
    pub fn with_users(users: Vec<WaitlistUser>) -> Self {
        Self {
            users: Mutex::new(users),
            code_collisions: AtomicU32::new(0),
        }
    }

    pub fn with_code_collisions(self, n: u32) -> Self {
        self.code_collisions.store(n, Ordering::SeqCst);
        self
    }

    /// Get all registrants (for test assertions).
    pub fn get_all(&self) -> Vec<WaitlistUser> {
        self.users.lock().unwrap().clone()
    }

    pub fn find_by_code_sync(&self, code: &str) -> Option<WaitlistUser> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.referral_code == code)
            .cloned()
    }
}

#[async_trait]
impl WaitlistRepo for InMemoryWaitlistRepo {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<WaitlistUser>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<WaitlistUser>> {
        Ok(self.find_by_code_sync(code))
    }

    async fn insert(&self, registrant: NewRegistrant) -> AppResult<WaitlistUser> {
        if self.code_collisions.load(Ordering::SeqCst) > 0 {
            self.code_collisions.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::ReferralCodeTaken);
        }

        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == registrant.email) {
            return Err(AppError::DuplicateEmail);
        }
        if users
            .iter()
            .any(|u| u.referral_code == registrant.referral_code)
        {
            return Err(AppError::ReferralCodeTaken);
        }

        let user = WaitlistUser {
            id: registrant.id,
            email: registrant.email,
            username: registrant.username,
            referral_code: registrant.referral_code,
            referred_by: registrant.referred_by,
            referral_count: 0,
            completed_tasks: registrant.completed_tasks,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn increment_referral_count(&self, code: &str) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.referral_code == code) {
            Some(user) => {
                user.referral_count += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RegistrantQueryRepo for InMemoryWaitlistRepo {
    async fn list(&self, query: &RegistrantListQuery) -> AppResult<(Vec<WaitlistUser>, i64)> {
        let users = self.users.lock().unwrap();
        let mut filtered: Vec<WaitlistUser> = users
            .iter()
            .filter(|u| matches_search(u, query.search.as_deref()))
            .cloned()
            .collect();
        let total = filtered.len() as i64;

        filtered.sort_by(|a, b| {
            let ord = match query.sort_by {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::Email => a.email.cmp(&b.email),
                SortField::Username => a.username.cmp(&b.username),
                SortField::ReferralCode => a.referral_code.cmp(&b.referral_code),
                SortField::ReferralCount => a.referral_count.cmp(&b.referral_count),
            };
            match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let start = ((query.page - 1) * query.per_page).max(0) as usize;
        let page: Vec<WaitlistUser> = filtered
            .into_iter()
            .skip(start)
            .take(query.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn fetch_page(&self, offset: i64, limit: i64) -> AppResult<Vec<WaitlistUser>> {
        let mut users = self.users.lock().unwrap().clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

fn matches_search(user: &WaitlistUser, search: Option<&str>) -> bool {
    let Some(term) = search else { return true };
    let term = term.to_lowercase();
    user.email.to_lowercase().contains(&term)
        || user
            .username
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(&term))
}

/// Build a registrant with sensible defaults, then let the test mutate it.
pub fn create_test_registrant(mutate: impl FnOnce(&mut WaitlistUser)) -> WaitlistUser {
    let id = Uuid::new_v4();
    let mut user = WaitlistUser {
        id,
        email: format!("{id}@example.com"),
        username: None,
        referral_code: format!("code-{id}"),
        referred_by: None,
        referral_count: 0,
        completed_tasks: vec![],
        created_at: Utc::now(),
    };
    mutate(&mut user);
    user
}
