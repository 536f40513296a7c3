//! Test app state builder for HTTP-level integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use sha2::{Digest, Sha256};
use time::Duration;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        admin::{AdminUseCases, RegistrantQueryRepo},
        signup::{SignupUseCases, WaitlistRepo},
    },
    domain::entities::waitlist_user::WaitlistUser,
    infra::config::AppConfig,
    test_utils::InMemoryWaitlistRepo,
};

pub const TEST_ADMIN_EMAIL: &str = "admin@leippass.io";
pub const TEST_ADMIN_PASSWORD: &str = "admin-password";

/// Builder for creating `AppState` over in-memory repos for testing.
pub struct TestAppStateBuilder {
    users: Vec<WaitlistUser>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self { users: vec![] }
    }

    /// Seed a registrant into the test state.
    pub fn with_user(mut self, user: WaitlistUser) -> Self {
        self.users.push(user);
        self
    }

    /// Build the app state; also returns the shared repo for assertions.
    pub fn build(self) -> (AppState, Arc<InMemoryWaitlistRepo>) {
        let repo = Arc::new(InMemoryWaitlistRepo::with_users(self.users));

        let signup_use_cases = SignupUseCases::new(repo.clone() as Arc<dyn WaitlistRepo>);
        let admin_use_cases = AdminUseCases::new(repo.clone() as Arc<dyn RegistrantQueryRepo>);

        // Minimal config for testing
        let config = Arc::new(AppConfig {
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            database_url: String::new(),
            app_origin: Url::parse("http://localhost:3000").unwrap(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            jwt_secret: SecretString::new("test_jwt_secret".into()),
            admin_email: TEST_ADMIN_EMAIL.to_string(),
            admin_password_sha256: hex::encode(Sha256::digest(TEST_ADMIN_PASSWORD.as_bytes())),
            admin_session_ttl: Duration::hours(24),
        });

        (
            AppState {
                config,
                signup_use_cases: Arc::new(signup_use_cases),
                admin_use_cases: Arc::new(admin_use_cases),
            },
            repo,
        )
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
