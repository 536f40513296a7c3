use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{referral_code, validators},
    domain::entities::waitlist_user::WaitlistUser,
};

/// Storage capabilities the signup flow needs. One interface covers every
/// backend; business logic never sees the concrete store.
#[async_trait]
pub trait WaitlistRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<WaitlistUser>>;
    async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<WaitlistUser>>;
    async fn insert(&self, registrant: NewRegistrant) -> AppResult<WaitlistUser>;
    /// Credit the user owning `code`. Must be atomic at the store (a single
    /// conditional increment), never read-modify-write in process. Returns
    /// whether any row matched.
    async fn increment_referral_count(&self, code: &str) -> AppResult<bool>;
}

#[derive(Debug, Clone)]
pub struct NewRegistrant {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub completed_tasks: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SignupRequest {
    pub email: String,
    pub username: Option<String>,
    pub referred_by: Option<String>,
    pub completed_tasks: Vec<String>,
}

#[derive(Clone)]
pub struct SignupUseCases {
    repo: Arc<dyn WaitlistRepo>,
}

impl SignupUseCases {
    const CODE_RETRY_BUDGET: u32 = 3;

    pub fn new(repo: Arc<dyn WaitlistRepo>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: SignupRequest) -> AppResult<WaitlistUser> {
        let email = request.email.trim().to_string();
        if !validators::is_valid_email(&email) {
            return Err(AppError::InvalidInput("Valid email is required".into()));
        }

        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let username = request
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from);
        let referred_by = request
            .referred_by
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);

        let user = self
            .insert_with_unique_code(email, username, referred_by.clone(), request.completed_tasks)
            .await?;

        // The user already exists at this point; a failed credit must not
        // fail the signup.
        if let Some(code) = referred_by {
            match self.credit_referrer(&code).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(referred_by = %code, "referral code unknown, not credited");
                }
                Err(err) => {
                    tracing::warn!(error = ?err, referred_by = %code, "failed to credit referrer");
                }
            }
        }

        Ok(user)
    }

    /// Referral Registry crediting: delegated to the store's atomic
    /// increment. A lookup miss is not an error for the referee.
    pub async fn credit_referrer(&self, code: &str) -> AppResult<bool> {
        self.repo.increment_referral_count(code).await
    }

    pub async fn lookup_by_code(&self, code: &str) -> AppResult<Option<WaitlistUser>> {
        self.repo.find_by_referral_code(code).await
    }

    async fn insert_with_unique_code(
        &self,
        email: String,
        username: Option<String>,
        referred_by: Option<String>,
        completed_tasks: Vec<String>,
    ) -> AppResult<WaitlistUser> {
        for attempt in 0..Self::CODE_RETRY_BUDGET {
            let mut code = referral_code::new_code(username.as_deref());
            if attempt > 0 {
                code = referral_code::extend_code(&code);
            }

            if self.repo.find_by_referral_code(&code).await?.is_some() {
                continue;
            }

            let registrant = NewRegistrant {
                id: Uuid::new_v4(),
                email: email.clone(),
                username: username.clone(),
                referral_code: code,
                referred_by: referred_by.clone(),
                completed_tasks: completed_tasks.clone(),
            };

            match self.repo.insert(registrant).await {
                Ok(user) => return Ok(user),
                // Lost the check-then-insert race for the code to a
                // concurrent signup; retry with a wider code.
                Err(AppError::ReferralCodeTaken) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(AppError::CodeCollisionExhausted)
    }
}
