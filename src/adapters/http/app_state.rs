use std::sync::Arc;

use crate::{
    application::use_cases::{admin::AdminUseCases, signup::SignupUseCases},
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub signup_use_cases: Arc<SignupUseCases>,
    pub admin_use_cases: Arc<AdminUseCases>,
}
