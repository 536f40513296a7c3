use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A waitlist registrant. `referral_count` is the only field that changes
/// after creation; rows are never deleted by this service.
///
/// Serialized camelCase to match the public API wire format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistUser {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub referral_count: i32,
    pub completed_tasks: Vec<String>,
    pub created_at: DateTime<Utc>,
}
