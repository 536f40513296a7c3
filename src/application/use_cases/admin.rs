use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use tracing::instrument;

use crate::{app_error::AppResult, domain::entities::waitlist_user::WaitlistUser};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

const EXPORT_BATCH_SIZE: i64 = 500;
const CSV_HEADER: &str =
    "id,email,username,referralCode,referredBy,referralCount,completedTasks,createdAt";

/// Sort columns are a closed set; the SQL column name never comes from the
/// request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Email,
    Username,
    ReferralCode,
    ReferralCount,
}

impl SortField {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("email") => SortField::Email,
            Some("username") => SortField::Username,
            Some("referralCode" | "referral_code") => SortField::ReferralCode,
            Some("referralCount" | "referral_count") => SortField::ReferralCount,
            _ => SortField::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Email => "email",
            SortField::Username => "username",
            SortField::ReferralCode => "referral_code",
            SortField::ReferralCount => "referral_count",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistrantListQuery {
    pub page: i64,
    pub per_page: i64,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub search: Option<String>,
}

impl Default for RegistrantListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
            sort_by: SortField::CreatedAt,
            order: SortOrder::Desc,
            search: None,
        }
    }
}

#[derive(Debug)]
pub struct RegistrantPage {
    pub users: Vec<WaitlistUser>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Admin read path. Listing returns the requested page plus the filtered
/// total; `fetch_page` is the export scan, ordered `created_at DESC`.
#[async_trait]
pub trait RegistrantQueryRepo: Send + Sync {
    async fn list(&self, query: &RegistrantListQuery) -> AppResult<(Vec<WaitlistUser>, i64)>;
    async fn fetch_page(&self, offset: i64, limit: i64) -> AppResult<Vec<WaitlistUser>>;
}

#[derive(Clone)]
pub struct AdminUseCases {
    repo: Arc<dyn RegistrantQueryRepo>,
}

impl AdminUseCases {
    pub fn new(repo: Arc<dyn RegistrantQueryRepo>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn list_registrants(
        &self,
        mut query: RegistrantListQuery,
    ) -> AppResult<RegistrantPage> {
        query.page = query.page.max(1);
        query.per_page = query.per_page.clamp(1, MAX_PAGE_SIZE);
        query.search = query
            .search
            .take()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let (users, total) = self.repo.list(&query).await?;
        let total_pages = (total + query.per_page - 1) / query.per_page;

        Ok(RegistrantPage {
            users,
            total,
            page: query.page,
            per_page: query.per_page,
            total_pages,
        })
    }

    /// Serialize every registrant, paging through the store so exports
    /// larger than one query page are never silently truncated.
    #[instrument(skip(self))]
    pub async fn export_csv(&self) -> AppResult<String> {
        let mut out = String::from(CSV_HEADER);
        out.push('\n');

        let mut offset = 0i64;
        loop {
            let batch = self.repo.fetch_page(offset, EXPORT_BATCH_SIZE).await?;
            let fetched = batch.len() as i64;
            for user in &batch {
                push_csv_row(&mut out, user);
            }
            if fetched < EXPORT_BATCH_SIZE {
                break;
            }
            offset += fetched;
        }

        Ok(out)
    }
}

fn push_csv_row(out: &mut String, user: &WaitlistUser) {
    let completed_tasks = user.completed_tasks.join(", ");
    let created_at = user.created_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let fields = [
        user.id.to_string(),
        user.email.clone(),
        user.username.clone().unwrap_or_default(),
        user.referral_code.clone(),
        user.referred_by.clone().unwrap_or_default(),
        user.referral_count.to_string(),
        completed_tasks,
        created_at,
    ];
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&csv_escape(field));
    }
    out.push('\n');
}

/// RFC 4180 quoting: wrap fields containing a comma, quote, or newline and
/// double any embedded quotes.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
