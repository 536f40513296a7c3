use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Row};

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::{
        admin::{RegistrantListQuery, RegistrantQueryRepo},
        signup::{NewRegistrant, WaitlistRepo},
    },
    domain::entities::waitlist_user::WaitlistUser,
};

const SELECT_COLS: &str =
    "id, email, username, referral_code, referred_by, referral_count, completed_tasks, created_at";

fn row_to_user(row: sqlx::postgres::PgRow) -> WaitlistUser {
    WaitlistUser {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        referral_code: row.get("referral_code"),
        referred_by: row.get("referred_by"),
        referral_count: row.get("referral_count"),
        completed_tasks: row.get("completed_tasks"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl WaitlistRepo for PostgresPersistence {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<WaitlistUser>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM waitlist_users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_user))
    }

    async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<WaitlistUser>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM waitlist_users WHERE referral_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_user))
    }

    async fn insert(&self, registrant: NewRegistrant) -> AppResult<WaitlistUser> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO waitlist_users (id, email, username, referral_code, referred_by, completed_tasks)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SELECT_COLS}
            "#
        ))
        .bind(registrant.id)
        .bind(&registrant.email)
        .bind(&registrant.username)
        .bind(&registrant.referral_code)
        .bind(&registrant.referred_by)
        .bind(&registrant.completed_tasks)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_user(row))
    }

    async fn increment_referral_count(&self, code: &str) -> AppResult<bool> {
        // The increment happens inside the store so concurrent credits for
        // the same referrer never lose updates.
        let result = sqlx::query(
            "UPDATE waitlist_users SET referral_count = referral_count + 1 WHERE referral_code = $1",
        )
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RegistrantQueryRepo for PostgresPersistence {
    async fn list(&self, query: &RegistrantListQuery) -> AppResult<(Vec<WaitlistUser>, i64)> {
        let offset = (query.page - 1) * query.per_page;

        // Count query
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM waitlist_users WHERE TRUE");
        push_search_filter(&mut count_builder, query.search.as_deref());

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;

        // Data query
        let mut data_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {SELECT_COLS} FROM waitlist_users WHERE TRUE"));
        push_search_filter(&mut data_builder, query.search.as_deref());
        data_builder.push(format!(
            " ORDER BY {} {}",
            query.sort_by.column(),
            query.order.sql()
        ));
        data_builder.push(" LIMIT ").push_bind(query.per_page);
        data_builder.push(" OFFSET ").push_bind(offset);

        let rows = data_builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)?;

        Ok((rows.into_iter().map(row_to_user).collect(), total))
    }

    async fn fetch_page(&self, offset: i64, limit: i64) -> AppResult<Vec<WaitlistUser>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM waitlist_users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_user).collect())
    }
}

fn push_search_filter(builder: &mut QueryBuilder<Postgres>, search: Option<&str>) {
    if let Some(term) = search {
        let pattern = format!("%{}%", escape_like(term));
        builder
            .push(" AND (email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR username ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Escape LIKE metacharacters so a search for "100%" matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
