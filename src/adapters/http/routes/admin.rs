use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    adapters::http::{
        app_state::AppState,
        middleware::{ADMIN_COOKIE, admin_auth},
    },
    app_error::{AppError, AppResult},
    application::{
        jwt,
        use_cases::admin::{DEFAULT_PAGE_SIZE, RegistrantListQuery, SortField, SortOrder},
    },
    domain::entities::waitlist_user::WaitlistUser,
};

pub fn router(app_state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/users", get(list_users))
        .route("/export", get(export_users))
        .route_layer(middleware::from_fn_with_state(app_state, admin_auth));

    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(protected)
}

#[derive(Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> AppResult<(StatusCode, HeaderMap)> {
    let config = &app_state.config;
    let digest = hex::encode(Sha256::digest(payload.password.as_bytes()));
    if payload.email != config.admin_email || digest != config.admin_password_sha256 {
        return Err(AppError::Unauthorized);
    }

    let token = jwt::issue(
        &config.admin_email,
        &config.jwt_secret,
        config.admin_session_ttl,
    )?;
    let cookie = Cookie::build((ADMIN_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(config.admin_session_ttl)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, cookie.to_string().parse().unwrap());
    Ok((StatusCode::NO_CONTENT, headers))
}

async fn logout() -> (StatusCode, HeaderMap) {
    let cookie = Cookie::build((ADMIN_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(0))
        .build();

    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, cookie.to_string().parse().unwrap());
    (StatusCode::NO_CONTENT, headers)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    page: Option<i64>,
    limit: Option<i64>,
    sort_by: Option<String>,
    order: Option<String>,
    search: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    users: Vec<WaitlistUser>,
    total: i64,
    page: i64,
    limit: i64,
    total_pages: i64,
}

async fn list_users(
    State(app_state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<ListResponse>> {
    let page = app_state
        .admin_use_cases
        .list_registrants(RegistrantListQuery {
            page: params.page.unwrap_or(1),
            per_page: params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            sort_by: SortField::parse(params.sort_by.as_deref()),
            order: SortOrder::parse(params.order.as_deref()),
            search: params.search,
        })
        .await?;

    Ok(Json(ListResponse {
        users: page.users,
        total: page.total,
        page: page.page,
        limit: page.per_page,
        total_pages: page.total_pages,
    }))
}

async fn export_users(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let csv = app_state.admin_use_cases.export_csv().await?;

    let filename = format!("leippass-waitlist-{}.csv", Utc::now().format("%Y-%m-%d"));
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "text/csv".parse().unwrap());
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{filename}\"")
            .parse()
            .unwrap(),
    );
    Ok((headers, csv))
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;

    use crate::{
        infra::app::create_app,
        test_utils::{
            TEST_ADMIN_EMAIL, TEST_ADMIN_PASSWORD, TestAppStateBuilder, create_test_registrant,
        },
    };

    use super::*;

    fn seeded_server(count: usize) -> TestServer {
        let mut builder = TestAppStateBuilder::new();
        for i in 0..count {
            builder = builder.with_user(create_test_registrant(move |u| {
                u.email = format!("user{i}@x.com");
                u.created_at += chrono::Duration::minutes(i as i64);
            }));
        }
        let (app_state, _repo) = builder.build();
        TestServer::new(create_app(app_state)).unwrap()
    }

    async fn login(server: &TestServer) -> Cookie<'static> {
        let response = server
            .post("/api/admin/login")
            .json(&serde_json::json!({
                "email": TEST_ADMIN_EMAIL,
                "password": TEST_ADMIN_PASSWORD,
            }))
            .await;
        response.assert_status(StatusCode::NO_CONTENT);

        let session = response.cookie(ADMIN_COOKIE);
        assert!(!session.value().is_empty());
        session
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let server = seeded_server(0);
        let response = server
            .post("/api/admin/login")
            .json(&serde_json::json!({
                "email": TEST_ADMIN_EMAIL,
                "password": "wrong",
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn users_requires_session() {
        let server = seeded_server(1);
        let response = server.get("/api/admin/users").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn users_rejects_garbage_session() {
        let server = seeded_server(1);
        let response = server
            .get("/api/admin/users")
            .add_cookie(Cookie::new(ADMIN_COOKIE, "not-a-jwt"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn users_paginates_and_reports_total_pages() {
        let server = seeded_server(5);
        let session = login(&server).await;

        let response = server
            .get("/api/admin/users")
            .add_query_param("limit", "2")
            .add_query_param("page", "1")
            .add_cookie(session)
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["users"].as_array().unwrap().len(), 2);
        assert_eq!(body["total"], 5);
        assert_eq!(body["page"], 1);
        assert_eq!(body["limit"], 2);
        assert_eq!(body["totalPages"], 3);
        // Default sort: newest first.
        assert_eq!(body["users"][0]["email"], "user4@x.com");
    }

    #[tokio::test]
    async fn users_filters_by_search_term() {
        let mut builder = TestAppStateBuilder::new();
        builder = builder
            .with_user(create_test_registrant(|u| u.email = "bob@x.com".to_string()))
            .with_user(create_test_registrant(|u| {
                u.email = "carol@x.com".to_string();
                u.username = Some("BigBob".to_string());
            }))
            .with_user(create_test_registrant(|u| u.email = "dave@x.com".to_string()));
        let (app_state, _repo) = builder.build();
        let server = TestServer::new(create_app(app_state)).unwrap();
        let session = login(&server).await;

        let response = server
            .get("/api/admin/users")
            .add_query_param("search", "bob")
            .add_cookie(session)
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["total"], 2);
        assert_eq!(body["users"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn export_returns_csv_attachment_with_every_row() {
        let server = seeded_server(3);
        let session = login(&server).await;

        let response = server
            .get("/api/admin/export")
            .add_cookie(session)
            .await;

        response.assert_status_ok();
        assert_eq!(response.header(header::CONTENT_TYPE), "text/csv");
        let disposition = response.header(header::CONTENT_DISPOSITION);
        assert!(
            disposition
                .to_str()
                .unwrap()
                .starts_with("attachment; filename=\"leippass-waitlist-")
        );

        let body = response.text();
        let lines: Vec<&str> = body.trim_end().lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("id,email,username,referralCode"));
    }

    #[tokio::test]
    async fn logout_expires_the_session_cookie() {
        let server = seeded_server(0);
        let response = server.post("/api/admin/logout").await;
        response.assert_status(StatusCode::NO_CONTENT);

        let cookie = response.cookie(ADMIN_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
