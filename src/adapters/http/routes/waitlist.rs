use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    routing::post,
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::use_cases::signup::SignupRequest,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(join_waitlist))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinPayload {
    #[serde(default)]
    email: String,
    username: Option<String>,
    referred_by: Option<String>,
    #[serde(default)]
    completed_tasks: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinResponse {
    success: bool,
    message: &'static str,
    referral_code: String,
}

async fn join_waitlist(
    State(app_state): State<AppState>,
    Json(payload): Json<JoinPayload>,
) -> AppResult<impl IntoResponse> {
    let user = app_state
        .signup_use_cases
        .signup(SignupRequest {
            email: payload.email,
            username: payload.username,
            referred_by: payload.referred_by,
            completed_tasks: payload.completed_tasks,
        })
        .await?;

    Ok(Json(JoinResponse {
        success: true,
        message: "Successfully joined waitlist",
        referral_code: user.referral_code,
    }))
}

// Path segments that are pages of their own, not referral usernames.
const RESERVED_SEGMENTS: [&str; 3] = ["waitlist", "admin", "favicon.ico"];

/// Referral entry by path: `/<username>` is rewritten to the front-end
/// waitlist page with the username as the `ref` parameter.
pub async fn referral_redirect(
    State(app_state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Redirect> {
    let mut target = app_state
        .config
        .app_origin
        .join("/waitlist")
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !RESERVED_SEGMENTS.contains(&username.as_str()) {
        target.query_pairs_mut().append_pair("ref", &username);
    }
    Ok(Redirect::temporary(target.as_str()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::{
        infra::app::create_app,
        test_utils::{InMemoryWaitlistRepo, TestAppStateBuilder, create_test_registrant},
    };

    fn server() -> (TestServer, Arc<InMemoryWaitlistRepo>) {
        let (app_state, repo) = TestAppStateBuilder::new().build();
        (TestServer::new(create_app(app_state)).unwrap(), repo)
    }

    #[tokio::test]
    async fn join_returns_referral_code() {
        let (server, repo) = server();

        let response = server
            .post("/api/waitlist")
            .json(&serde_json::json!({ "email": "a@x.com" }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Successfully joined waitlist");
        assert!(!body["referralCode"].as_str().unwrap().is_empty());

        let stored = repo.get_all();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].referral_count, 0);
    }

    #[tokio::test]
    async fn join_rejects_email_without_at_sign() {
        let (server, repo) = server();

        let response = server
            .post("/api/waitlist")
            .json(&serde_json::json!({ "email": "not-an-email" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "INVALID_INPUT");
        assert!(repo.get_all().is_empty());
    }

    #[tokio::test]
    async fn join_rejects_duplicate_email() {
        let (server, repo) = server();

        server
            .post("/api/waitlist")
            .json(&serde_json::json!({ "email": "a@x.com" }))
            .await
            .assert_status_ok();

        let response = server
            .post("/api/waitlist")
            .json(&serde_json::json!({ "email": "a@x.com" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "DUPLICATE_EMAIL");
        assert_eq!(repo.get_all().len(), 1);
    }

    #[tokio::test]
    async fn join_credits_referrer() {
        let referrer = create_test_registrant(|u| u.referral_code = "ref-code".to_string());
        let (app_state, repo) = TestAppStateBuilder::new().with_user(referrer).build();
        let server = TestServer::new(create_app(app_state)).unwrap();

        let response = server
            .post("/api/waitlist")
            .json(&serde_json::json!({
                "email": "b@x.com",
                "referredBy": "ref-code",
                "completedTasks": ["follow"],
            }))
            .await;

        response.assert_status_ok();
        assert_eq!(repo.find_by_code_sync("ref-code").unwrap().referral_count, 1);
    }

    #[tokio::test]
    async fn referral_path_redirects_with_ref_param() {
        let (server, _repo) = server();

        let response = server.get("/bob").await;

        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.header("location"),
            "http://localhost:3000/waitlist?ref=bob"
        );
    }

    #[tokio::test]
    async fn reserved_path_redirects_without_ref_param() {
        let (server, _repo) = server();

        let response = server.get("/favicon.ico").await;

        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), "http://localhost:3000/waitlist");
    }
}
