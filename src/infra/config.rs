use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use time::Duration;
use url::Url;

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Front-end origin; referral links and path-segment redirects point here.
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub jwt_secret: SecretString,
    pub admin_email: String,
    /// Hex-encoded SHA-256 of the admin password, so the plaintext never
    /// sits in the environment.
    pub admin_password_sha256: String,
    pub admin_session_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());

        let app_origin: Url = get_env("APP_ORIGIN");
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");

        let admin_email: String = get_env("ADMIN_EMAIL");
        let admin_password_sha256: String =
            get_env::<String>("ADMIN_PASSWORD_SHA256").to_lowercase();
        let admin_session_ttl_hours: i64 = get_env_default("ADMIN_SESSION_TTL_HOURS", 24);

        Self {
            bind_addr,
            database_url,
            app_origin,
            cors_origin,
            jwt_secret,
            admin_email,
            admin_password_sha256,
            admin_session_ttl: Duration::hours(admin_session_ttl_hours),
        }
    }
}
