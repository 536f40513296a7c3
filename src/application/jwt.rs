use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::app_error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn issue(subject: &str, secret: &secrecy::SecretString, ttl: Duration) -> AppResult<String> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let exp = now + ttl.whole_seconds();
    let claims = Claims {
        sub: subject.to_string(),
        iat: now,
        exp,
    };
    let header = Header::new(Algorithm::HS256);
    encode(
        &header,
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify(token: &str, secret: &secrecy::SecretString) -> AppResult<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn issue_then_verify_roundtrip() {
        let secret = SecretString::new("test_jwt_secret".into());
        let token = issue("admin@example.com", &secret, Duration::hours(1)).unwrap();
        let claims = verify(&token, &secret).unwrap();
        assert_eq!(claims.sub, "admin@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let secret = SecretString::new("test_jwt_secret".into());
        let other = SecretString::new("another_secret".into());
        let token = issue("admin@example.com", &secret, Duration::hours(1)).unwrap();
        assert!(matches!(
            verify(&token, &other),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn verify_rejects_expired_token() {
        let secret = SecretString::new("test_jwt_secret".into());
        let token = issue("admin@example.com", &secret, Duration::hours(-1)).unwrap();
        assert!(matches!(
            verify(&token, &secret),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn verify_rejects_garbage() {
        let secret = SecretString::new("test_jwt_secret".into());
        assert!(matches!(
            verify("not-a-token", &secret),
            Err(AppError::Unauthorized)
        ));
    }
}
