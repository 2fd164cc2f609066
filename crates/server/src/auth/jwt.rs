//! JWT issuance and validation.
//!
//! Tokens are HS256-signed and carry the user's id, username, email, role
//! and full name, with issuer/audience pinned to the configured values.

use crate::config::JwtConfig;
use crate::entity::user::{self, Role};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Claims embedded in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The user's database id.
    pub sub: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub full_name: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Issue a bearer token for an authenticated user.
pub fn issue_token(
    user: &user::Model,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (OffsetDateTime::now_utc() + time::Duration::hours(config.expiry_hours))
        .unix_timestamp() as usize;
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role,
        full_name: user.full_name.clone(),
        exp,
        iss: config.issuer.clone(),
        aud: config.audience.clone(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate a bearer token and return its claims.
///
/// Checks signature, expiry (no clock leeway), issuer and audience.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "unit-test-secret-0123456789abcdef0123".to_string(),
            issuer: "CareHomeAPI".to_string(),
            audience: "CareHomeClient".to_string(),
            expiry_hours: 8,
        }
    }

    fn test_user() -> user::Model {
        user::Model {
            id: 7,
            username: "mgrady".to_string(),
            password_hash: String::new(),
            full_name: "Maeve Grady".to_string(),
            email: "mgrady@example.com".to_string(),
            role: Role::Nurse,
            created_at: OffsetDateTime::now_utc(),
            is_active: true,
        }
    }

    #[test]
    fn issue_and_validate_round_trip() {
        let config = test_config();
        let token = issue_token(&test_user(), &config).unwrap();
        let claims = validate_token(&token, &config).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "mgrady");
        assert_eq!(claims.role, Role::Nurse);
        assert_eq!(claims.full_name, "Maeve Grady");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = test_config();
        let token = issue_token(&test_user(), &config).unwrap();
        let other = JwtConfig {
            secret: "another-secret-0123456789abcdef012345".to_string(),
            ..test_config()
        };
        assert!(validate_token(&token, &other).is_err());
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let config = test_config();
        let token = issue_token(&test_user(), &config).unwrap();
        let other = JwtConfig {
            audience: "SomeOtherClient".to_string(),
            ..test_config()
        };
        assert!(validate_token(&token, &other).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = JwtConfig {
            expiry_hours: -1,
            ..test_config()
        };
        let token = issue_token(&test_user(), &config).unwrap();
        assert!(validate_token(&token, &test_config()).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = test_config();
        let mut token = issue_token(&test_user(), &config).unwrap();
        token.push('x');
        assert!(validate_token(&token, &config).is_err());
    }
}
