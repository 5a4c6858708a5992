use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::activity::Activity;

/// Allowed clock drift when checking `exp`.
const CLOCK_SKEW_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token audience does not match app id")]
    WrongAudience,
    #[error("token expired")]
    Expired,
}

/// Decides whether an inbound activity may be processed.
#[async_trait]
pub trait DeliveryValidator: Send + Sync {
    async fn validate(&self, auth_header: &str, activity: &Activity) -> Result<(), AuthError>;
}

/// Claim checks for channel-issued JWTs.
///
/// With no app id configured every request is accepted, matching how the
/// Bot Framework emulator talks to a local bot. Signature verification is
/// left to the channel ingress in front of the service.
pub struct BotAuthValidator {
    app_id: String,
}

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    aud: Value,
    #[serde(default)]
    exp: Option<i64>,
}

impl BotAuthValidator {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }

    fn check_claims(&self, token: &str, now: i64) -> Result<(), AuthError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| AuthError::Malformed("expected three segments".to_string()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        let claims: Claims =
            serde_json::from_slice(&bytes).map_err(|e| AuthError::Malformed(e.to_string()))?;

        let audience_matches = match &claims.aud {
            Value::String(aud) => aud == &self.app_id,
            Value::Array(auds) => auds.iter().any(|a| a.as_str() == Some(self.app_id.as_str())),
            _ => false,
        };
        if !audience_matches {
            return Err(AuthError::WrongAudience);
        }

        match claims.exp {
            Some(exp) if exp + CLOCK_SKEW_SECS >= now => Ok(()),
            _ => Err(AuthError::Expired),
        }
    }
}

#[async_trait]
impl DeliveryValidator for BotAuthValidator {
    async fn validate(&self, auth_header: &str, _activity: &Activity) -> Result<(), AuthError> {
        if self.app_id.is_empty() {
            return Ok(());
        }

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.check_claims(token, chrono::Utc::now().timestamp())
    }
}
