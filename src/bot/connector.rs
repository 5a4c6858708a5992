use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use super::activity::Activity;
use crate::core::config::BotSettings;

/// Tokens are refreshed this long before the issuer's expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("activity is missing {0}")]
    MissingField(&'static str),
    #[error("connector request failed: {0}")]
    Transport(String),
    #[error("connector returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("token request failed: {0}")]
    Token(String),
}

/// Outbound channel used to answer an inbound activity.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn send_text(&self, activity: &Activity, text: &str) -> Result<(), ConnectorError>;
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// Bot Connector REST client. Replies are posted to the activity's
/// `serviceUrl`, authenticated with an app-credentials token when an app id
/// is configured.
pub struct BotConnectorClient {
    client: Client,
    app_id: String,
    app_password: String,
    login_url: String,
    scope: String,
    token: Mutex<Option<CachedToken>>,
}

impl BotConnectorClient {
    pub fn new(settings: &BotSettings) -> Result<Self, ConnectorError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            app_id: settings.app_id.clone(),
            app_password: settings.app_password.clone(),
            login_url: settings.login_url.clone(),
            scope: settings.connector_scope.clone(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<Option<String>, ConnectorError> {
        if self.app_id.is_empty() {
            return Ok(None);
        }

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(Some(token.value.clone()));
            }
        }

        let res = self
            .client
            .post(&self.login_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_password.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ConnectorError::Token(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ConnectorError::Token(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = res
            .json()
            .await
            .map_err(|e| ConnectorError::Token(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        tracing::debug!("Refreshed connector token");

        Ok(Some(token.access_token))
    }
}

fn reply_url(activity: &Activity) -> Result<String, ConnectorError> {
    let service_url = activity
        .service_url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(ConnectorError::MissingField("serviceUrl"))?;
    let conversation_id = activity
        .conversation
        .as_ref()
        .map(|c| c.id.as_str())
        .filter(|id| !id.is_empty())
        .ok_or(ConnectorError::MissingField("conversation.id"))?;

    let base = format!(
        "{}/v3/conversations/{}/activities",
        service_url.trim_end_matches('/'),
        urlencoding::encode(conversation_id)
    );
    Ok(match activity.id.as_deref() {
        Some(id) if !id.is_empty() => format!("{}/{}", base, urlencoding::encode(id)),
        _ => base,
    })
}

#[async_trait]
impl ChannelConnector for BotConnectorClient {
    async fn send_text(&self, activity: &Activity, text: &str) -> Result<(), ConnectorError> {
        let url = reply_url(activity)?;
        let reply = activity.reply(text);

        let mut request = self.client.post(&url).json(&reply);
        if let Some(token) = self.access_token().await? {
            request = request.bearer_auth(token);
        }

        let res = request
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ConnectorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
