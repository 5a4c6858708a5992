use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{CompletionClient, LlmError};
use super::types::ChatRequest;
use crate::core::config::OpenAiSettings;

/// Azure OpenAI (or an APIM facade in front of it) chat-completions client.
#[derive(Clone)]
pub struct AzureOpenAiClient {
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
    client: Client,
}

impl AzureOpenAiClient {
    pub fn new(settings: &OpenAiSettings) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            deployment: settings.deployment.clone(),
            api_version: settings.api_version.clone(),
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

#[async_trait]
impl CompletionClient for AzureOpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        if self.endpoint.is_empty() {
            return Err(LlmError::NotConfigured("AZURE_OPENAI_ENDPOINT"));
        }

        let mut body = json!({
            "model": self.deployment,
            "messages": request.messages,
        });
        if let (Some(obj), Some(t)) = (body.as_object_mut(), request.temperature) {
            obj.insert("temperature".to_string(), json!(t));
        }

        let res = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        let choice = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| LlmError::Decode("response has no choices".to_string()))?;

        // content is null when the model returns only a refusal or tool call
        Ok(choice["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}
