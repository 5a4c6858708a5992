use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::store::{SearchError, SearchIndex, SearchRecord, VectorQuery};
use crate::core::config::SearchSettings;

/// Azure AI Search client using integrated vectorization (`kind: "text"`
/// vector queries), so no embedding call is made client-side.
#[derive(Clone)]
pub struct AzureSearchClient {
    endpoint: String,
    api_key: String,
    index: String,
    api_version: String,
    client: Client,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<SearchRecord>,
}

impl AzureSearchClient {
    pub fn new(settings: &SearchSettings) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            index: settings.index.clone(),
            api_version: settings.api_version.clone(),
            client,
        })
    }

    fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint, self.index, self.api_version
        )
    }
}

#[async_trait]
impl SearchIndex for AzureSearchClient {
    async fn search(&self, query: &VectorQuery) -> Result<Vec<SearchRecord>, SearchError> {
        if self.endpoint.is_empty() {
            return Err(SearchError::NotConfigured("AZURE_SEARCH_ENDPOINT"));
        }
        if self.index.is_empty() {
            return Err(SearchError::NotConfigured("AZURE_SEARCH_INDEX"));
        }

        let body = json!({
            "search": null,
            "vectorQueries": [{
                "kind": "text",
                "text": query.text,
                "k": query.k,
                "fields": query.fields,
                "exhaustive": query.exhaustive,
            }],
            "select": query.select.join(","),
            "top": query.k,
        });

        let res = self
            .client
            .post(self.search_url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let payload: SearchResponse = res
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(payload.value)
    }
}
