use std::sync::Arc;
use std::time::Duration;

use crate::history::HistoryEntry;
use crate::llm::{ChatMessage, ChatRequest, CompletionClient};
use crate::telemetry::Span;

pub const REWRITE_INSTRUCTION: &str = "Rephrase the user's latest question to be a standalone search query based on the history. Output ONLY the query.";

/// History entries shown to the rewrite prompt.
pub const REWRITE_HISTORY_ENTRIES: usize = 3;

/// Turns a follow-up utterance into a standalone search query.
#[derive(Clone)]
pub struct QueryRewriter {
    client: Arc<dyn CompletionClient>,
    temperature: f64,
    timeout: Duration,
}

/// Prompt for the rewrite call: the instruction plus at most the last three
/// history entries and the new utterance.
pub fn build_rewrite_request(history: &[HistoryEntry], utterance: &str) -> ChatRequest {
    let start = history.len().saturating_sub(REWRITE_HISTORY_ENTRIES);
    let recent = &history[start..];
    let rendered = serde_json::to_string(recent).unwrap_or_else(|_| "[]".to_string());

    ChatRequest::new(vec![
        ChatMessage::system(REWRITE_INSTRUCTION),
        ChatMessage::user(format!(
            "History: {}\nLast Question: {}",
            rendered, utterance
        )),
    ])
}

impl QueryRewriter {
    pub fn new(client: Arc<dyn CompletionClient>, temperature: f64, timeout: Duration) -> Self {
        Self {
            client,
            temperature,
            timeout,
        }
    }

    /// Resolves the query the retriever will receive.
    ///
    /// Empty history skips the model entirely. A failed, timed-out or blank
    /// rewrite falls back to the raw utterance.
    pub async fn search_query(
        &self,
        history: &[HistoryEntry],
        utterance: &str,
        parent: &Span,
    ) -> String {
        if history.is_empty() {
            return utterance.to_string();
        }

        let span = parent.child("rewrite_query");
        span.set_attribute("input.value", utterance);

        let request = build_rewrite_request(history, utterance).with_temperature(self.temperature);
        let outcome = tokio::time::timeout(self.timeout, self.client.complete(request)).await;

        let failure = match outcome {
            Ok(Ok(query)) if !query.trim().is_empty() => {
                span.set_attribute("output.value", query.as_str());
                return query;
            }
            Ok(Ok(_)) => "rewrite returned an empty query".to_string(),
            Ok(Err(err)) => format!("rewrite failed: {}", err),
            Err(_) => format!("rewrite timed out after {:?}", self.timeout),
        };

        tracing::warn!("{}; searching with the raw utterance", failure);
        span.record_error(&failure);
        span.set_attribute("rewrite.fallback", "true");
        span.set_attribute("output.value", utterance);
        utterance.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedCompletion;
    use crate::telemetry::{RecordingTraceSink, TraceSink};

    fn history(n: usize) -> Vec<HistoryEntry> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    HistoryEntry::user(format!("q{i}"))
                } else {
                    HistoryEntry::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn prompt_holds_only_last_three_entries() {
        let request = build_rewrite_request(&history(6), "and the deadline?");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, REWRITE_INSTRUCTION);

        let user = &request.messages[1].content;
        assert!(user.starts_with("History: [{\"role\":\"assistant\",\"content\":\"a3\"}"));
        assert!(user.contains("\"q4\""));
        assert!(user.contains("\"a5\""));
        assert!(!user.contains("\"q2\""));
        assert!(user.ends_with("\nLast Question: and the deadline?"));
    }

    #[tokio::test]
    async fn empty_history_skips_the_model() {
        let client = Arc::new(ScriptedCompletion::answering(|_| Ok("unused".to_string())));
        let rewriter = QueryRewriter::new(client.clone(), 0.3, Duration::from_secs(1));
        let sink = RecordingTraceSink::new();
        let root = sink.start_root("teams_turn");

        let query = rewriter.search_query(&[], "what is the leave policy?", &root).await;
        assert_eq!(query, "what is the leave policy?");
        assert!(client.requests().is_empty());
        drop(root);
        assert!(sink.find("rewrite_query").is_none());
    }

    #[tokio::test]
    async fn uses_model_output_with_low_temperature() {
        let client = Arc::new(ScriptedCompletion::answering(|_| {
            Ok("parental leave deadline".to_string())
        }));
        let rewriter = QueryRewriter::new(client.clone(), 0.3, Duration::from_secs(1));
        let sink = RecordingTraceSink::new();
        let root = sink.start_root("teams_turn");

        let query = rewriter.search_query(&history(2), "and the deadline?", &root).await;
        assert_eq!(query, "parental leave deadline");

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, Some(0.3));
        drop(root);
        let span = sink.find("rewrite_query").unwrap();
        assert_eq!(span.attributes["output.value"], "parental leave deadline");
    }

    #[tokio::test]
    async fn blank_or_failed_rewrite_falls_back() {
        let sink = RecordingTraceSink::new();
        let root = sink.start_root("teams_turn");

        let blank = QueryRewriter::new(
            Arc::new(ScriptedCompletion::answering(|_| Ok("   ".to_string()))),
            0.3,
            Duration::from_secs(1),
        );
        assert_eq!(blank.search_query(&history(2), "raw", &root).await, "raw");

        let failing = QueryRewriter::new(
            Arc::new(ScriptedCompletion::failing()),
            0.3,
            Duration::from_secs(1),
        );
        assert_eq!(failing.search_query(&history(2), "raw", &root).await, "raw");

        drop(root);
        let spans: Vec<_> = sink
            .spans()
            .into_iter()
            .filter(|s| s.name == "rewrite_query")
            .collect();
        assert_eq!(spans.len(), 2);
        assert!(spans.iter().all(|s| s.attributes["rewrite.fallback"] == "true"));
    }

    #[tokio::test]
    async fn slow_rewrite_times_out_to_fallback() {
        let client = Arc::new(
            ScriptedCompletion::answering(|_| Ok("late".to_string()))
                .with_delay(Duration::from_millis(200)),
        );
        let rewriter = QueryRewriter::new(client, 0.3, Duration::from_millis(20));
        let sink = RecordingTraceSink::new();
        let root = sink.start_root("teams_turn");

        assert_eq!(rewriter.search_query(&history(2), "raw", &root).await, "raw");
    }
}
