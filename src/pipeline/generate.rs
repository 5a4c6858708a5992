use std::sync::Arc;

use crate::history::HistoryEntry;
use crate::llm::{ChatMessage, ChatRequest, CompletionClient, LlmError};
use crate::rag::{render_chunks, RetrievedChunk};

pub const ANSWER_INSTRUCTION: &str = "You are a helpful assistant. Use these sources to answer: ";

/// System instruction followed by the full window and the pending utterance.
///
/// The pending utterance only exists in this prompt; it joins the stored
/// history after an answer is produced.
pub fn build_answer_messages(
    chunks: &[RetrievedChunk],
    history: &[HistoryEntry],
    utterance: &str,
) -> Vec<ChatMessage> {
    let sources = serde_json::to_string(&render_chunks(chunks)).unwrap_or_else(|_| "[]".to_string());

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(format!("{}{}", ANSWER_INSTRUCTION, sources)));
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(ChatMessage::user(utterance));
    messages
}

/// Produces the grounded answer. Uses the model's default temperature.
#[derive(Clone)]
pub struct AnswerGenerator {
    client: Arc<dyn CompletionClient>,
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        self.client.complete(ChatRequest::new(messages)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedCompletion;

    #[test]
    fn embeds_rendered_chunks_as_json_array() {
        let chunks = vec![
            RetrievedChunk {
                source: "hr.pdf".to_string(),
                content: "20 days leave".to_string(),
            },
            RetrievedChunk {
                source: "Doc".to_string(),
                content: String::new(),
            },
        ];
        let messages = build_answer_messages(&chunks, &[], "how much leave?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(
            messages[0].content,
            r#"You are a helpful assistant. Use these sources to answer: ["[hr.pdf] 20 days leave","[Doc] "]"#
        );
        assert_eq!(messages[1], ChatMessage::user("how much leave?"));
    }

    #[test]
    fn history_precedes_pending_utterance() {
        let history = vec![HistoryEntry::user("q1"), HistoryEntry::assistant("a1")];
        let messages = build_answer_messages(&[], &history, "q2");

        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert!(messages[0].content.ends_with("[]"));
        assert_eq!(messages[3].content, "q2");
    }

    #[tokio::test]
    async fn generation_leaves_temperature_unset() {
        let client = Arc::new(ScriptedCompletion::answering(|_| Ok("answer".to_string())));
        let generator = AnswerGenerator::new(client.clone());

        let answer = generator
            .generate(build_answer_messages(&[], &[], "hi"))
            .await
            .unwrap();
        assert_eq!(answer, "answer");
        assert_eq!(client.requests()[0].temperature, None);
    }
}
