use crate::api::{ApiClient, ApiResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub const CHAT_PATH: &[&str] = &["api", "ai", "chat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    context: &'a Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    reply: String,
}

/// Ordered conversation with the assistant.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    context: Value,
}

impl ChatSession {
    pub fn new(context: Value) -> Self {
        Self {
            messages: Vec::new(),
            context,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Send `text` with the whole history. On failure the user message is
    /// taken back out so the history is as it was before the call.
    pub async fn send(&mut self, api: &ApiClient, text: &str) -> ApiResult<String> {
        self.messages.push(ChatMessage {
            role: Role::User,
            content: text.to_string(),
        });

        let result: ApiResult<ChatResponse> = api
            .post(
                CHAT_PATH,
                &ChatRequest {
                    messages: &self.messages,
                    context: &self.context,
                },
            )
            .await;

        match result {
            Ok(resp) => {
                self.messages.push(ChatMessage {
                    role: Role::Assistant,
                    content: resp.reply.clone(),
                });
                Ok(resp.reply)
            }
            Err(e) => {
                self.messages.pop();
                warn!(error = %e, "chat request failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let messages = vec![ChatMessage {
            role: Role::User,
            content: "hi".into(),
        }];
        let context = json!({"dashboard": "sales"});
        let body = serde_json::to_value(ChatRequest {
            messages: &messages,
            context: &context,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"messages": [{"role": "user", "content": "hi"}], "context": {"dashboard": "sales"}})
        );
    }

    #[tokio::test]
    async fn test_failed_send_rolls_back() {
        // Nothing listens on port 9 locally.
        let api = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();
        let mut session = ChatSession::new(Value::Null);
        assert!(session.send(&api, "hello").await.is_err());
        assert!(session.messages().is_empty());
    }
}
