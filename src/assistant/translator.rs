use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Runtime;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You write SQLite queries. Given table definitions with a sample row \
and a question, reply with exactly one SELECT statement that answers the question. \
Use only the tables and columns shown. Reply with the SQL only, no explanation.";

/// Turns a natural-language question into SQL, given the store's schema
/// description. `None` means no SQL could be produced.
pub trait Translator {
    fn translate(&self, question: &str, schema: &str) -> Option<String>;

    /// Called when the session's API key changes.
    fn set_api_key(&mut self, _api_key: &str) {}
}

impl<F> Translator for F
where
    F: Fn(&str, &str) -> Option<String>,
{
    fn translate(&self, question: &str, schema: &str) -> Option<String> {
        self(question, schema)
    }
}

#[derive(Error, Debug)]
pub enum TranslatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Response contained no SQL")]
    EmptyResponse,
}

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Translator backed by an OpenAI-compatible chat-completions endpoint.
///
/// Calls are synchronous from the caller's point of view; the HTTP request
/// runs on a private tokio runtime.
pub struct ChatTranslator {
    config: TranslatorConfig,
    client: reqwest::Client,
    runtime: Arc<Runtime>,
}

impl ChatTranslator {
    pub fn new(config: TranslatorConfig) -> Result<Self, TranslatorError> {
        let runtime = Arc::new(
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()?,
        );

        Ok(Self {
            config,
            client: reqwest::Client::new(),
            runtime,
        })
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    fn request_sql(&self, question: &str, schema: &str) -> Result<String, TranslatorError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: build_messages(question, schema),
            temperature: 0.0,
        };

        debug!("Requesting SQL from {} ({})", url, self.config.model);
        let response: ChatResponse = self.runtime.block_on(async {
            self.client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&request)
                .send()
                .await?
                .error_for_status()?
                .json::<ChatResponse>()
                .await
        })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(TranslatorError::EmptyResponse)?;

        let sql = strip_sql_fence(&content);
        if sql.is_empty() {
            return Err(TranslatorError::EmptyResponse);
        }
        Ok(sql)
    }
}

impl Translator for ChatTranslator {
    fn translate(&self, question: &str, schema: &str) -> Option<String> {
        match self.request_sql(question, schema) {
            Ok(sql) => Some(sql),
            Err(e) => {
                warn!("SQL generation failed: {}", e);
                None
            }
        }
    }

    fn set_api_key(&mut self, api_key: &str) {
        self.config.api_key = api_key.to_string();
    }
}

fn build_messages(question: &str, schema: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: format!("{}\nQuestion: {}", schema, question.trim()),
        },
    ]
}

/// Pulls the statement out of a reply that may be wrapped in a Markdown
/// code fence.
fn strip_sql_fence(reply: &str) -> String {
    let trimmed = reply.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    let body = body.strip_prefix("sql").or_else(|| body.strip_prefix("SQL")).unwrap_or(body);
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_sql_fence() {
        assert_eq!(strip_sql_fence("SELECT 1"), "SELECT 1");
        assert_eq!(strip_sql_fence("  SELECT 1;\n"), "SELECT 1;");
        assert_eq!(strip_sql_fence("```sql\nSELECT * FROM t\n```"), "SELECT * FROM t");
        assert_eq!(strip_sql_fence("```\nSELECT 2\n```\n"), "SELECT 2");
        assert_eq!(strip_sql_fence("```sql\n```"), "");
    }

    #[test]
    fn test_build_messages() {
        let messages = build_messages("  total sales? ", "CREATE TABLE sales (\n);\n\n");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(
            messages[1].content,
            "CREATE TABLE sales (\n);\n\n\nQuestion: total sales?"
        );
    }

    #[test]
    fn test_closure_translator() {
        let translator = |question: &str, _schema: &str| Some(format!("-- {}", question));
        assert_eq!(translator.translate("hi", ""), Some("-- hi".to_string()));
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"```sql\nSELECT 1\n```"}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        let content = response.choices[0].message.content.as_deref().unwrap();
        assert_eq!(strip_sql_fence(content), "SELECT 1");
    }

    #[test]
    fn test_set_api_key_updates_config() {
        let mut translator = ChatTranslator::new(TranslatorConfig::default()).unwrap();
        translator.set_api_key("sk-new");

        assert_eq!(translator.config().api_key, "sk-new");
    }

    #[test]
    fn test_unreachable_endpoint_yields_none() {
        let translator = ChatTranslator::new(TranslatorConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            model: "test".to_string(),
            api_key: "key".to_string(),
        })
        .unwrap();

        assert_eq!(translator.translate("anything", "schema"), None);
    }
}
