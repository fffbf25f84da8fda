//! Chat-completions judge backend.
//!
//! Generation sends the question to the horse's model with a short-answer
//! system prompt. Evaluation asks the judge model for a JSON object
//! `{"isValid": bool}` and reads the verdict from it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{JudgeClient, JudgeError};
use crate::config::JudgeConfig;

const GENERATION_SYSTEM_PROMPT: &str = "Please provide concise answers in about 300 characters.";
const GENERATION_MAX_TOKENS: u32 = 80;

const EVALUATION_SYSTEM_PROMPT: &str = "You must respond with valid JSON only.";
const EVALUATION_MAX_TOKENS: u32 = 20;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(rename = "isValid")]
    is_valid: bool,
}

// ---------------------------------------------------------------------------
// ClodJudge
// ---------------------------------------------------------------------------

/// HTTP judge client for an OpenAI-compatible chat-completions API.
pub struct ClodJudge {
    client: reqwest::Client,
    config: JudgeConfig,
}

impl ClodJudge {
    pub fn new(config: JudgeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling).
    pub fn with_client(client: reqwest::Client, config: JudgeConfig) -> Self {
        Self { client, config }
    }

    /// Send one chat completion and return the first choice's text.
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, JudgeError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(JudgeError::MissingCredential)?;

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(
            url = %self.config.api_url,
            model = request.model,
            status = status.as_u16(),
            "Chat completion returned",
        );

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(JudgeError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::MalformedResponse(e.to_string()))?;

        first_content(parsed)
    }
}

#[async_trait]
impl JudgeClient for ClodJudge {
    async fn generate(&self, model: &str, question: &str) -> Result<String, JudgeError> {
        let request = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: GENERATION_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
            max_tokens: GENERATION_MAX_TOKENS,
            response_format: None,
        };

        self.complete(&request).await
    }

    async fn evaluate(&self, question: &str, answer: &str) -> Result<bool, JudgeError> {
        let prompt = evaluation_prompt(question, answer);
        let request = ChatRequest {
            model: &self.config.judge_model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: EVALUATION_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: EVALUATION_MAX_TOKENS,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let content = self.complete(&request).await?;
        parse_verdict(&content)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn evaluation_prompt(question: &str, answer: &str) -> String {
    format!(
        "You are an answer evaluator. Evaluate if the following answer is appropriate for the question. \
         Respond with a JSON object containing a single boolean field 'isValid'. Set it to true if the answer is good, \
         or false if it's inappropriate, irrelevant, or contains errors.\n\n\
         Question: {question}\nAnswer: {answer}\n\n\
         Respond only with valid JSON in this format: {{\"isValid\": true}} or {{\"isValid\": false}}"
    )
}

fn first_content(response: ChatResponse) -> Result<String, JudgeError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| JudgeError::MalformedResponse("response has no message content".into()))
}

fn parse_verdict(content: &str) -> Result<bool, JudgeError> {
    serde_json::from_str::<Verdict>(content.trim())
        .map(|v| v.is_valid)
        .map_err(|e| JudgeError::MalformedResponse(format!("verdict is not valid JSON: {e}")))
}
