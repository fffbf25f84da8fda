/// Default chat-completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.clod.io/v1/chat/completions";

/// Default model used to judge answers.
pub const DEFAULT_JUDGE_MODEL: &str = "gpt-4o";

/// Judge backend configuration loaded from environment variables.
#[derive(Clone)]
pub struct JudgeConfig {
    /// Full URL of the chat-completions endpoint.
    pub api_url: String,
    /// Bearer token. `None` makes every call fail with
    /// [`JudgeError::MissingCredential`](crate::JudgeError::MissingCredential).
    pub api_key: Option<String>,
    /// Model that evaluates answers.
    pub judge_model: String,
}

impl JudgeConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var        | Default                                   |
    /// |----------------|-------------------------------------------|
    /// | `CLOD_API_KEY` | unset                                     |
    /// | `CLOD_API_URL` | `https://api.clod.io/v1/chat/completions` |
    /// | `JUDGE_MODEL`  | `gpt-4o`                                  |
    ///
    /// A missing key is not an error here: the server still starts and every
    /// submission falls back to a rejection.
    pub fn from_env() -> Self {
        let api_key = std::env::var("CLOD_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        if api_key.is_none() {
            tracing::warn!("CLOD_API_KEY is not set; all answers will be rejected");
        }

        Self {
            api_url: std::env::var("CLOD_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into()),
            api_key,
            judge_model: std::env::var("JUDGE_MODEL")
                .unwrap_or_else(|_| DEFAULT_JUDGE_MODEL.into()),
        }
    }
}

impl std::fmt::Debug for JudgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("judge_model", &self.judge_model)
            .finish()
    }
}
