use async_trait::async_trait;

/// Errors from a judge backend.
///
/// Callers in the race engine never surface these; they map every variant to
/// the same fallback outcome. The variants exist for logging.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// No API key is configured.
    #[error("Judge API key is not configured")]
    MissingCredential,

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The completion service returned a non-2xx status code.
    #[error("Judge API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response arrived but did not contain what we asked for.
    #[error("Malformed judge response: {0}")]
    MalformedResponse(String),
}

/// Produces answers and verdicts. Both calls may take seconds and may fail.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Answer `question` using `model`.
    async fn generate(&self, model: &str, question: &str) -> Result<String, JudgeError>;

    /// Decide whether `answer` is an acceptable answer to `question`.
    async fn evaluate(&self, question: &str, answer: &str) -> Result<bool, JudgeError>;
}
