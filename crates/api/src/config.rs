use std::str::FromStr;

use derby_judge::JudgeConfig;

/// Runtime settings for the race server, read once at startup.
///
/// | Env Var                 | Default   |
/// |-------------------------|-----------|
/// | `HOST`                  | `0.0.0.0` |
/// | `PORT`                  | `8080`    |
/// | `CORS_ORIGINS`          | `*`       |
/// | `REQUEST_TIMEOUT_SECS`  | `60`      |
/// | `SHUTDOWN_TIMEOUT_SECS` | `30`      |
/// | `JUDGE_TIMEOUT_SECS`    | `30`      |
///
/// See [`JudgeConfig::from_env`] for the judge variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins the exhibit screens are served from. `*` allows any.
    pub cors_origins: Vec<String>,
    /// Per-request deadline. Must exceed `judge_timeout_secs` so that
    /// `?wait=true` submissions can finish.
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight submissions.
    pub shutdown_timeout_secs: u64,
    /// Upper bound on judge latency per submission.
    pub judge_timeout_secs: u64,
    pub judge: JudgeConfig,
}

impl ServerConfig {
    /// Read the configuration from the environment.
    ///
    /// Panics on a value that does not parse; a misconfigured exhibit should
    /// not start.
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_env("PORT", 8080),
            cors_origins,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 60),
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT_SECS", 30),
            judge_timeout_secs: parse_env("JUDGE_TIMEOUT_SECS", 30),
            judge: JudgeConfig::from_env(),
        }
    }

    /// Whether CORS should accept any origin.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}
