use llm_common::openai::OpenAiClientConfig;
use summary_core::producer::Credential;

use crate::error::AppError;

/// Server configuration loaded explicitly from environment variables.
///
/// Upstream client settings come from the `OPENAI_*` variables (see
/// [`OpenAiClientConfig::from_env`]). Everything here is optional:
/// - `OPENAI_API_KEY`: credential used when a tool call supplies none
/// - `SUMMARIZER_STREAM`: stream completions by default (`true`)
/// - `SUMMARIZER_TRAILING_SENTINEL`: single character stripped from the end
///   of a finalized completion
/// - `SUMMARIZER_RATE_LIMIT_RPS`: requests per second allowed upstream
#[derive(Debug, Clone)]
pub struct Config {
    pub openai: OpenAiClientConfig,
    pub fallback_credential: Option<Credential>,
    pub stream_by_default: bool,
    pub sentinel: Option<char>,
    pub rate_limit_rps: Option<u32>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(OpenAiClientConfig::from_env(), |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(openai: OpenAiClientConfig, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fallback_credential = lookup("OPENAI_API_KEY")
            .map(Credential::new)
            .filter(|c| !c.is_blank());

        let stream_by_default = match lookup("SUMMARIZER_STREAM") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                AppError::Config(format!("SUMMARIZER_STREAM must be true or false, got {raw:?}"))
            })?,
            None => true,
        };

        let sentinel = match lookup("SUMMARIZER_TRAILING_SENTINEL") {
            Some(raw) => parse_sentinel(&raw)?,
            None => None,
        };

        let rate_limit_rps = lookup("SUMMARIZER_RATE_LIMIT_RPS")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|&n| n > 0);

        Ok(Self {
            openai,
            fallback_credential,
            stream_by_default,
            sentinel,
            rate_limit_rps,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_sentinel(raw: &str) -> Result<Option<char>, AppError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(None),
        (Some(c), None) => Ok(Some(c)),
        _ => Err(AppError::Config(format!(
            "SUMMARIZER_TRAILING_SENTINEL must be a single character, got {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(OpenAiClientConfig::default(), |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert!(config.fallback_credential.is_none());
        assert!(config.stream_by_default);
        assert_eq!(config.sentinel, None);
        assert_eq!(config.rate_limit_rps, None);
    }

    #[test]
    fn reads_summarizer_settings() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SUMMARIZER_STREAM", "false"),
            ("SUMMARIZER_TRAILING_SENTINEL", "~"),
            ("SUMMARIZER_RATE_LIMIT_RPS", "5"),
        ])
        .unwrap();
        assert_eq!(
            config.fallback_credential.as_ref().map(Credential::expose),
            Some("sk-test")
        );
        assert!(!config.stream_by_default);
        assert_eq!(config.sentinel, Some('~'));
        assert_eq!(config.rate_limit_rps, Some(5));
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let config = load(&[("OPENAI_API_KEY", "  ")]).unwrap();
        assert!(config.fallback_credential.is_none());
    }

    #[test]
    fn multi_character_sentinel_is_rejected() {
        let err = load(&[("SUMMARIZER_TRAILING_SENTINEL", "~~")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn invalid_stream_flag_is_rejected() {
        assert!(load(&[("SUMMARIZER_STREAM", "maybe")]).is_err());
    }

    #[test]
    fn zero_rate_limit_disables_limiter() {
        let config = load(&[("SUMMARIZER_RATE_LIMIT_RPS", "0")]).unwrap();
        assert_eq!(config.rate_limit_rps, None);
    }
}
