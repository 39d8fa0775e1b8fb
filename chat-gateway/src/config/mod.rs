use service_core::config as core_config;
use service_core::error::AppError;
use service_core::retry::RetryConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 1000;
const DEFAULT_ALLOWED_ORIGINS: &str =
    "http://localhost:3000,http://localhost:5173,http://127.0.0.1:3000,http://127.0.0.1:5173";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub common: core_config::Config,
    pub model: ModelConfig,
    pub relay: RelayConfig,
    pub cors: CorsConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model identifier sent with every chat call (e.g. llama3.2).
    pub name: String,
    pub backend: BackendKind,
    /// Base URL of the Ollama-compatible server.
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Ollama,
    /// Canned replies, no network. Useful for local smoke runs.
    Mock,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(BackendKind::Ollama),
            "mock" => Ok(BackendKind::Mock),
            other => Err(format!("unknown inference backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl RelayConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::fixed(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl GatewayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(GatewayConfig {
            common: common_config,
            model: ModelConfig {
                name: get_env("LLM_MODEL", Some(DEFAULT_MODEL), is_prod)?,
                backend: parse_env("INFERENCE_BACKEND", Some("ollama"), is_prod)?,
                base_url: get_env("OLLAMA_BASE_URL", Some(DEFAULT_OLLAMA_BASE_URL), is_prod)?,
                request_timeout_secs: parse_env(
                    "LLM_REQUEST_TIMEOUT_SECS",
                    Some(&DEFAULT_REQUEST_TIMEOUT_SECS.to_string()),
                    is_prod,
                )?,
            },
            relay: RelayConfig {
                max_attempts: parse_env(
                    "RELAY_MAX_ATTEMPTS",
                    Some(&DEFAULT_MAX_ATTEMPTS.to_string()),
                    is_prod,
                )?,
                backoff_ms: parse_env(
                    "RELAY_BACKOFF_MS",
                    Some(&DEFAULT_BACKOFF_MS.to_string()),
                    is_prod,
                )?,
            },
            cors: CorsConfig {
                allowed_origins: split_list(&get_env(
                    "CORS_ALLOWED_ORIGINS",
                    Some(DEFAULT_ALLOWED_ORIGINS),
                    is_prod,
                )?),
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
        })
    }

    /// Development defaults with no environment lookups.
    pub fn for_tests() -> Self {
        GatewayConfig {
            common: core_config::Config::default(),
            model: ModelConfig {
                name: DEFAULT_MODEL.to_string(),
                backend: BackendKind::Mock,
                base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            relay: RelayConfig {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                backoff_ms: DEFAULT_BACKOFF_MS,
            },
            cors: CorsConfig {
                allowed_origins: split_list(DEFAULT_ALLOWED_ORIGINS),
            },
            otlp_endpoint: None,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(key, default, is_prod)?;
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empty_entries() {
        assert_eq!(
            split_list(" http://a:1 , ,http://b:2,"),
            vec!["http://a:1".to_string(), "http://b:2".to_string()]
        );
    }

    #[test]
    fn backend_kind_parses_case_insensitively() {
        assert_eq!("Ollama".parse::<BackendKind>(), Ok(BackendKind::Ollama));
        assert_eq!("mock".parse::<BackendKind>(), Ok(BackendKind::Mock));
        assert!("vllm".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_defaults_match_relay_policy() {
        let config = GatewayConfig::for_tests();
        assert_eq!(config.common.port, 8000);
        assert_eq!(config.relay.retry_config(), RetryConfig::default());
        assert_eq!(config.cors.allowed_origins.len(), 4);
    }

    #[test]
    fn load_builds_config_from_environment() {
        std::env::set_var("RELAY_MAX_ATTEMPTS", "5");
        std::env::set_var("RELAY_BACKOFF_MS", "250");
        std::env::set_var("INFERENCE_BACKEND", "Mock");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "http://a:1, http://b:2");

        let config = GatewayConfig::load().unwrap();

        assert_eq!(
            config.relay.retry_config(),
            RetryConfig::fixed(5, Duration::from_millis(250))
        );
        assert_eq!(config.model.backend, BackendKind::Mock);
        assert_eq!(config.cors.allowed_origins, vec!["http://a:1", "http://b:2"]);
    }

    #[test]
    fn parse_env_reports_bad_numbers() {
        std::env::set_var("CHAT_GATEWAY_TEST_BAD_NUMBER", "three");
        let result: Result<u32, _> = parse_env("CHAT_GATEWAY_TEST_BAD_NUMBER", None, false);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn get_env_falls_back_to_default_outside_prod() {
        let value = get_env("CHAT_GATEWAY_TEST_UNSET_KEY", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
        assert!(get_env("CHAT_GATEWAY_TEST_UNSET_KEY", Some("fallback"), true).is_err());
    }
}
