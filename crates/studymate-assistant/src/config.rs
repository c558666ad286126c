//! Assistant configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use studymate_context::{WindowPolicy, DEFAULT_MAX_TURNS};

use crate::error::{AssistantError, AssistantResult};
use crate::prompts::DEFAULT_TUTOR_PROMPT;

pub const MAX_TURNS_ENV: &str = "STUDYMATE_MAX_TURNS";
pub const REQUEST_TIMEOUT_ENV: &str = "STUDYMATE_REQUEST_TIMEOUT_SECS";
pub const SYSTEM_PROMPT_ENV: &str = "STUDYMATE_SYSTEM_PROMPT";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Tutor persona sent as the system turn of every chat
    pub system_prompt: String,
    pub window: WindowPolicy,
    /// Deadline for a single backend call
    pub request_timeout: Duration,
    pub chat_max_tokens: u32,
    pub generation_max_tokens: u32,
    pub chat_temperature: f32,
    pub generation_temperature: f32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_TUTOR_PROMPT.to_string(),
            window: WindowPolicy::new(DEFAULT_MAX_TURNS),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            chat_max_tokens: 1_000,
            generation_max_tokens: 4_000,
            chat_temperature: 0.7,
            generation_temperature: 0.4,
        }
    }
}

impl AssistantConfig {
    /// Defaults overridden by `STUDYMATE_*` environment variables
    pub fn from_env() -> AssistantResult<Self> {
        let mut config = Self::default();

        if let Some(max_turns) = parse_env::<usize>(MAX_TURNS_ENV)? {
            if max_turns < 2 {
                return Err(AssistantError::Config(format!(
                    "{MAX_TURNS_ENV} must be at least 2, got {max_turns}"
                )));
            }
            config.window = WindowPolicy::new(max_turns);
        }

        if let Some(secs) = parse_env::<u64>(REQUEST_TIMEOUT_ENV)? {
            if secs == 0 {
                return Err(AssistantError::Config(format!(
                    "{REQUEST_TIMEOUT_ENV} must be greater than zero"
                )));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(prompt) = std::env::var(SYSTEM_PROMPT_ENV) {
            if !prompt.trim().is_empty() {
                config.system_prompt = prompt;
            }
        }

        Ok(config)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.window = WindowPolicy::new(max_turns);
        self
    }
}

fn parse_env<T>(key: &str) -> AssistantResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| AssistantError::Config(format!("{key}='{raw}': {err}"))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn defaults_match_observed_policy() {
        let config = AssistantConfig::default();
        assert_eq!(config.window.max_turns, 21);
        assert_eq!(config.request_timeout, Duration::from_secs(45));
    }

    #[test]
    fn env_overrides_defaults() {
        let _guard = env_lock().lock().unwrap();
        std::env::set_var(MAX_TURNS_ENV, "11");
        std::env::set_var(REQUEST_TIMEOUT_ENV, "30");

        let config = AssistantConfig::from_env().unwrap();
        assert_eq!(config.window.max_turns, 11);
        assert_eq!(config.request_timeout, Duration::from_secs(30));

        std::env::remove_var(MAX_TURNS_ENV);
        std::env::remove_var(REQUEST_TIMEOUT_ENV);
    }

    #[test]
    fn env_rejects_bad_values() {
        let _guard = env_lock().lock().unwrap();
        std::env::set_var(MAX_TURNS_ENV, "lots");
        assert!(matches!(
            AssistantConfig::from_env(),
            Err(AssistantError::Config(_))
        ));

        std::env::set_var(MAX_TURNS_ENV, "1");
        assert!(AssistantConfig::from_env().is_err());

        std::env::remove_var(MAX_TURNS_ENV);
    }
}
