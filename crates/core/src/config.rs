use std::{path::PathBuf, time::Duration};

use crate::{
    article::{BROWSER_USER_AGENT, PAGE_FETCH_TIMEOUT},
    error::Result,
    provider::Provider,
    store::{DEFAULT_HISTORY_LIMIT, default_store_dir},
    summarize::DEFAULT_LANGUAGE,
};

pub const PROVIDER_ENV: &str = "RECAP_PROVIDER";
pub const MODEL_ENV: &str = "RECAP_MODEL";
pub const STORE_DIR_ENV: &str = "RECAP_STORE_DIR";
pub const LANGUAGE_ENV: &str = "RECAP_LANGUAGE";

/// Runtime settings shared by every flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub provider: Provider,
    /// Overrides the provider's default model.
    pub model: Option<String>,
    pub fetch_timeout: Duration,
    pub user_agent: String,
    pub store_dir: Option<PathBuf>,
    pub default_language: String,
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            fetch_timeout: PAGE_FETCH_TIMEOUT,
            user_agent: BROWSER_USER_AGENT.to_string(),
            store_dir: None,
            default_language: DEFAULT_LANGUAGE.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Self::default();
        if let Some(provider) = get(PROVIDER_ENV) {
            settings.provider = provider.parse()?;
        }
        settings.model = get(MODEL_ENV);
        settings.store_dir = get(STORE_DIR_ENV).map(PathBuf::from);
        if let Some(language) = get(LANGUAGE_ENV) {
            settings.default_language = language;
        }
        Ok(settings)
    }

    /// Configured store directory, or the platform default.
    pub fn store_dir_or_default(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(default_store_dir)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.default_language, "English");
        assert_eq!(settings.history_limit, 20);
        assert_eq!(settings.fetch_timeout, Duration::from_secs(10));
    }

    #[test]
    fn environment_overrides_are_applied() {
        let settings = Settings::from_lookup(lookup(&[
            (PROVIDER_ENV, "openai"),
            (MODEL_ENV, "gpt-4o-mini"),
            (STORE_DIR_ENV, "/var/lib/recap"),
            (LANGUAGE_ENV, "Ukrainian"),
        ]))
        .unwrap();
        assert_eq!(settings.provider, Provider::Openai);
        assert_eq!(settings.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(settings.store_dir_or_default(), PathBuf::from("/var/lib/recap"));
        assert_eq!(settings.default_language, "Ukrainian");
    }

    #[test]
    fn blank_values_are_ignored() {
        let settings =
            Settings::from_lookup(lookup(&[(MODEL_ENV, "  "), (LANGUAGE_ENV, "")])).unwrap();
        assert_eq!(settings.model, None);
        assert_eq!(settings.default_language, "English");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = Settings::from_lookup(lookup(&[(PROVIDER_ENV, "mystery")])).unwrap_err();
        assert!(err.is_client_error());
    }
}
