//! Configuration loading from the environment

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default quiet period before an app lookup is sent
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Default delay before a blurred picker closes
pub const DEFAULT_BLUR_GRACE: Duration = Duration::from_millis(120);

/// Control surface configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path to the engine's Unix domain socket
    pub socket_path: PathBuf,

    /// Quiet period for the app lookup
    pub search_debounce: Duration,

    /// Grace delay before the picker closes on blur
    pub blur_grace: Duration,

    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let socket_path = match lookup("GOKEY_SOCKET") {
            Some(path) => PathBuf::from(path),
            None => {
                let home = lookup("HOME").context("HOME is not set")?;
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("gokey")
                    .join("engine.sock")
            }
        };

        let search_debounce =
            millis(&lookup, "GOKEY_SEARCH_DEBOUNCE_MS")?.unwrap_or(DEFAULT_SEARCH_DEBOUNCE);
        let blur_grace = millis(&lookup, "GOKEY_BLUR_GRACE_MS")?.unwrap_or(DEFAULT_BLUR_GRACE);
        let log_filter = lookup("GOKEY_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            socket_path,
            search_debounce,
            blur_grace,
            log_filter,
        })
    }
}

fn millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .with_context(|| format!("{key} must be a number of milliseconds, got `{raw}`"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("HOME", "/Users/lan")])).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/Users/lan/.local/share/gokey/engine.sock")
        );
        assert_eq!(config.search_debounce, DEFAULT_SEARCH_DEBOUNCE);
        assert_eq!(config.blur_grace, DEFAULT_BLUR_GRACE);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("GOKEY_SOCKET", "/tmp/gokey.sock"),
            ("GOKEY_SEARCH_DEBOUNCE_MS", "50"),
            ("GOKEY_BLUR_GRACE_MS", " 10 "),
            ("GOKEY_LOG", "gokey_control=debug"),
        ]))
        .unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/gokey.sock"));
        assert_eq!(config.search_debounce, Duration::from_millis(50));
        assert_eq!(config.blur_grace, Duration::from_millis(10));
        assert_eq!(config.log_filter, "gokey_control=debug");
    }

    #[test]
    fn test_missing_home_without_socket_fails() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn test_bad_duration_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("HOME", "/Users/lan"),
            ("GOKEY_SEARCH_DEBOUNCE_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("GOKEY_SEARCH_DEBOUNCE_MS"));
    }
}
