//! Controller configuration, read once from environment variables

use crate::error::ControllerError;
use crate::reconciler::ReconcilerOptions;
use cvp_state::{ApplyMode, ContainerMode, InventoryMode, SearchKey};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CVP_URL: &str = "https://cvp.local";

#[derive(Debug, Clone)]
pub struct Config {
    pub cvp_url: String,
    pub cvp_token: String,
    pub state_file: PathBuf,
    pub http_timeout: Duration,
    pub options: ReconcilerOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cvp_url = lookup("CVP_URL").unwrap_or_else(|| DEFAULT_CVP_URL.to_string());
        let cvp_token = lookup("CVP_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ControllerError::InvalidConfig(
                "CVP_TOKEN environment variable is required".to_string()
            ))?;
        let state_file = lookup("CVP_STATE_FILE")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ControllerError::InvalidConfig(
                "CVP_STATE_FILE environment variable is required".to_string()
            ))?;

        let workers: usize = parse(&lookup, "CVP_WORKERS", 4)?;
        if workers == 0 {
            return Err(ControllerError::InvalidConfig("CVP_WORKERS must be at least 1".to_string()));
        }

        let options = ReconcilerOptions {
            workers,
            dry_run: parse(&lookup, "CVP_DRY_RUN", false)?,
            apply_mode: parse(&lookup, "CVP_APPLY_MODE", ApplyMode::Loose)?,
            container_mode: parse(&lookup, "CVP_CONTAINER_MODE", ContainerMode::Merge)?,
            search_key: parse(&lookup, "CVP_SEARCH_KEY", SearchKey::Hostname)?,
            inventory_mode: parse(&lookup, "CVP_INVENTORY_MODE", InventoryMode::Strict)?,
            execute_tasks: parse(&lookup, "CVP_EXECUTE_TASKS", false)?,
            task_timeout: Duration::from_secs(parse(&lookup, "CVP_TASK_TIMEOUT_SECS", 300)?),
            fact_filter: lookup("CVP_FACT_FILTER").filter(|p| !p.trim().is_empty()),
        };

        Ok(Self {
            cvp_url,
            cvp_token,
            state_file,
            http_timeout: Duration::from_secs(parse(&lookup, "CVP_TIMEOUT_SECS", 30)?),
            options,
        })
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{}={}: {}", key, raw, e))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ControllerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("CVP_TOKEN", "t"), ("CVP_STATE_FILE", "state.yaml")]).unwrap();

        assert_eq!(config.cvp_url, "https://cvp.local");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.options.workers, 4);
        assert!(!config.options.dry_run);
        assert_eq!(config.options.apply_mode, ApplyMode::Loose);
        assert_eq!(config.options.container_mode, ContainerMode::Merge);
        assert_eq!(config.options.search_key, SearchKey::Hostname);
        assert_eq!(config.options.inventory_mode, InventoryMode::Strict);
        assert!(!config.options.execute_tasks);
        assert_eq!(config.options.task_timeout, Duration::from_secs(300));
        assert_eq!(config.options.fact_filter, None);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("CVP_TOKEN", "t"),
            ("CVP_STATE_FILE", "state.yaml"),
            ("CVP_URL", "https://cvp.example.com"),
            ("CVP_WORKERS", "8"),
            ("CVP_DRY_RUN", "true"),
            ("CVP_APPLY_MODE", "strict"),
            ("CVP_SEARCH_KEY", "serialNumber"),
            ("CVP_FACT_FILTER", "^leaf"),
        ])
        .unwrap();

        assert_eq!(config.cvp_url, "https://cvp.example.com");
        assert_eq!(config.options.workers, 8);
        assert!(config.options.dry_run);
        assert_eq!(config.options.apply_mode, ApplyMode::Strict);
        assert_eq!(config.options.search_key, SearchKey::SerialNumber);
        assert_eq!(config.options.fact_filter.as_deref(), Some("^leaf"));
    }

    #[test]
    fn test_missing_token_and_bad_values() {
        assert!(matches!(
            config(&[("CVP_STATE_FILE", "s.yaml")]),
            Err(ControllerError::InvalidConfig(msg)) if msg.contains("CVP_TOKEN")
        ));
        assert!(matches!(
            config(&[("CVP_TOKEN", "t"), ("CVP_STATE_FILE", "s.yaml"), ("CVP_WORKERS", "0")]),
            Err(ControllerError::InvalidConfig(_))
        ));
        assert!(matches!(
            config(&[("CVP_TOKEN", "t"), ("CVP_STATE_FILE", "s.yaml"), ("CVP_CONTAINER_MODE", "replace")]),
            Err(ControllerError::InvalidConfig(msg)) if msg.contains("CVP_CONTAINER_MODE")
        ));
    }
}
