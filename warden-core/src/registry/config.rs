use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use super::cache::DEFAULT_INSTANCE_TTL;
use super::settings::Settings;
use crate::error::{Error, Result};
use crate::services::ServiceType;

/// Registry configuration file format.
///
/// ```json
/// {
///   "instance_ttl_secs": 3600,
///   "services": {
///     "account": { "implementation": "in-process-memory",
///                  "settings": { "members": { "agent-123": "9" } } },
///     "storage": { "implementation": "local-filesystem",
///                  "settings": { "root": "${DATA_DIR:-/var/lib/warden}" } }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Sliding TTL of cached instances, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_ttl_secs: Option<u64>,

    /// Default implementation per service type
    #[serde(default)]
    pub services: BTreeMap<ServiceType, ServiceConfig>,
}

/// Which implementation backs one service type, and its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub implementation: String,
    #[serde(default)]
    pub settings: Settings,
}

impl ServiceConfig {
    pub fn new(implementation: impl Into<String>, settings: Settings) -> Self {
        Self {
            implementation: implementation.into(),
            settings,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from a JSON file.
    ///
    /// Supports environment variable expansion using `${VAR}` or
    /// `${VAR:-default}` syntax. The path itself is tilde-expanded.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let expanded_path = shellexpand::tilde(&path_str);
        let path = Path::new(expanded_path.as_ref());

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;

        Self::from_json_str(&expand_env_vars(&content))
    }

    /// Parse configuration from JSON text. No variable expansion.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("invalid registry config: {}", e)))
    }

    pub fn with_service(mut self, ty: ServiceType, service: ServiceConfig) -> Self {
        self.services.insert(ty, service);
        self
    }

    pub fn instance_ttl(&self) -> Duration {
        self.instance_ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_INSTANCE_TTL)
    }
}

/// Expand environment variables in a string
///
/// - `${VAR}` - the value of VAR, or empty if unset
/// - `${VAR:-default}` - the value of VAR, or "default" if unset
fn expand_env_vars(input: &str) -> String {
    let mut result = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut var_name = String::new();
        let mut default_value = None;

        while let Some(next_ch) = chars.next() {
            match next_ch {
                '}' => break,
                ':' if chars.peek() == Some(&'-') => {
                    chars.next();
                    let mut default = String::new();
                    for default_ch in chars.by_ref() {
                        if default_ch == '}' {
                            break;
                        }
                        default.push(default_ch);
                    }
                    default_value = Some(default);
                    break;
                }
                other => var_name.push(other),
            }
        }

        match std::env::var(&var_name) {
            Ok(value) => result.push_str(&value),
            Err(_) => result.push_str(default_value.as_deref().unwrap_or_default()),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("WARDEN_TEST_VAR", "hello");
        assert_eq!(expand_env_vars("${WARDEN_TEST_VAR} world"), "hello world");
    }

    #[test]
    fn test_expand_env_vars_default_and_missing() {
        std::env::remove_var("WARDEN_NONEXISTENT_VAR");
        assert_eq!(expand_env_vars("${WARDEN_NONEXISTENT_VAR:-fallback}"), "fallback");
        assert_eq!(expand_env_vars("[${WARDEN_NONEXISTENT_VAR}]"), "[]");
        assert_eq!(expand_env_vars("cost: $5"), "cost: $5");
    }

    #[test]
    fn test_parse_config() {
        let config = RegistryConfig::from_json_str(
            r#"{
                "instance_ttl_secs": 60,
                "services": {
                    "storage": {"implementation": "in-process-memory"},
                    "managed-vault": {"implementation": "file-backed", "settings": {"path": "/v.json"}}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.instance_ttl(), Duration::from_secs(60));
        assert_eq!(
            config.services[&ServiceType::Storage].implementation,
            "in-process-memory"
        );
        assert!(config.services[&ServiceType::Storage].settings.is_empty());
        assert_eq!(
            config.services[&ServiceType::ManagedVault]
                .settings
                .get_str("path"),
            Some("/v.json")
        );
    }

    #[test]
    fn test_unknown_service_type_is_configuration_error() {
        let err = RegistryConfig::from_json_str(
            r#"{"services": {"router": {"implementation": "x"}}}"#,
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_default_ttl() {
        assert_eq!(RegistryConfig::default().instance_ttl(), DEFAULT_INSTANCE_TTL);
    }

    #[tokio::test]
    async fn test_load_expands_env() {
        std::env::set_var("WARDEN_TEST_ROOT", "/srv/data");
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("warden.json");
        std::fs::write(
            &path,
            r#"{"services": {"storage": {"implementation": "local-filesystem",
                "settings": {"root": "${WARDEN_TEST_ROOT}"}}}}"#,
        )
        .unwrap();

        let config = RegistryConfig::load(&path).await.unwrap();
        assert_eq!(
            config.services[&ServiceType::Storage].settings.get_str("root"),
            Some("/srv/data")
        );
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = RegistryConfig::load("/definitely/not/here.json")
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
