//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Remote schedule-generation endpoint used by the public wizard.
pub const DEFAULT_ENDPOINT: &str = "https://isaapi.devclub.com.br/d718f39b-eee5-4249-ac4a-72af52b0135d/public/create-study-program";

/// File name offered when the generated schedule is downloaded.
pub const DOWNLOAD_FILE_NAME: &str = "Cronograma_de_Estudos_DevClub.pdf";

/// Out-of-band support address shown on the error screen.
pub const SUPPORT_EMAIL: &str = "suporte@devclub.com";

/// Planner configuration.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Submission endpoint (`POST`).
    pub endpoint: String,
    /// Sent as `x-function-token`.
    pub function_token: SecretString,
    /// Sent as `x-platform-request-id`.
    pub request_id: String,
    /// Timeout applied to each network call (submit, fetch).
    pub request_timeout: Duration,
    /// Directory for materialized artifacts. `None` uses the system temp dir.
    pub artifact_dir: Option<PathBuf>,
    /// Send the generated label in the `objective` slot instead of the
    /// objective value.
    pub label_as_objective: bool,
    pub download_file_name: String,
    pub support_email: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            function_token: SecretString::from(String::new()),
            request_id: "123456789".to_string(),
            request_timeout: Duration::from_secs(30),
            artifact_dir: None,
            label_as_objective: false,
            download_file_name: DOWNLOAD_FILE_NAME.to_string(),
            support_email: SUPPORT_EMAIL.to_string(),
        }
    }
}

impl PlannerConfig {
    /// Build config from environment variables.
    ///
    /// `PLANNER_FUNCTION_TOKEN` is required; everything else falls back to
    /// [`PlannerConfig::default`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (used by `from_env`).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let function_token = lookup("PLANNER_FUNCTION_TOKEN")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("PLANNER_FUNCTION_TOKEN".to_string()))?;

        let endpoint = lookup("PLANNER_ENDPOINT").unwrap_or(defaults.endpoint);
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "PLANNER_ENDPOINT".to_string(),
                message: format!("expected an http(s) URL, got {endpoint:?}"),
            });
        }

        let request_timeout = match lookup("PLANNER_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "PLANNER_TIMEOUT_SECS".to_string(),
                    message: format!("expected whole seconds, got {raw:?}"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "PLANNER_TIMEOUT_SECS".to_string(),
                        message: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        let label_as_objective = match lookup("PLANNER_LABEL_AS_OBJECTIVE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "PLANNER_LABEL_AS_OBJECTIVE".to_string(),
                message: format!("expected true/false, got {raw:?}"),
            })?,
            None => defaults.label_as_objective,
        };

        Ok(Self {
            endpoint,
            function_token: SecretString::from(function_token),
            request_id: lookup("PLANNER_REQUEST_ID").unwrap_or(defaults.request_id),
            request_timeout,
            artifact_dir: lookup("PLANNER_ARTIFACT_DIR").map(PathBuf::from),
            label_as_objective,
            download_file_name: defaults.download_file_name,
            support_email: defaults.support_email,
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

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_public_wizard() {
        let config = PlannerConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.download_file_name, "Cronograma_de_Estudos_DevClub.pdf");
        assert!(!config.label_as_objective);
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = PlannerConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "PLANNER_FUNCTION_TOKEN"));
    }

    #[test]
    fn reads_overrides() {
        let config = PlannerConfig::from_lookup(lookup_from(&[
            ("PLANNER_FUNCTION_TOKEN", "tok"),
            ("PLANNER_ENDPOINT", "http://localhost:9000/generate"),
            ("PLANNER_TIMEOUT_SECS", "5"),
            ("PLANNER_REQUEST_ID", "abc"),
            ("PLANNER_LABEL_AS_OBJECTIVE", "yes"),
            ("PLANNER_ARTIFACT_DIR", "/tmp/planner"),
        ]))
        .unwrap();

        assert_eq!(config.function_token.expose_secret(), "tok");
        assert_eq!(config.endpoint, "http://localhost:9000/generate");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.request_id, "abc");
        assert!(config.label_as_objective);
        assert_eq!(config.artifact_dir, Some(PathBuf::from("/tmp/planner")));
    }

    #[test]
    fn rejects_bad_values() {
        let zero = PlannerConfig::from_lookup(lookup_from(&[
            ("PLANNER_FUNCTION_TOKEN", "tok"),
            ("PLANNER_TIMEOUT_SECS", "0"),
        ]));
        assert!(matches!(zero, Err(ConfigError::InvalidValue { .. })));

        let scheme = PlannerConfig::from_lookup(lookup_from(&[
            ("PLANNER_FUNCTION_TOKEN", "tok"),
            ("PLANNER_ENDPOINT", "ftp://example.com"),
        ]));
        assert!(matches!(scheme, Err(ConfigError::InvalidValue { .. })));

        let flag = PlannerConfig::from_lookup(lookup_from(&[
            ("PLANNER_FUNCTION_TOKEN", "tok"),
            ("PLANNER_LABEL_AS_OBJECTIVE", "maybe"),
        ]));
        assert!(matches!(flag, Err(ConfigError::InvalidValue { .. })));
    }
}
