//! Configuration of the problem details layer.
//!
//! The settings live under the `problem_details` key of the application
//! configuration. Three ways to load them:
//!
//! 1. **Lenient** ([`config_or_default`]): a missing section yields the defaults.
//! 2. **Strict** ([`config_required`]): the section must be present and valid.
//! 3. **Figment** ([`from_figment`], [`load`]): YAML file plus `PROBLEMKIT__*`
//!    environment overrides, e.g. `PROBLEMKIT__PROBLEM_DETAILS__DEBUG=true`.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::{Deserialize, Serialize};

/// Key of the configuration section.
pub const CONFIG_SECTION: &str = "problem_details";

/// Prefix of environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "PROBLEMKIT__";

const DEFAULT_TYPE_BASE: &str = "https://example.com/problems";

/// Configuration error for problem details settings
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing '{section}' section")]
    MissingSection { section: String },
    #[error("'{section}' section must be an object")]
    InvalidStructure { section: String },
    #[error("invalid '{section}' config: {source}")]
    InvalidConfig {
        section: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to load '{section}' config: {source}")]
    Load {
        section: String,
        #[source]
        source: Box<figment::Error>,
    },
    #[error("type_base must be an absolute URI, got '{value}': {source}")]
    InvalidTypeBase {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// How errors are rendered as `application/problem+json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)] // independent switches, not a state machine
pub struct ProblemDetailsConfig {
    /// Keep the raw error list in `detail` so clients reading `detail` keep working.
    pub legacy_mode: bool,
    /// Render explicit HTTP errors as problems too, not only validation errors.
    pub override_http_exceptions: bool,
    /// Base URI of the `type` member; `validation` and `http-error` are appended.
    pub type_base: String,
    /// Add short diagnostics (`debug_hint`, error messages) to bodies. Never enable in production.
    pub debug: bool,
    /// Fill `instance` with the request path and `trace_id` from the request headers.
    pub include_request_context: bool,
}

impl Default for ProblemDetailsConfig {
    fn default() -> Self {
        Self {
            legacy_mode: true,
            override_http_exceptions: false,
            type_base: DEFAULT_TYPE_BASE.to_owned(),
            debug: false,
            include_request_context: false,
        }
    }
}

impl ProblemDetailsConfig {
    /// Check values serde cannot check.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidTypeBase` if `type_base` is not an absolute URI.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.type_base)
            .map(|_| ())
            .map_err(|source| ConfigError::InvalidTypeBase {
                value: self.type_base.clone(),
                source,
            })
    }
}

/// Lenient loader: falls back to defaults when the section is absent.
///
/// - If `root` has no `problem_details` key → `Ok(ProblemDetailsConfig::default())`
/// - If the section is present but invalid → `Err(ConfigError::InvalidConfig)`
///
/// # Errors
/// Returns `ConfigError` if the section exists but cannot be deserialized or validated.
pub fn config_or_default(root: &serde_json::Value) -> Result<ProblemDetailsConfig, ConfigError> {
    let Some(section) = root.get(CONFIG_SECTION) else {
        return Ok(ProblemDetailsConfig::default());
    };
    parse_section(section)
}

/// Strict loader: the section must exist and be an object.
///
/// # Errors
/// Returns `ConfigError` if the section is missing, is not an object, or is invalid.
pub fn config_required(root: &serde_json::Value) -> Result<ProblemDetailsConfig, ConfigError> {
    let section = root
        .get(CONFIG_SECTION)
        .ok_or_else(|| ConfigError::MissingSection {
            section: CONFIG_SECTION.to_owned(),
        })?;
    parse_section(section)
}

fn parse_section(section: &serde_json::Value) -> Result<ProblemDetailsConfig, ConfigError> {
    if !section.is_object() {
        return Err(ConfigError::InvalidStructure {
            section: CONFIG_SECTION.to_owned(),
        });
    }

    let config: ProblemDetailsConfig =
        serde_json::from_value(section.clone()).map_err(|e| ConfigError::InvalidConfig {
            section: CONFIG_SECTION.to_owned(),
            source: e,
        })?;
    config.validate()?;
    Ok(config)
}

/// Extract the section from a figment, defaults when absent.
///
/// # Errors
/// Returns `ConfigError::Load` if the section cannot be extracted, or
/// `ConfigError::InvalidTypeBase` if it fails validation.
pub fn from_figment(figment: &Figment) -> Result<ProblemDetailsConfig, ConfigError> {
    if !figment.contains(CONFIG_SECTION) {
        return Ok(ProblemDetailsConfig::default());
    }

    let config: ProblemDetailsConfig =
        figment
            .extract_inner(CONFIG_SECTION)
            .map_err(|e| ConfigError::Load {
                section: CONFIG_SECTION.to_owned(),
                source: Box::new(e),
            })?;
    config.validate()?;
    tracing::debug!(
        legacy_mode = config.legacy_mode,
        override_http_exceptions = config.override_http_exceptions,
        debug = config.debug,
        "Loaded problem details config"
    );
    Ok(config)
}

/// Load from an optional YAML file, then apply `PROBLEMKIT__*` environment overrides.
///
/// # Errors
/// Returns `ConfigError` if the merged configuration is invalid.
pub fn load(yaml: Option<&Path>) -> Result<ProblemDetailsConfig, ConfigError> {
    let mut figment = Figment::new();
    if let Some(path) = yaml {
        figment = figment.merge(Yaml::file(path));
    }
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
    from_figment(&figment)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use figment::providers::Serialized;
    use serde_json::json;

    #[test]
    fn defaults() {
        let config = ProblemDetailsConfig::default();
        assert!(config.legacy_mode);
        assert!(!config.override_http_exceptions);
        assert!(!config.debug);
        assert!(!config.include_request_context);
        assert_eq!(config.type_base, "https://example.com/problems");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn lenient_missing_section_uses_defaults() {
        let config = config_or_default(&json!({"server": {}})).unwrap();
        assert_eq!(config, ProblemDetailsConfig::default());
    }

    #[test]
    fn lenient_partial_section_keeps_other_defaults() {
        let config = config_or_default(&json!({
            "problem_details": {"debug": true, "type_base": "https://errors.acme.test"}
        }))
        .unwrap();
        assert!(config.debug);
        assert!(config.legacy_mode);
        assert_eq!(config.type_base, "https://errors.acme.test");
    }

    #[test]
    fn strict_requires_section() {
        let err = config_required(&json!({})).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection { .. }));
    }

    #[test]
    fn section_must_be_object() {
        let err = config_or_default(&json!({"problem_details": true})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStructure { .. }));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = config_required(&json!({"problem_details": {"legacy": false}})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { .. }));
        assert!(err.to_string().contains("problem_details"));
    }

    #[test]
    fn relative_type_base_is_rejected() {
        let err = config_required(&json!({"problem_details": {"type_base": "/problems"}})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTypeBase { .. }));
    }

    #[test]
    fn figment_section() {
        let figment = Figment::new().merge(Serialized::defaults(json!({
            "problem_details": {
                "legacy_mode": false,
                "override_http_exceptions": true
            }
        })));
        let config = from_figment(&figment).unwrap();
        assert!(!config.legacy_mode);
        assert!(config.override_http_exceptions);
        assert_eq!(config.type_base, DEFAULT_TYPE_BASE);
    }

    #[test]
    fn figment_without_section_uses_defaults() {
        let figment = Figment::new().merge(Serialized::defaults(json!({"other": 1})));
        assert_eq!(from_figment(&figment).unwrap(), ProblemDetailsConfig::default());
    }

    #[test]
    fn figment_yaml_with_bad_type() {
        let figment = Figment::new().merge(Yaml::string("problem_details:\n  debug: [1, 2]\n"));
        let err = from_figment(&figment).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn env_overrides() {
        temp_env::with_vars(
            [
                ("PROBLEMKIT__PROBLEM_DETAILS__DEBUG", Some("true")),
                ("PROBLEMKIT__PROBLEM_DETAILS__TYPE_BASE", Some("https://errors.acme.test")),
            ],
            || {
                let config = load(None).unwrap();
                assert!(config.debug);
                assert_eq!(config.type_base, "https://errors.acme.test");
            },
        );
    }
}
