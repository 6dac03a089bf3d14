//! Connector configuration and validation.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(&'static str),
    #[error("invalid project id '{0}': identifiers must not contain a decimal")]
    InvalidProjectId(String),
    #[error("could not parse projects value: {0}")]
    InvalidProjects(String),
    #[error("configured projects not accessible to this user: {0}")]
    InaccessibleProjects(String),
}

/// A configured project filter, normalized from the accepted input shapes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectKey {
    pub key: String,
}

#[derive(Debug, Clone, Default)]
pub struct JiraConfiguration {
    pub host: String,
    pub username: String,
    pub password: String,
    pub projects: Vec<ProjectKey>,
    pub custom_fields: Vec<String>,
    /// Bypasses the per-project issue page cap when set.
    pub bulk_ingest_issues: bool,
}

impl JiraConfiguration {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = required_env("JIRA_HOST")?;
        let username = required_env("JIRA_USERNAME")?;
        let password = required_env("JIRA_PASSWORD")?;
        let projects = match std::env::var("JIRA_PROJECTS") {
            Ok(raw) => parse_projects(&raw)?,
            Err(_) => Vec::new(),
        };
        let custom_fields = std::env::var("JIRA_CUSTOM_FIELDS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let bulk_ingest_issues = std::env::var("JIRA_BULK_INGEST_ISSUES")
            .map(|raw| raw.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let config = JiraConfiguration {
            host,
            username,
            password,
            projects,
            custom_fields,
            bulk_ingest_issues,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing("host"));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::Missing("username"));
        }
        if self.password.trim().is_empty() {
            return Err(ConfigError::Missing("password"));
        }
        for project in &self.projects {
            if project.key.contains('.') {
                return Err(ConfigError::InvalidProjectId(project.key.clone()));
            }
        }
        Ok(())
    }
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Projects arrive as a bare key, a comma-separated list, or a JSON array of
/// strings or `{key}` objects. Blank entries are discarded.
pub fn parse_projects(raw: &str) -> Result<Vec<ProjectKey>, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let parsed: Vec<Value> = serde_json::from_str(trimmed)
            .map_err(|err| ConfigError::InvalidProjects(err.to_string()))?;
        let mut keys = Vec::new();
        for entry in parsed {
            match entry {
                Value::String(key) => push_key(&mut keys, &key),
                Value::Object(map) => {
                    if let Some(Value::String(key)) = map.get("key") {
                        push_key(&mut keys, key);
                    }
                }
                other => {
                    return Err(ConfigError::InvalidProjects(format!(
                        "unexpected entry: {other}"
                    )))
                }
            }
        }
        return Ok(keys);
    }

    let mut keys = Vec::new();
    for part in trimmed.split(',') {
        push_key(&mut keys, part);
    }
    Ok(keys)
}

fn push_key(keys: &mut Vec<ProjectKey>, raw: &str) {
    let key = raw.trim();
    if !key.is_empty() {
        keys.push(ProjectKey {
            key: key.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_key_and_comma_lists_normalize() {
        assert_eq!(
            parse_projects("PROJ").unwrap(),
            vec![ProjectKey {
                key: "PROJ".to_string()
            }]
        );
        let keys = parse_projects("A, B, ,C").unwrap();
        assert_eq!(
            keys.iter().map(|p| p.key.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );
    }

    #[test]
    fn json_arrays_of_strings_and_objects_normalize() {
        let keys = parse_projects(r#"["A", {"key": "B"}, ""]"#).unwrap();
        assert_eq!(
            keys.iter().map(|p| p.key.as_str()).collect::<Vec<_>>(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn malformed_json_array_is_an_error() {
        assert!(parse_projects("[not json").is_err());
    }

    #[test]
    fn decimal_project_ids_fail_validation() {
        let config = JiraConfiguration {
            host: "example.atlassian.net".to_string(),
            username: "user".to_string(),
            password: "token".to_string(),
            projects: vec![ProjectKey {
                key: "10.5".to_string(),
            }],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProjectId(key) if key == "10.5"));
    }

    #[test]
    fn blank_host_is_missing() {
        let config = JiraConfiguration {
            host: "  ".to_string(),
            username: "user".to_string(),
            password: "token".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("host"))
        ));
    }
}
