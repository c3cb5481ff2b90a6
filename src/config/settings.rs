//! Hierarchical string settings.
//!
//! Keys are `:`-separated paths (`Handlers:order-created:Destination`) and
//! compare case-insensitively. Environment variables use `__` in place of
//! `:`. Layers are merged with [`Settings::merge`]; later layers win.

use crate::error::{DispatchError, Result};
use figment::providers::{Env, Format, Json};
use figment::value::Dict;
use figment::Figment;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Separator between key path segments.
pub const KEY_DELIMITER: &str = ":";

/// A flat view over hierarchical configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Normalized key -> (key as first written, value).
    values: BTreeMap<String, (String, String)>,
}

impl Settings {
    /// Create empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build settings from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut settings = Self::new();
        for (key, value) in pairs {
            settings.set(key, value);
        }
        settings
    }

    /// Flatten every layer of a figment into `:` paths.
    ///
    /// Arrays use their index as a segment; `null` becomes an empty string.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let dict: Dict = figment.extract().map_err(config_error)?;
        let value = serde_json::to_value(&dict)
            .map_err(|e| DispatchError::config("<settings>", e.to_string()))?;

        let mut settings = Self::new();
        flatten(&value, String::new(), &mut settings);
        Ok(settings)
    }

    /// Read settings from process environment variables.
    ///
    /// With a `prefix`, only variables starting with it (ignoring case) are
    /// read and the prefix is stripped (`FEZZ_Messaging__Group` ->
    /// `Messaging:Group`).
    pub fn from_env(prefix: Option<&str>) -> Result<Self> {
        let env = match prefix {
            Some(prefix) => Env::prefixed(prefix),
            None => Env::raw(),
        };
        Self::from_figment(&Figment::from(env.split("__")))
    }

    /// Parse a JSON document. The top level must be an object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_figment(&Figment::from(Json::string(json)))
    }

    /// Read a JSON settings file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DispatchError::config(
                path.display().to_string(),
                "settings file not found",
            ));
        }
        Self::from_figment(&Figment::from(Json::file(path)))
    }

    /// Load the optional JSON `file`, then overlay `env_prefix` variables.
    ///
    /// Figment keys are case-sensitive, so each layer is flattened on its
    /// own and the layers are merged case-insensitively.
    pub fn load(file: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let base = match file {
            Some(path) => Self::from_json_file(path)?,
            None => Self::new(),
        };
        Ok(base.merge(Self::from_env(Some(env_prefix))?))
    }

    /// Set a value, replacing any existing one under the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let written = key.trim().replace("__", KEY_DELIMITER);
        self.values.insert(normalize(&key), (written, value.into()));
    }

    /// Builder form of [`Settings::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Overlay `other` on top of `self`.
    pub fn merge(mut self, other: Settings) -> Self {
        self.values.extend(other.values);
        self
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&normalize(key))
            .map(|(_, value)| value.as_str())
    }

    /// Look up a value, treating blank strings as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|value| !value.is_empty())
    }

    /// Look up a boolean (`true`/`false`, `1`/`0`, `yes`/`no`).
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let Some(raw) = self.get_non_empty(key) else {
            return Ok(None);
        };
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(DispatchError::config(key, format!("'{raw}' is not a boolean"))),
        }
    }

    /// Direct children of `section`, as (child key, value) pairs.
    ///
    /// Child keys keep the spelling they were first written with.
    pub fn children(&self, section: &str) -> Vec<(&str, &str)> {
        let prefix = format!("{}{}", normalize(section), KEY_DELIMITER);
        self.values
            .iter()
            .filter(|(normalized, _)| normalized.starts_with(&prefix))
            .filter_map(|(_, (original, value))| {
                let child = original.get(prefix.len()..)?;
                (!child.contains(KEY_DELIMITER)).then_some((child, value.as_str()))
            })
            .collect()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn normalize(key: &str) -> String {
    key.trim().replace("__", KEY_DELIMITER).to_ascii_lowercase()
}

fn config_error(err: figment::Error) -> DispatchError {
    let key = if err.path.is_empty() {
        "<settings>".to_string()
    } else {
        err.path.join(KEY_DELIMITER)
    };
    DispatchError::config(key, err.to_string())
}

fn flatten(value: &Value, path: String, settings: &mut Settings) {
    let join = |segment: &str| {
        if path.is_empty() {
            segment.to_string()
        } else {
            format!("{path}{KEY_DELIMITER}{segment}")
        }
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(child, join(key), settings);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(child, join(&index.to_string()), settings);
            }
        }
        Value::Null => settings.set(path, ""),
        Value::String(text) => settings.set(path, text.as_str()),
        other => settings.set(path, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_keys_are_case_insensitive() {
        let settings = Settings::new().with("Messaging:Destination", "orders");
        assert_eq!(settings.get("messaging:destination"), Some("orders"));
        assert_eq!(settings.get("MESSAGING__DESTINATION"), Some("orders"));
    }

    #[test]
    fn test_json_is_flattened() {
        let settings = Settings::from_json_str(
            r#"{
                "ConnectionStrings": {"default": "Endpoint=sb://bus/;SharedAccessKey=k"},
                "Handlers": {"order-created": {"Destination": "orders"}},
                "Retries": [1, 2],
                "Host": {"ValidateOnStartup": false, "Note": null}
            }"#,
        )
        .unwrap();

        assert_eq!(settings.get("Handlers:order-created:Destination"), Some("orders"));
        assert_eq!(settings.get("Retries:1"), Some("2"));
        assert_eq!(settings.get_bool("Host:ValidateOnStartup").unwrap(), Some(false));
        assert_eq!(settings.get("Host:Note"), Some(""));
        assert_eq!(settings.get_non_empty("Host:Note"), None);
    }

    #[test]
    fn test_json_must_be_an_object() {
        let err = Settings::from_json_str("[1]").unwrap_err();
        assert!(matches!(err, DispatchError::ConfigurationInvalid { .. }));
    }

    #[test]
    fn test_env_vars_with_prefix() {
        Jail::expect_with(|jail| {
            jail.set_env("FEZZ_Messaging__Group", "processing");
            jail.set_env("OTHER_Messaging__Group", "ignored");

            let settings = Settings::from_env(Some("fezz_")).unwrap();
            assert_eq!(settings.get("Messaging:Group"), Some("processing"));
            assert_eq!(settings.get("OTHER:Messaging:Group"), None);
            Ok(())
        });
    }

    #[test]
    fn test_load_overlays_env_on_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "fezz.settings.json",
                r#"{"Messaging": {"Group": "from-file", "Destination": "orders"}}"#,
            )?;
            jail.set_env("FEZZ_MESSAGING__GROUP", "from-env");

            let settings = Settings::load(Some(Path::new("fezz.settings.json")), "FEZZ_").unwrap();
            assert_eq!(settings.get("Messaging:Group"), Some("from-env"));
            assert_eq!(settings.get("Messaging:Destination"), Some("orders"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_settings_file_is_rejected() {
        let err = Settings::from_json_file("/nonexistent/fezz.settings.json").unwrap_err();
        assert!(matches!(err, DispatchError::ConfigurationInvalid { .. }));
    }

    #[test]
    fn test_merge_prefers_later_layer() {
        let base = Settings::new().with("Messaging:Group", "a").with("Messaging:Destination", "d");
        let merged = base.merge(Settings::new().with("messaging:group", "b"));
        assert_eq!(merged.get("Messaging:Group"), Some("b"));
        assert_eq!(merged.get("Messaging:Destination"), Some("d"));
    }

    #[test]
    fn test_children_lists_direct_keys_only() {
        let settings = Settings::new()
            .with("ConnectionStrings:default", "a=b")
            .with("ConnectionStrings:audit", "c=d")
            .with("ConnectionStrings:nested:deep", "x");
        let mut children = settings.children("connectionstrings");
        children.sort();
        assert_eq!(children, vec![("audit", "c=d"), ("default", "a=b")]);
    }

    #[test]
    fn test_invalid_bool() {
        let settings = Settings::new().with("Host:ValidateOnStartup", "maybe");
        assert!(settings.get_bool("Host:ValidateOnStartup").is_err());
    }
}
