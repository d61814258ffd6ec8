//! # Desired-State Model
//!
//! Types for the declarative specification of secrets engines, plus the
//! decode step that turns loosely-typed YAML configuration blocks into
//! string-keyed JSON maps ready for transmission.
//!
//! Specification files are authored in YAML; everything here derives
//! `Deserialize` so the parsing layer stays mechanical. Configuration
//! blocks keep their declared order (`serde_yaml::Mapping` preserves it),
//! which the reconciler relies on when applying items.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::MountConfig;

/// One desired secrets engine: a mount plus its per-item configuration.
///
/// `configuration` maps a config option (e.g. `roles`, `config`,
/// `root/generate`) to a sequence of item mappings. Items may carry the
/// lifecycle flags `create_only`, `rotate` and `save_to`; those are
/// stripped before anything is sent to the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsEngine {
    /// Mount path. Defaults to the engine type when empty.
    pub path: String,
    #[serde(rename = "type")]
    pub engine_type: String,
    pub description: String,
    /// Config option -> ordered sequence of configuration items.
    pub configuration: serde_yaml::Mapping,
    /// Mount-level settings (lease TTLs, visibility, ...), tuned in place
    /// when the mount already exists.
    pub config: serde_yaml::Mapping,
    /// Mount options, sent only at creation time.
    pub options: HashMap<String, String>,
    pub plugin_name: String,
    pub local: bool,
    pub seal_wrap: bool,
}

impl SecretsEngine {
    /// Decode the mount-level settings into a typed [`MountConfig`].
    ///
    /// Engine-level `options` overwrite any options nested under `config`,
    /// so both specification shapes produce the same mount request.
    pub fn mount_config(&self) -> Result<MountConfig, ConfigError> {
        let mut config: MountConfig =
            serde_yaml::from_value(serde_yaml::Value::Mapping(self.config.clone()))
                .map_err(ConfigError::MountSettings)?;

        config.options = if self.options.is_empty() {
            None
        } else {
            Some(self.options.clone())
        };

        Ok(config)
    }
}

/// Normalize engine paths in place: empty paths default to the engine
/// type, then leading/trailing separators are trimmed. Runs exactly once
/// per pass, before any remote call.
pub fn normalize_paths(engines: &mut [SecretsEngine]) {
    for engine in engines.iter_mut() {
        if engine.path.is_empty() {
            engine.path = engine.engine_type.clone();
        }
        engine.path = engine.path.trim_matches('/').to_string();
    }
}

/// Controls removal of mounts that exist on the server but are absent from
/// the desired state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeUnmanagedConfig {
    pub enabled: bool,
    pub exclude: PurgeExclude,
}

/// Per-category opt-outs from purging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeExclude {
    pub secrets: bool,
}

/// Decoded form of one configuration item: the payload to write plus the
/// lifecycle flags extracted from it.
///
/// The flag keys never reach the server; they are removed from `data`
/// during decoding.
#[derive(Debug, Clone, Default)]
pub struct ConfigItem {
    pub data: serde_json::Map<String, serde_json::Value>,
    pub create_only: bool,
    pub rotate: bool,
    pub save_to: Option<String>,
}

impl ConfigItem {
    /// Decode a raw YAML item into its wire payload and lifecycle flags.
    ///
    /// Nested mappings with non-string keys (YAML permits integer or bool
    /// keys) are recursively converted to string-keyed maps; the server's
    /// JSON API rejects anything else.
    pub fn from_yaml(raw: &serde_yaml::Value) -> Result<Self, ConfigError> {
        let serde_json::Value::Object(mut data) = yaml_to_json(raw) else {
            return Err(ConfigError::ItemNotAMapping);
        };

        let create_only = data.remove("create_only").is_some_and(|v| flag_value(&v));
        let rotate = data.remove("rotate").is_some_and(|v| flag_value(&v));
        let save_to = data
            .remove("save_to")
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.is_empty());

        Ok(Self {
            data,
            create_only,
            rotate,
            save_to,
        })
    }
}

/// Decode one configuration block (the value under a config option) into
/// its ordered item sequence.
pub fn decode_items(block: &serde_yaml::Value) -> Result<Vec<ConfigItem>, ConfigError> {
    let items = block.as_sequence().ok_or(ConfigError::BlockNotASequence)?;
    items.iter().map(ConfigItem::from_yaml).collect()
}

/// Interpret a loosely-typed flag value. Accepts booleans plus the string
/// and numeric spellings that show up in hand-written specifications.
fn flag_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        serde_json::Value::String(s) => matches!(s.as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

/// Convert a YAML value into a JSON value, stringifying mapping keys
/// recursively.
pub fn yaml_to_json(value: &serde_yaml::Value) -> serde_json::Value {
    match value {
        serde_yaml::Value::Null => serde_json::Value::Null,
        serde_yaml::Value::Bool(b) => serde_json::Value::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::from(i)
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::from(u)
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            } else {
                serde_json::Value::Null
            }
        }
        serde_yaml::Value::String(s) => serde_json::Value::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => {
            serde_json::Value::Array(seq.iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(map) => {
            let mut object = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                object.insert(yaml_key_to_string(key), yaml_to_json(val));
            }
            serde_json::Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

/// Render a YAML mapping key as a string.
pub fn yaml_key_to_string(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

/// Errors produced while decoding the desired-state specification.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error decoding mount settings for secrets engine")]
    MountSettings(#[source] serde_yaml::Error),
    #[error("configuration block is not a sequence of items")]
    BlockNotASequence,
    #[error("configuration item is not a mapping")]
    ItemNotAMapping,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(input: &str) -> serde_yaml::Value {
        serde_yaml::from_str(input).expect("test yaml")
    }

    #[test]
    fn test_empty_path_defaults_to_engine_type() {
        let mut engines = vec![SecretsEngine {
            engine_type: "aws".to_string(),
            ..SecretsEngine::default()
        }];

        normalize_paths(&mut engines);

        assert_eq!(engines[0].path, "aws");
    }

    #[test]
    fn test_paths_are_trimmed_of_separators() {
        let mut engines = vec![SecretsEngine {
            path: "/team/pki/".to_string(),
            engine_type: "pki".to_string(),
            ..SecretsEngine::default()
        }];

        normalize_paths(&mut engines);

        assert_eq!(engines[0].path, "team/pki");
    }

    #[test]
    fn test_lifecycle_flags_are_stripped_from_payload() {
        let raw = yaml(
            r"
            name: app
            create_only: true
            rotate: true
            save_to: secret/data/copy
            ttl: 1h
            ",
        );

        let item = ConfigItem::from_yaml(&raw).expect("item decodes");

        assert!(item.create_only);
        assert!(item.rotate);
        assert_eq!(item.save_to.as_deref(), Some("secret/data/copy"));
        assert!(!item.data.contains_key("create_only"));
        assert!(!item.data.contains_key("rotate"));
        assert!(!item.data.contains_key("save_to"));
        assert_eq!(item.data.get("ttl").and_then(|v| v.as_str()), Some("1h"));
    }

    #[test]
    fn test_flags_default_to_off() {
        let raw = yaml("{name: app}");

        let item = ConfigItem::from_yaml(&raw).expect("item decodes");

        assert!(!item.create_only);
        assert!(!item.rotate);
        assert!(item.save_to.is_none());
    }

    #[test]
    fn test_string_flag_spellings_are_accepted() {
        let raw = yaml("{name: app, create_only: 'true', rotate: '0'}");

        let item = ConfigItem::from_yaml(&raw).expect("item decodes");

        assert!(item.create_only);
        assert!(!item.rotate);
    }

    #[test]
    fn test_nested_non_string_keys_are_stringified() {
        let raw = yaml(
            r"
            name: app
            claims:
              1:
                2: deep
              true: flag
            ",
        );

        let item = ConfigItem::from_yaml(&raw).expect("item decodes");
        let claims = item.data.get("claims").and_then(|v| v.as_object()).unwrap();

        assert_eq!(
            claims.get("1").and_then(|v| v.as_object()).unwrap()["2"],
            serde_json::Value::String("deep".to_string())
        );
        assert_eq!(
            claims.get("true"),
            Some(&serde_json::Value::String("flag".to_string()))
        );
    }

    #[test]
    fn test_non_mapping_item_is_rejected() {
        let raw = yaml("[1, 2]");

        assert!(matches!(
            ConfigItem::from_yaml(&raw),
            Err(ConfigError::ItemNotAMapping)
        ));
    }

    #[test]
    fn test_decode_items_requires_a_sequence() {
        let block = yaml("{name: app}");

        assert!(matches!(
            decode_items(&block),
            Err(ConfigError::BlockNotASequence)
        ));
    }

    #[test]
    fn test_engine_options_overwrite_config_options() {
        let engine: SecretsEngine = serde_yaml::from_str(
            r"
            type: kv
            config:
              max_lease_ttl: 24h
              options:
                version: '1'
            options:
              version: '2'
            ",
        )
        .expect("engine yaml");

        let config = engine.mount_config().expect("mount config decodes");

        assert_eq!(config.max_lease_ttl.as_deref(), Some("24h"));
        assert_eq!(
            config.options.as_ref().and_then(|o| o.get("version")),
            Some(&"2".to_string())
        );
    }

    #[test]
    fn test_empty_engine_options_clear_config_options() {
        let engine: SecretsEngine = serde_yaml::from_str(
            r"
            type: kv
            config:
              options:
                version: '1'
            ",
        )
        .expect("engine yaml");

        let config = engine.mount_config().expect("mount config decodes");

        assert!(config.options.is_none());
    }
}
