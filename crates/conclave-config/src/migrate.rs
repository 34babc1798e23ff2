//! Deterministic schema-version migration.
//!
//! Config files are free-form YAML on disk; a `version` field says which
//! shape they were written against. `migrate` rewrites an old-shape
//! [`serde_yaml::Value`] into the current shape before it is handed to
//! `serde` for the real `Config` deserialization, so that old files keep
//! loading across releases instead of failing to parse.

use serde_yaml::Value;

use crate::schema::CURRENT_SCHEMA_VERSION;

/// Migrate `raw` in place to [`CURRENT_SCHEMA_VERSION`], applying each
/// version step in order. Unknown/missing `version` is treated as "1", the
/// oldest known shape.
pub fn migrate(mut raw: Value) -> Value {
    let mut version = read_version(&raw);
    loop {
        match version.as_str() {
            "1" => {
                migrate_v1_to_v2(&mut raw);
                version = "2".to_string();
            }
            v if v == CURRENT_SCHEMA_VERSION => break,
            _ => break,
        }
    }
    set_version(&mut raw, CURRENT_SCHEMA_VERSION);
    raw
}

fn read_version(raw: &Value) -> String {
    raw.as_mapping()
        .and_then(|m| m.get("version"))
        .and_then(|v| v.as_str())
        .unwrap_or("1")
        .to_string()
}

fn set_version(raw: &mut Value, version: &str) {
    if let Value::Mapping(m) = raw {
        m.insert(
            Value::String("version".into()),
            Value::String(version.into()),
        );
    }
}

/// v1 -> v2: the named alternate-provider map was called `providers`; v2
/// renames it to `models` to match the declarative AgentSpec/ModelSpec
/// vocabulary (§6). Also: `cache_tool_results`/docker/lints/gdb/tui knobs
/// that existed only for the single-agent CLI are dropped silently, since
/// v2 config files that still carry them are handled by serde's default
/// `#[serde(default)]` fallback rather than an error.
fn migrate_v1_to_v2(raw: &mut Value) {
    if let Value::Mapping(m) = raw {
        if let Some(providers) = m.remove(Value::String("providers".into())) {
            m.insert(Value::String("models".into()), providers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_v1_providers_renamed_to_models() {
        let raw: Value = serde_yaml::from_str(
            "version: \"1\"\nproviders:\n  local:\n    provider: openai\n    name: llama3.2\n",
        )
        .unwrap();
        let migrated = migrate(raw);
        let m = migrated.as_mapping().unwrap();
        assert!(m.get("models").is_some());
        assert!(m.get("providers").is_none());
        assert_eq!(
            m.get("version").unwrap().as_str().unwrap(),
            CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn migrate_missing_version_assumed_v1() {
        let raw: Value = serde_yaml::from_str("model:\n  provider: openai\n").unwrap();
        let migrated = migrate(raw);
        assert_eq!(
            migrated.as_mapping().unwrap().get("version").unwrap().as_str().unwrap(),
            CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn migrate_current_version_is_noop_passthrough() {
        let raw: Value = serde_yaml::from_str(&format!(
            "version: \"{}\"\nmodels:\n  x:\n    provider: openai\n    name: gpt-4o\n",
            CURRENT_SCHEMA_VERSION
        ))
        .unwrap();
        let migrated = migrate(raw.clone());
        assert_eq!(migrated, raw);
    }
}
