//=====================================================
// File: config.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: RuleScript engine configuration
// Objective: Load evaluator settings, pre-seeded globals and a reference Owner
//            character from TOML
//=====================================================

//! Configuration handling for the RuleScript engine and runner.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::host::Character;
use crate::interpreter::Value;

/// Engine settings loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Seed for `roll()`; unset means a fresh entropy seed per evaluator.
    pub seed: Option<u64>,
    /// Optional guard on user-function recursion. Unset means unlimited.
    pub max_call_depth: Option<usize>,
    /// Primitive bindings defined in the global scope before a run.
    pub globals: BTreeMap<String, ConfigValue>,
    /// Builds an `Owner` character host object when present.
    pub owner: Option<OwnerConfig>,
}

/// A TOML value that maps onto a script value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<ConfigValue>),
}

impl ConfigValue {
    pub fn to_value(&self) -> Value {
        match self {
            ConfigValue::Boolean(b) => Value::Boolean(*b),
            ConfigValue::Number(n) => Value::Number(*n),
            ConfigValue::String(s) => Value::String(s.clone()),
            ConfigValue::Array(items) => Value::array(items.iter().map(Self::to_value).collect()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OwnerConfig {
    pub name: String,
    pub attributes: BTreeMap<String, f64>,
}

impl EngineConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("parsing engine configuration")
    }

    /// Load configuration from `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("parsing configuration {}", path.display()))
    }

    /// Persist the configuration back to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("writing configuration to {}", path.display()))?;
        Ok(())
    }

    pub fn global_bindings(&self) -> Vec<(String, Value)> {
        self.globals
            .iter()
            .map(|(name, value)| (name.clone(), value.to_value()))
            .collect()
    }

    pub fn owner_character(&self) -> Option<Character> {
        let owner = self.owner.as_ref()?;
        let character = owner
            .attributes
            .iter()
            .fold(Character::new(owner.name.clone()), |character, (name, value)| {
                character.with_attribute(name.clone(), *value)
            });
        Some(character)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_configuration() {
        let config = EngineConfig::from_toml_str(
            r#"
seed = 42
max_call_depth = 64

[globals]
level = 3
label = "Goblin"
hidden = false
bonuses = [1, 2, 3]

[owner]
name = "Aria"
attributes = { HP = 20, Strength = 14 }
"#,
        )
        .unwrap();

        assert_eq!(config.seed, Some(42));
        assert_eq!(config.max_call_depth, Some(64));
        let globals: BTreeMap<_, _> = config.global_bindings().into_iter().collect();
        assert_eq!(globals["level"], Value::Number(3.0));
        assert_eq!(globals["label"], Value::from("Goblin"));
        assert_eq!(globals["hidden"], Value::Boolean(false));
        assert_eq!(globals["bonuses"].to_string(), "[1, 2, 3]");

        let owner = config.owner_character().unwrap();
        assert_eq!(owner.name(), "Aria");
        assert_eq!(owner.attribute("Strength").map(|a| a.value()), Some(14.0));
        assert_eq!(owner.attribute("HP").map(|a| a.value()), Some(20.0));
    }

    #[test]
    fn empty_configuration_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.owner_character().is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("sed = 1").unwrap_err();
        assert!(format!("{err:#}").contains("unknown field"), "{err:#}");
    }
}

//=====================================================
// End of file
//=====================================================
