// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Per-step configuration lookup

use serde_json::Value;
use std::collections::HashMap;

use crate::pipeline::StepKey;

/// Supplies the configuration blob for a (project, flow, step)
pub trait ConfigLookup: Send + Sync {
    /// `Value::Null` when nothing is configured
    fn lookup(&self, key: &StepKey) -> Value;
}

/// No configuration for any step
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConfig;

impl ConfigLookup for NoConfig {
    fn lookup(&self, _key: &StepKey) -> Value {
        Value::Null
    }
}

/// Fixed in-memory configuration
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    entries: HashMap<StepKey, Value>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: StepKey, config: Value) -> Self {
        self.entries.insert(key, config);
        self
    }

    pub fn insert(&mut self, key: StepKey, config: Value) {
        self.entries.insert(key, config);
    }
}

impl ConfigLookup for StaticConfig {
    fn lookup(&self, key: &StepKey) -> Value {
        self.entries.get(key).cloned().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_static_config_lookup() {
        let key = StepKey::new("app", "ci", "deploy");
        let config = StaticConfig::new().with(key.clone(), json!({"target": "staging"}));

        assert_eq!(config.lookup(&key)["target"], json!("staging"));
        assert_eq!(config.lookup(&key.sibling("build")), Value::Null);
        assert_eq!(NoConfig.lookup(&key), Value::Null);
    }
}
