// Copyright 2025 the Sable authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine boot configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings the composition root needs before any subsystem exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// UDP port for the game sockets; `0` disables networking entirely.
    pub port: u16,
    /// Headless mode: no display-driven frame stepping expected.
    pub headless: bool,
    /// Default log filter, overridable by `RUST_LOG`.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            port: 43210,
            headless: false,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads a JSON config file; missing fields fall back to defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "headless": true }"#).unwrap();
        assert!(config.headless);
        assert_eq!(config.port, EngineConfig::default().port);
    }

    #[test]
    fn full_roundtrip() {
        let config = EngineConfig {
            port: 9999,
            headless: true,
            log_filter: "debug".to_string(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.port, 9999);
        assert!(back.headless);
    }
}
