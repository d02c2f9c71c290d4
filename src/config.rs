/*
 * config.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Wsframe, a server-side WebSocket engine.
 *
 * Wsframe is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wsframe is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wsframe.  If not, see <http://www.gnu.org/licenses/>.
 */

use std::fs;
use std::path::Path;

use crate::debug_log;

/// Default cap on a single frame or reassembled message (64 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 64 * 1024 * 1024;

// The main configuration structure
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_address: String,
    pub max_payload_size: u64,
    pub require_mask: bool,
}

impl Config {
    pub fn new() -> Config {
        Config {
            bind_address: String::from("0.0.0.0:8080"),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            require_mask: false,
        }
    }

    /// Override fields from `WSFRAME_BIND`, `WSFRAME_MAX_PAYLOAD` and
    /// `WSFRAME_REQUIRE_MASK` when they are set.
    pub fn apply_env(&mut self) -> Result<(), String> {
        if let Ok(bind) = std::env::var("WSFRAME_BIND") {
            self.bind_address = bind;
        }
        if let Ok(max) = std::env::var("WSFRAME_MAX_PAYLOAD") {
            self.max_payload_size = max
                .parse()
                .map_err(|e| format!("Invalid WSFRAME_MAX_PAYLOAD {:?}: {}", max, e))?;
        }
        if let Ok(v) = std::env::var("WSFRAME_REQUIRE_MASK") {
            self.require_mask = v == "1" || v.eq_ignore_ascii_case("true");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

// ============================================================
// JSON
// ============================================================

/// Parse a JSON object into a Config. Keys that are absent keep their defaults.
pub fn json_to_config(json_str: &str) -> Result<Config, String> {
    let value = json::parse(json_str).map_err(|e| format!("Invalid JSON: {}", e))?;
    if !value.is_object() {
        return Err(String::from("Invalid JSON: config must be an object"));
    }
    let mut config = Config::new();

    let bind = &value["bind_address"];
    if !bind.is_null() {
        config.bind_address = bind
            .as_str()
            .ok_or("bind_address must be a string")?
            .to_string();
    }
    let max = &value["max_payload_size"];
    if !max.is_null() {
        config.max_payload_size = max
            .as_u64()
            .ok_or("max_payload_size must be a non-negative integer")?;
    }
    let require_mask = &value["require_mask"];
    if !require_mask.is_null() {
        config.require_mask = require_mask
            .as_bool()
            .ok_or("require_mask must be a boolean")?;
    }
    Ok(config)
}

pub fn config_to_json(config: &Config) -> String {
    let mut value = json::JsonValue::new_object();
    value["bind_address"] = config.bind_address.as_str().into();
    value["max_payload_size"] = config.max_payload_size.into();
    value["require_mask"] = config.require_mask.into();
    value.pretty(2)
}

// ============================================================
// File System
// ============================================================

pub fn load_config(config_file: &str) -> Result<Config, String> {
    let path = Path::new(config_file);
    if !path.exists() {
        debug_log!("No config file at {}, using defaults", config_file);
        return Ok(Config::new());
    }
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return Err(format!("Could not read config file: {}", e)),
    };
    json_to_config(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.max_payload_size, 64 * 1024 * 1024);
        assert!(!config.require_mask);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = json_to_config(r#"{"max_payload_size": 1024}"#).unwrap();
        assert_eq!(config.max_payload_size, 1024);
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert!(!config.require_mask);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = Config {
            bind_address: String::from("127.0.0.1:9001"),
            max_payload_size: 4096,
            require_mask: true,
        };
        let back = json_to_config(&config_to_json(&config)).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_rejects_wrong_types() {
        assert!(json_to_config(r#"{"require_mask": "yes"}"#).is_err());
        assert!(json_to_config(r#"{"bind_address": 80}"#).is_err());
        assert!(json_to_config("[1, 2]").is_err());
        assert!(json_to_config("{").is_err());
    }

    // Only test that touches the WSFRAME_* variables.
    #[test]
    fn test_env_overrides() {
        const VARS: [&str; 3] = ["WSFRAME_BIND", "WSFRAME_MAX_PAYLOAD", "WSFRAME_REQUIRE_MASK"];
        for var in VARS {
            std::env::remove_var(var);
        }

        let mut config = Config::new();
        config.apply_env().unwrap();
        assert_eq!(config, Config::new());

        std::env::set_var("WSFRAME_BIND", "127.0.0.1:9001");
        std::env::set_var("WSFRAME_MAX_PAYLOAD", "4096");
        std::env::set_var("WSFRAME_REQUIRE_MASK", "TRUE");
        config.apply_env().unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:9001");
        assert_eq!(config.max_payload_size, 4096);
        assert!(config.require_mask);

        std::env::set_var("WSFRAME_REQUIRE_MASK", "no");
        config.apply_env().unwrap();
        assert!(!config.require_mask);

        std::env::set_var("WSFRAME_MAX_PAYLOAD", "64MB");
        let err = config.apply_env().unwrap_err();
        assert!(err.contains("WSFRAME_MAX_PAYLOAD"), "{}", err);
        assert_eq!(config.max_payload_size, 4096);

        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config("/nonexistent/wsframe/config.json").unwrap();
        assert_eq!(config, Config::new());
    }
}
