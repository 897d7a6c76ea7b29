//! Global configuration store
//!
//! The config file is evaluated as a Lua chunk (mirroring
//! `original_source/src/env.cpp`'s `luaL_dofile` + global-table snapshot);
//! everything downstream of `initialize` sees only a flat string key/value
//! surface, never the Lua state itself.

use std::collections::HashMap;
use std::sync::Mutex;

use mlua::{Lua, Value};
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Thread-safe key/value store populated once from the config script.
///
/// All four runtime operations (`get`, `get_int`, `get_bool`, `set`) are
/// safe to call from any thread; a single mutex serialises access, giving
/// "externally linearisable" semantics rather than true read concurrency.
#[derive(Debug, Default)]
pub struct ConfigStore {
    entries: Mutex<HashMap<String, String>>,
}

impl ConfigStore {
    /// Evaluates the config script at `path` and snapshots its global
    /// namespace into the store.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::LuaEval`] if evaluation fails.
    pub fn initialize(path: &str) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        let lua = Lua::new();
        lua.load(&source)
            .exec()
            .map_err(|e| ConfigError::LuaEval(e.to_string()))?;

        let mut entries = HashMap::new();
        let globals = lua.globals();
        for pair in globals.pairs::<String, Value>() {
            let (key, value) = pair.map_err(|e| ConfigError::LuaEval(e.to_string()))?;
            let text = match value {
                Value::String(s) => s.to_str().map(ToOwned::to_owned).ok(),
                Value::Integer(i) => Some(i.to_string()),
                Value::Number(n) => Some(n.to_string()),
                Value::Boolean(b) => Some(b.to_string()),
                _ => None,
            };
            if let Some(text) = text {
                entries.insert(key, text);
            }
        }

        debug!(keys = entries.len(), path, "config script evaluated");
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    /// Returns the value for `key`, or an empty string if absent.
    #[must_use]
    pub fn get(&self, key: &str) -> String {
        self.entries
            .lock()
            .expect("config mutex poisoned")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the value for `key` parsed as `i64`, or `0` if absent or
    /// non-numeric.
    #[must_use]
    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key).parse().unwrap_or(0)
    }

    /// Returns the value for `key` interpreted as a boolean (`"true"`), or
    /// `false` if absent.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key) == "true"
    }

    /// Binds `key` to `value` unless `key` is already bound.
    ///
    /// Returns `false` when the key already exists (first writer wins).
    pub fn set(&self, key: &str, value: &str) -> bool {
        let mut entries = self.entries.lock().expect("config mutex poisoned");
        if entries.contains_key(key) {
            return false;
        }
        entries.insert(key.to_string(), value.to_string());
        true
    }

    /// Idempotent teardown; currently a no-op since the store holds no
    /// external resources once evaluation has completed.
    pub fn release(&self) {}

    /// Fails fast with the name of the first missing required key.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingRequiredKey`] for the first key in
    /// `keys` that has no bound value.
    pub fn validate_required(&self, keys: &[&str]) -> Result<(), ConfigError> {
        let entries = self.entries.lock().expect("config mutex poisoned");
        for key in keys {
            if !entries.contains_key(*key) {
                warn!(key, "required config key missing");
                return Err(ConfigError::MissingRequiredKey {
                    key: (*key).to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_script(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn initialize_snapshots_globals() {
        let file = write_script("start_name = \"main\"\nmax_ipc_msg_size = 65536\nenable = true\n");
        let store = ConfigStore::initialize(file.path().to_str().unwrap()).unwrap();
        assert_eq!(store.get("start_name"), "main");
        assert_eq!(store.get_int("max_ipc_msg_size"), 65536);
        assert!(store.get_bool("enable"));
    }

    #[test]
    fn get_missing_key_is_empty() {
        let file = write_script("x = 1\n");
        let store = ConfigStore::initialize(file.path().to_str().unwrap()).unwrap();
        assert_eq!(store.get("missing"), "");
        assert_eq!(store.get_int("missing"), 0);
        assert!(!store.get_bool("missing"));
    }

    #[test]
    fn set_is_first_writer_wins() {
        let file = write_script("k = \"v1\"\n");
        let store = ConfigStore::initialize(file.path().to_str().unwrap()).unwrap();
        assert!(!store.set("k", "v2"));
        assert_eq!(store.get("k"), "v1");
        assert!(store.set("new_key", "v3"));
        assert_eq!(store.get("new_key"), "v3");
    }

    #[test]
    fn initialize_fails_on_missing_file() {
        assert!(ConfigStore::initialize("/nonexistent/path/config.lua").is_err());
    }

    #[test]
    fn validate_required_reports_missing_key() {
        let file = write_script("a = 1\n");
        let store = ConfigStore::initialize(file.path().to_str().unwrap()).unwrap();
        let err = store.validate_required(&["a", "b"]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequiredKey { key } if key == "b"));
    }

    #[test]
    fn release_is_idempotent() {
        let file = write_script("a = 1\n");
        let store = ConfigStore::initialize(file.path().to_str().unwrap()).unwrap();
        store.release();
        store.release();
    }
}
