//! Configuration loader for the search engine adapter.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Engine settings live under the `xunsearch` key; every setting has a
//! default so an empty or missing file yields a working local setup.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{Error, Result};

pub const ENGINE_KEY: &str = "xunsearch";
pub const DEFAULT_DOC_KEY_NAME: &str = "xun_search_object_id";

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Loads `config.toml` and the `config.<env>.toml` overlay from `dir`.
    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Extracts the engine settings, filling absent keys with defaults.
    pub fn engine(&self) -> Result<EngineConfig> {
        let config: EngineConfig = Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(self.figment.focus(ENGINE_KEY))
            .extract()
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{ENGINE_KEY}': {e}")))?;
        config.validated()
    }
}

/// Daemon endpoints and document conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Host used for both endpoints unless a specific one is set.
    pub server_host: Option<String>,
    pub server_index_host: Option<String>,
    pub server_index_port: u16,
    pub server_search_host: Option<String>,
    pub server_search_port: u16,
    pub default_charset: String,
    /// Name of the reserved field holding the host entity's primary key.
    pub doc_key_name: String,
    /// Index the soft-delete state of entities that support it.
    pub soft_delete: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_host: Some("127.0.0.1".to_string()),
            server_index_host: None,
            server_index_port: 8383,
            server_search_host: None,
            server_search_port: 8384,
            default_charset: "utf-8".to_string(),
            doc_key_name: DEFAULT_DOC_KEY_NAME.to_string(),
            soft_delete: false,
        }
    }
}

impl EngineConfig {
    /// Normalizes empty values and rejects settings the daemon cannot use.
    ///
    /// An empty `doc_key_name` means "use the default", empty host strings
    /// mean "unset".
    pub fn validated(mut self) -> Result<Self> {
        if self.doc_key_name.trim().is_empty() {
            self.doc_key_name = DEFAULT_DOC_KEY_NAME.to_string();
        }
        for host in [&mut self.server_host, &mut self.server_index_host, &mut self.server_search_host] {
            if host.as_deref().is_some_and(|h| h.trim().is_empty()) {
                *host = None;
            }
        }
        if self.server_index_port == 0 || self.server_search_port == 0 {
            return Err(Error::InvalidConfig("server ports must be non-zero".to_string()));
        }
        if self.default_charset.trim().is_empty() {
            return Err(Error::InvalidConfig("default_charset must not be empty".to_string()));
        }
        Ok(self)
    }
}
