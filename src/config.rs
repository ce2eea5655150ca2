//! Server configuration
//!
//! Layered with figment: built-in defaults, then `grantmap.toml`, then
//! `GRANTMAP_`-prefixed environment variables (`GRANTMAP_DB_PATH`,
//! `GRANTMAP_BIND`, ...).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogFeeds;
use crate::db::DEFAULT_MAP_SIZE;

pub const CONFIG_FILE: &str = "grantmap.toml";
pub const ENV_PREFIX: &str = "GRANTMAP_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub db_path: String,
    pub bind: String,
    pub map_size: usize,
    /// Seed built-in system roles on startup
    pub bootstrap: bool,
    #[serde(default)]
    pub catalog: CatalogFeeds,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: "./data/grantmap.mdb".into(),
            bind: "0.0.0.0:3000".into(),
            map_size: DEFAULT_MAP_SIZE,
            bootstrap: true,
            catalog: CatalogFeeds::default(),
        }
    }
}

impl ServerConfig {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(ServerConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self, figment::Error> {
        let config: ServerConfig = Self::figment().extract()?;
        if config.db_path.trim().is_empty() {
            return Err(figment::Error::from("db_path must be set".to_string()));
        }
        Ok(config)
    }
}
