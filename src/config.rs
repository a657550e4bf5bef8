// src/config.rs
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    #[serde(default = "Config::default_bind_addr")]
    pub bind_addr: String,
    /// Polling period of the scheduled-publication sweep, in seconds.
    #[serde(default = "Config::default_publish_sweep_secs")]
    pub publish_sweep_secs: u64,
    /// Registers the dev-only mock top-up route. Never enable in production.
    #[serde(default)]
    pub enable_mock_topup: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn default_bind_addr() -> String {
        "127.0.0.1:8080".to_string()
    }

    fn default_publish_sweep_secs() -> u64 {
        60
    }
}
