//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::game::{GameRules, JumpTrigger, RespawnHealth};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Allowed client origins for CORS; `None` allows any
    pub client_origin: Option<String>,

    /// Seed for the simulation RNG; random when unset
    pub sim_seed: Option<u64>,
    /// Rule choices for the stage
    pub rules: GameRules,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT wins over SERVER_ADDR, matching common PaaS conventions
        let server_addr = match var("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let sim_seed = match var("SIM_SEED") {
            Some(s) => Some(
                s.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::Invalid("SIM_SEED", s.clone()))?,
            ),
            None => None,
        };

        let respawn_health = match var("RESPAWN_HEALTH") {
            Some(s) => s
                .parse::<RespawnHealth>()
                .map_err(|_| ConfigError::Invalid("RESPAWN_HEALTH", s.clone()))?,
            None => RespawnHealth::default(),
        };

        let jump_trigger = match var("JUMP_TRIGGER") {
            Some(s) => s
                .parse::<JumpTrigger>()
                .map_err(|_| ConfigError::Invalid("JUMP_TRIGGER", s.clone()))?,
            None => JumpTrigger::default(),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            client_origin: var("CLIENT_ORIGIN").filter(|s| !s.trim().is_empty()),

            sim_seed,
            rules: GameRules {
                respawn_health,
                jump_trigger,
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("Invalid server address format")]
    InvalidAddress,
}
