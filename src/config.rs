//! Ambient configuration: small env-var driven `Config` structs for the
//! server and bot binaries, generalizing the teacher's hardcoded
//! `127.0.0.1:3000` bind address into something overridable per
//! deployment.

use std::env;
use std::net::SocketAddr;

/// Server-side configuration, read from the environment with the
/// teacher's original bind address as the default.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> ServerConfig {
        let bind_addr = env::var("RUSTY_SHIP_BIND")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));
        ServerConfig { bind_addr }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig::from_env()
    }
}

/// Bot-side configuration: which judge to play against and how. CLI flags
/// (`src/bin/bot.rs`) take precedence over these environment defaults.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub base_url: String,
    pub token: String,
}

impl BotConfig {
    pub fn from_env() -> BotConfig {
        BotConfig {
            base_url: env::var("RUSTY_SHIP_JUDGE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string()),
            token: env::var("RUSTY_SHIP_TOKEN").unwrap_or_default(),
        }
    }
}
