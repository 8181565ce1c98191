use std::fmt;

use crate::error::Result;
pub use clap::Parser;
use flicks_app::state::AppConfig;
use flicks_dal::PoolConfig;
use flicks_types::config::BackendConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, clap::Parser)]
#[command(version, about = "Movie catalog JSON API")]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 4000,
        env = "FLICKS_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "FLICKS_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        short,
        long,
        value_enum,
        default_value_t = Environment::Development,
        env = "FLICKS_ENV",
        help = "Operating environment"
    )]
    pub env: Environment,

    #[arg(long, env = "FLICKS_CORS", help = "Enable permissive CORS")]
    pub cors: bool,

    #[command(flatten)]
    pub backend: BackendConfig,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn database_url(&self) -> String {
        self.backend.database_url()
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_connections: self.backend.db_max_connections,
            min_connections: self.backend.db_min_connections,
            idle_timeout: self.backend.db_idle_timeout,
        }
    }
}

impl From<&ServerConfig> for AppConfig {
    fn from(config: &ServerConfig) -> Self {
        AppConfig {
            env: config.env.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            query_timeout: config.backend.db_query_timeout,
        }
    }
}
