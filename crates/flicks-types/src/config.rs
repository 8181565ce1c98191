use clap::Parser;
use std::{fs, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Parser)]
pub struct BackendConfig {
    #[arg(
        long,
        env = "FLICKS_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/flicks.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "FLICKS_DATA_DIR",
        help = "Data directory (database etc.), default is system default like ~/.local/share/flicks",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "FLICKS_DB_MAX_CONNECTIONS",
        default_value_t = 25,
        help = "Maximum number of open database connections"
    )]
    pub db_max_connections: u32,

    #[arg(
        long,
        env = "FLICKS_DB_MIN_CONNECTIONS",
        default_value_t = 0,
        help = "Minimum number of database connections kept open"
    )]
    pub db_min_connections: u32,

    #[arg(
        long,
        env = "FLICKS_DB_IDLE_TIMEOUT",
        default_value = "15m",
        help = "How long an idle connection is kept in the pool (e.g. 15m, 1h)",
        value_parser = humantime::parse_duration
    )]
    pub db_idle_timeout: Duration,

    #[arg(
        long,
        env = "FLICKS_DB_QUERY_TIMEOUT",
        default_value = "3s",
        help = "Deadline for a single database operation",
        value_parser = humantime::parse_duration
    )]
    pub db_query_timeout: Duration,
}

fn default_data_dir() -> String {
    let dir = dirs::data_dir()
        .map(|p| p.join("flicks"))
        .unwrap_or_else(|| PathBuf::from("flicks"));

    if !fs::exists(&dir).expect("Failed to check if data directory exists") {
        fs::create_dir_all(&dir).expect("Failed to create data directory");
    } else if !dir.is_dir() {
        panic!("Data directory is not a directory",)
    }

    dir.to_string_lossy().to_string()
}

impl BackendConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/flicks.db", self.data_dir))
    }
}
