use std::{sync::Arc, time::Duration};

use flicks_dal::Pool;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool) -> Self {
        AppState {
            state: Arc::new(AppStateInner { pool, app_config }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Operating environment name (development, staging, production)
    pub env: String,
    pub version: String,
    pub query_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "development".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            query_timeout: flicks_dal::movie::DEFAULT_DEADLINE,
        }
    }
}
