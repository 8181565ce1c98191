pub mod rest;

use std::{fmt::Display, path::Path, time::Duration};

use anyhow::{anyhow, Result};
use flicks_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, error};

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(4030..5030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let args = &[
        "flicks-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--env",
        "development",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    test_config(test_name, &std::env::temp_dir())
}

pub fn base_url(config: &ServerConfig) -> Result<Url> {
    let url = format!("http://127.0.0.1:{}/", config.port).parse()?;
    Ok(url)
}

pub fn extend_url(url: &Url, segment: impl Display) -> Result<Url> {
    let mut url = url.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow!("Base URL cannot have path segments"))?
        .pop_if_empty()
        .push(&segment.to_string());
    Ok(url)
}

/// Stops the server when dropped.
pub struct ServerGuard {
    shutdown: Option<oneshot::Sender<()>>,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn launch_env(args: ServerConfig) -> Result<(reqwest::Client, Url, ServerGuard)> {
    let base_url = base_url(&args)?;
    let state = flicks_server::run::build_state(&args).await?;
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let shutdown = async move {
            let _ = rx.await;
        };
        if let Err(e) = flicks_server::run::run_graceful_with_state(args, state, shutdown).await {
            error!("Server failed: {e}");
        }
    });
    let guard = ServerGuard {
        shutdown: Some(tx),
        handle,
    };

    let client = reqwest::Client::new();
    let health_url = base_url.join("v1/healthcheck")?;
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Server ready at {base_url}");
                return Ok((client, base_url, guard));
            }
            _ => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
    Err(anyhow!("Server did not start"))
}
