mod action;
mod app;
mod components;
mod download;
mod player;
mod save;
mod session;
mod theme;
mod widgets;
mod workflow;

#[cfg(test)]
mod testing;

use mailcast_proto::config::Config;
use mailcast_proto::MailApi;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = mailcast_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("mailcast.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("mailcast log: {}", log_path.display());
    info!("mailcast starting…");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("config {} unreadable, using defaults: {:#}", Config::config_path().display(), e);
            Config::default()
        }
    };
    let api = MailApi::from_config(&config.server)?;
    info!("backend: {}", api.base_url());

    app::App::new(&config, api).run().await
}
