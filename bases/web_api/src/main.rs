// bases/web_api/src/main.rs
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use download_service::{DownloadService, RecordStore};
use media_downloader::YtDlp;

mod config;
mod error;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "web_api=info,download_service=info,media_downloader=info,tower_http=info".into()
            }),
        )
        .init();

    let args = config::CliArgs::parse();
    let config = config::Config::from_args(args);

    let records = RecordStore::open(&config.data_dir)?;
    let extractor = Arc::new(YtDlp::new(config.extractor.clone()));
    let service = Arc::new(DownloadService::new(
        extractor,
        records,
        config.download_dir.clone(),
    ));

    if let Err(e) = service.check_extractor().await {
        tracing::warn!("{}; format listing will fail until it is installed", e);
    }

    server::run(config, service).await?;

    Ok(())
}
