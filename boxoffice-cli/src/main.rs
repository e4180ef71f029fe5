use anyhow::Context;
use boxoffice_cli::handle_line;
use boxoffice_core::app_config::Config;
use boxoffice_order::ReservationService;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxoffice=info,boxoffice_cli=info,boxoffice_order=info,boxoffice_hold=info,boxoffice_catalog=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().context("Failed to load config")?;
    let service = ReservationService::from_config(&config);
    tracing::info!(
        "Box office open: {} seats across {} levels",
        service.num_seats_available(None)?,
        config.levels.len()
    );

    let events = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { boxoffice_cli::log_events(&service).await })
    };

    println!("{}", boxoffice_cli::commands::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let (response, done) = handle_line(&service, &line);
        println!("{}", response);
        if done {
            break;
        }
    }

    service.shutdown().await;
    events.abort();
    tracing::info!("Box office closed");
    Ok(())
}
