use std::time::Duration;

use dotenvy::dotenv;
use schedule_server::{config::Config, startup::HttpServer, state, tasks};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenv().ok();
    color_eyre::install()?;
    config_tracing();

    let config = Config::load()?;
    let state = state::setup(&config).await?;

    let mut scheduler = tasks::start_meeting_sweeper(
        state.meetings.clone(),
        Duration::from_secs(config.sweeper.interval_secs),
    )
    .await?;

    let server = HttpServer::new(&config, state).await?;
    server
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    scheduler.shutdown().await?;
    Ok(())
}

fn config_tracing() {
    use tracing::Level;
    use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

    let tracing_layer = tracing_subscriber::fmt::layer();
    let filter = filter::Targets::new()
        .with_target("hyper::proto", Level::INFO)
        .with_target("tower_http::trace", Level::DEBUG)
        .with_default(Level::DEBUG);

    tracing_subscriber::registry()
        .with(tracing_layer)
        .with(filter)
        .init();
}
