use anyhow::Result;
use farm_market::config::{LogFormat, Settings};
use farm_market::infrastructure::log_messages::{application, configuration};
use farm_market::Application;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))?;
    match settings.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .init(),
    }

    info!(
        environment = %settings.application.environment,
        "{}",
        configuration::CONFIG_LOADED
    );
    info!("{}", application::STARTING);

    let app = Application::with_settings(settings).await?;
    app.run().await?;

    Ok(())
}
