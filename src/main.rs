use anyhow::Result;
use golden_gate::config::Settings;
use golden_gate::Application;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;

    // RUST_LOG wins over the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.logging.level)?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Golden Gate application");

    let app = Application::new(settings)?;
    app.run().await?;

    Ok(())
}
