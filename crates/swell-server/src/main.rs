use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let (config, validation) = swell_core::Config::load_validated()?;

    // Initialize logging with the configured filter
    swell_core::init(&config.logging.filter)?;

    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    tracing::info!(
        "Swell server starting on {}:{}",
        config.server.host,
        config.server.port
    );

    swell_server::serve(&config).await?;

    Ok(())
}
