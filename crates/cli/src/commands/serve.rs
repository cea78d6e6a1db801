//! `lingochat serve`: Start the web chat page and HTTP API.

use lingochat_config::AppConfig;
use tracing::info;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        info!(port, "Port overridden from the command line");
        config.gateway.port = port;
    }

    println!("LingoChat");
    println!("   Open:  http://{}:{}/", config.gateway.host, config.gateway.port);
    println!("   Model: {}", config.model);

    lingochat_gateway::start(config).await?;

    Ok(())
}
