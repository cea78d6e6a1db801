//! `lingochat doctor`: Diagnose configuration and connectivity.

use lingochat_config::{AppConfig, ENV_FILE};
use tracing::{debug, warn};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("LingoChat Doctor");
    println!("================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ok    Config file found: {}", config_path.display());
    } else {
        println!("  note  No config file, using defaults (run `lingochat init`)");
    }

    if std::path::Path::new(ENV_FILE).exists() {
        println!("  ok    Env file found: {ENV_FILE}");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ok    Configuration valid");
            config
        }
        Err(e) => {
            warn!(error = %e, "Configuration invalid");
            println!("  FAIL  Configuration invalid: {e}");
            println!("\n  1 issue found.");
            return Ok(());
        }
    };

    println!(
        "        provider={} model={} budget={} {:?}",
        config.provider, config.model, config.memory.trim_budget, config.memory.size_metric
    );

    match lingochat_providers::build_from_config(&config) {
        Ok(provider) => {
            println!("  ok    API key configured");
            debug!(provider = provider.name(), url = %config.base_url, "Checking endpoint health");
            match provider.health_check().await {
                Ok(true) => println!("  ok    Endpoint reachable: {}", config.base_url),
                Ok(false) => {
                    println!("  FAIL  Endpoint answered but is not healthy: {}", config.base_url);
                    issues += 1;
                }
                Err(e) => {
                    println!("  FAIL  Endpoint check failed: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  FAIL  {e}");
            println!("        Set LINGOCHAT_API_KEY or GROQ_API_KEY, or add it to {ENV_FILE}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
