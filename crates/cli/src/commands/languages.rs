//! `lingochat languages`: List the supported output languages.

use lingochat_config::AppConfig;
use tracing::debug;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let languages = config.languages.language_set()?;
    debug!(count = languages.names().len(), "Listing languages");

    println!("Supported output languages:");
    for name in languages.names() {
        let marker = if name.eq_ignore_ascii_case(&config.languages.default) {
            " (default)"
        } else {
            ""
        };
        println!("  - {name}{marker}");
    }

    Ok(())
}
