//! `lingochat init`: Write a default config file.

use lingochat_config::AppConfig;
use tracing::info;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    info!(path = %config_path.display(), overwritten = force, "Default config written");
    println!("Wrote {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("   1. Set GROQ_API_KEY in your shell or a .env file (or api_key in the file)");
    println!("   2. Run: lingochat chat");
    println!("   3. Or:  lingochat serve, then open the page in a browser");

    Ok(())
}
