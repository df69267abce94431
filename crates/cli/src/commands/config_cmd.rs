//! `chatrelay config`: Show the effective configuration.

use std::path::Path;

use chatrelay_config::AppConfig;

pub fn run(config: &AppConfig, source: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("# {}", source.display());
    if !config.has_api_key() {
        println!("# warning: no API key set (api_key, CHATRELAY_API_KEY or the provider's own variable)");
    }
    println!("{}", config.redacted_toml());
    Ok(())
}
