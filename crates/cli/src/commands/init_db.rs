//! `chatrelay init-db`: Create the history table and exit.

use chatrelay_config::AppConfig;
use chatrelay_config::redact_url;

pub async fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = chatrelay_storage::open_store(&config.storage).await?;

    let location = match &config.storage.url {
        Some(url) if store.name() != "sqlite" => redact_url(url),
        _ => config.storage.path.clone(),
    };
    println!(
        "History table '{}' ready ({} at {location})",
        config.storage.table,
        store.name()
    );
    Ok(())
}
