//! `chatrelay serve`: Start the HTTP API server.

use chatrelay_config::AppConfig;

pub async fn run(
    mut config: AppConfig,
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    println!("ChatRelay API");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Backend:   {} ({})", config.default_provider, config.default_model);
    println!("   Storage:   {} (table {})", config.storage.backend.as_str(), config.storage.table);

    chatrelay_gateway::start(config).await?;

    Ok(())
}
