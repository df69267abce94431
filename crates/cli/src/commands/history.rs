//! `chatrelay history`: Print a session's stored exchanges.

use chatrelay_config::AppConfig;
use chatrelay_core::exchange::{Exchange, SessionId};

pub async fn run(
    config: &AppConfig,
    session: &str,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = chatrelay_storage::open_store(&config.storage).await?;
    let session_id = SessionId::from(session);

    let total = store.count(&session_id).await?;
    let exchanges = store.fetch_recent(&session_id, limit).await?;

    println!("Session {session_id}: {total} exchange(s), showing {}", exchanges.len());
    for exchange in &exchanges {
        println!();
        print!("{}", render(exchange));
    }
    Ok(())
}

fn render(exchange: &Exchange) -> String {
    format!(
        "[{}]\n  User: {}\n  Assistant: {}\n",
        exchange.timestamp.format("%Y-%m-%d %H:%M:%S"),
        exchange.user_input,
        exchange.chatbot_response
    )
}
