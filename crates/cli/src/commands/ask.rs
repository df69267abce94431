//! `chatrelay ask`: One exchange from the terminal.

use chatrelay_chat::ChatRequest;
use chatrelay_config::AppConfig;
use chatrelay_core::exchange::SessionId;

pub async fn run(
    config: &AppConfig,
    question: String,
    session: Option<String>,
    model: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session_id = session.map(SessionId::from).unwrap_or_default();
    let service = chatrelay_gateway::build_chat_service(config).await?;

    let reply = service
        .chat(ChatRequest {
            session_id,
            question,
            model,
        })
        .await?;

    println!("{}", reply.response);
    eprintln!();
    eprintln!("   session: {}  model: {}", reply.session_id, reply.model);
    Ok(())
}
