//! Live feed example
//!
//! Logs in, prints the agent list and then follows the realtime channel,
//! printing agent status changes, new activities and metric updates.
//!
//! Run with: API_URL=http://localhost:8080/v1 cargo run --example live_feed -- <user> <password>

use agent_api_client::{ApiClient, ClientConfig, RealtimeEvent, Session};
use anyhow::Context;
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let username = args.next().unwrap_or_else(|| "admin".to_string());
    let password = args.next().unwrap_or_default();

    let client = ApiClient::with_config(ClientConfig::from_env())?;
    let session = Session::new(client);

    println!("Agent Live Feed");
    println!("===============\n");

    let user = session
        .login(&username, &password)
        .await
        .context("login failed")?;
    println!("Signed in as {} ({})", user.username, user.role);

    let client = session.client();
    match client.agents().await {
        Ok(agents) => println!("Agents: {}", agents),
        Err(e) => eprintln!("Could not list agents: {}", e),
    }

    let events = client.connect().await;
    let feed = events.dispatch(
        |value| match RealtimeEvent::from_value(&value) {
            Some(RealtimeEvent::AgentStatus { agent_id, status }) => {
                println!("[agent] {} -> {}", agent_id, status)
            }
            Some(RealtimeEvent::NewActivity { activity }) => println!("[activity] {}", activity),
            Some(RealtimeEvent::MetricUpdate { metric, value }) => {
                println!("[metric] {} = {}", metric, value)
            }
            Some(RealtimeEvent::LogEntry { level, message }) => println!("[log] {} {}", level, message),
            _ => println!("[other] {}", value),
        },
        |e| eprintln!("[channel] {}", e),
    );

    if let Some(mut state) = client.channel().watch_state() {
        state.wait_for(|state| state.is_open()).await?;
        client.channel().send(&json!({ "type": "subscribe", "topic": "agents" }));
    }

    println!("\nListening, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    session.logout().await.ok();
    feed.abort();
    Ok(())
}
