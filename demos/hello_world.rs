//! Minimal bot: answers `!ping` with `pong!` and prints its own user on READY.
//!
//! Run with:
//! ```text
//! BOT_TOKEN=... RUST_LOG=kantele=debug cargo run --example hello_world
//! ```

use kantele::{EventContext, Gateway, Intents, RestClient};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Deserialize)]
struct MessageCreate {
    channel_id: String,
    #[serde(default)]
    content: String,
}

#[tokio::main]
async fn main() -> kantele::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let token = std::env::var("BOT_TOKEN")
        .map_err(|_| kantele::KanteleError::Config("BOT_TOKEN is not set".into()))?;
    let rest = RestClient::new(&token);

    let ready_rest = rest.clone();
    let gateway = Gateway::builder(&token)
        .intents(Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT)
        .on("MESSAGE_CREATE", move |msg: MessageCreate, _ctx: EventContext| {
            let rest = rest.clone();
            async move {
                if msg.content == "!ping" {
                    let endpoint = format!("/channels/{}/messages", msg.channel_id);
                    rest.post(&endpoint, &json!({ "content": "pong!" })).await?;
                }
                Ok(())
            }
        })
        .on("READY", move |_: Value, _ctx: EventContext| {
            let rest = ready_rest.clone();
            async move {
                let me = rest.get("/users/@me").await?.text().await?;
                println!("{}", me);
                Ok(())
            }
        })
        .build()?;

    gateway.open().await?;
    gateway.wait_for_shutdown().await
}
