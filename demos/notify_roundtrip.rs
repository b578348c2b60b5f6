//! # Demo: notify_roundtrip
//!
//! A producer asks the user a question; a front-end renders the prompt
//! and relays the answer.
//!
//! Shows how to:
//! - Subscribe a front-end with [`ChannelSink`]
//! - Submit a blocking prompt with [`Broker::notify`]
//! - Relay the user's choice with [`Broker::respond`]
//! - Deliver plain information without waiting on anyone
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► spawn front-end: Broker::subscribe(active=true, ChannelSink)
//!   │     └─► renders prompts from the inbox, answers after a beat
//!   ├─► notify("rebuild the workspace image?", actions=[rebuild, skip])
//!   │     └─► parks until the front-end responds
//!   └─► notify("build finished"): non-blocking, returns immediately
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example notify_roundtrip
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use notivisor::{Broker, ChannelSink, Level, NotifyRequest, NotifyResponse, SubscribeRequest};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notivisor=debug")),
        )
        .init();

    println!("=== notify_roundtrip demo ===\n");

    // 1. Create the broker with default limits.
    let broker = Arc::new(Broker::default());

    // 2. Spawn the front-end: stream prompts into a channel.
    let (sink, mut inbox) = ChannelSink::new(16);
    let frontend_token = CancellationToken::new();
    let frontend_stream = {
        let broker = Arc::clone(&broker);
        let token = frontend_token.clone();
        tokio::spawn(async move {
            let mut sink = sink;
            broker
                .subscribe(SubscribeRequest { active: true }, &mut sink, token)
                .await
        })
    };

    // 3. The "user": render each prompt, pick the first offered action.
    let responder = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                println!(
                    "[front-end] prompt #{}: {:?} actions={:?}",
                    envelope.request_id, envelope.request.message, envelope.request.actions
                );
                if !envelope.request.is_blocking() {
                    continue;
                }
                // Give the "user" a moment to think.
                tokio::time::sleep(Duration::from_millis(300)).await;
                let choice = match envelope.request.actions.first() {
                    Some(action) => NotifyResponse::Action(action.clone()),
                    None => NotifyResponse::Dismissed,
                };
                println!("[front-end] answering #{} with {choice:?}", envelope.request_id);
                if let Err(e) = broker.respond(envelope.request_id, choice) {
                    eprintln!("[front-end] respond failed: {e}");
                }
            }
        })
    };

    // 4. Producer: a blocking question.
    println!("[producer] asking to rebuild...");
    let answer = broker
        .notify(
            CancellationToken::new(),
            NotifyRequest::new("rebuild the workspace image?")
                .with_level(Level::Warning)
                .with_actions(["rebuild", "skip"])
                .with_active(true),
        )
        .await?;
    println!("[producer] user chose: {answer:?}\n");

    // 5. Producer: fire-and-forget information.
    let ack = broker
        .notify(
            CancellationToken::new(),
            NotifyRequest::new("build finished").with_active(true),
        )
        .await?;
    println!("[producer] info acked with {ack:?}");

    // 6. Wind down: stop the front-end stream, then the broker.
    tokio::time::sleep(Duration::from_millis(100)).await;
    frontend_token.cancel();
    frontend_stream.await??;
    // The sink went away with the stream, so the inbox drains and closes.
    responder.await?;
    broker.shutdown();

    println!("\n=== demo completed ===");
    Ok(())
}
