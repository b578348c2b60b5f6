//! # Demo: slow_subscriber
//!
//! What happens when a front-end cannot keep up: its bounded queue
//! overflows and the broker cuts it loose instead of stalling producers.
//!
//! Shows how to:
//! - Shrink the per-subscriber queue with [`Config::subscriber_queue_floor`]
//! - Observe eviction from the subscriber side (`Aborted`)
//! - Verify producers resolve immediately throughout
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► subscribe a sink that sleeps 500ms per delivery (queue floor 4)
//!   ├─► fire 12 non-blocking notifications back to back
//!   │     ├─► queue fills at 4, the 5th try_send fails
//!   │     └─► broker evicts the subscriber (watch the warn! log)
//!   └─► subscriber drains its backlog, observes the closed queue, exits
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example slow_subscriber
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use notivisor::{
    Broker, Config, Envelope, NotificationSink, NotifyRequest, SubscribeRequest,
};

/// A front-end that takes half a second to render each notification.
struct SluggishSink;

#[async_trait]
impl NotificationSink for SluggishSink {
    async fn deliver(&mut self, message: &Envelope) -> anyhow::Result<()> {
        println!("[front-end] rendering #{}: {:?}", message.request_id, message.request.message);
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notivisor=debug")),
        )
        .init();

    println!("=== slow_subscriber demo ===\n");

    // 1. A deliberately tiny queue so the overflow is easy to trigger.
    let broker = Arc::new(Broker::new(Config {
        subscriber_queue_floor: 4,
        ..Config::default()
    }));

    // 2. Subscribe the sluggish front-end.
    let subscriber = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move {
            let mut sink = SluggishSink;
            broker
                .subscribe(
                    SubscribeRequest { active: true },
                    &mut sink,
                    CancellationToken::new(),
                )
                .await
        })
    };
    while broker.subscriber_count() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    // 3. Outrun it. Every call resolves immediately regardless.
    for i in 0..12 {
        let started = Instant::now();
        broker
            .notify(
                CancellationToken::new(),
                NotifyRequest::new(format!("tick {i}")).with_active(true),
            )
            .await?;
        println!("[producer] tick {i} acked in {:?}", started.elapsed());
    }

    // 4. The subscriber drains what it buffered, then sees the closed queue.
    match subscriber.await? {
        Ok(()) => println!("\n[front-end] exited cleanly (unexpected here)"),
        Err(e) => println!("\n[front-end] stream ended: {e} (label: {})", e.as_label()),
    }
    println!("subscribers left: {}", broker.subscriber_count());

    println!("\n=== demo completed ===");
    Ok(())
}
