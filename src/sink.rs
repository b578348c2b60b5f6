//! # Delivery seam between the broker and a subscriber's transport.
//!
//! [`NotificationSink`] is the extension point a transport binding (gRPC
//! stream, IDE bridge, terminal UI) implements to receive fan-out
//! envelopes for one subscriber.
//!
//! ## Rules
//! - `deliver` is awaited outside the broker's critical section; a slow
//!   sink only delays its own subscriber's queue drain.
//! - A `deliver` error tears the subscription down; the subscriber path
//!   returns [`DeliveryFailed`](crate::BrokerError::DeliveryFailed).
//! - Backpressure is handled upstream: a sink that drains too slowly
//!   fills its bounded queue and gets evicted.
//!
//! Two sinks ship with the crate: [`ChannelSink`] for in-process
//! consumers and tests, and [`LogSink`] for demos and debugging.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::notification::Envelope;

/// Receives fan-out envelopes for a single subscriber.
#[async_trait]
pub trait NotificationSink: Send {
    /// Forwards one envelope to the subscriber.
    ///
    /// Called from the subscriber's own task, one envelope at a time, in
    /// queue order. Returning an error ends the subscription.
    async fn deliver(&mut self, message: &Envelope) -> anyhow::Result<()>;
}

/// Sink that forwards envelopes into an in-process channel.
///
/// The receiving half is handed back at construction; in-process
/// front-ends and tests consume envelopes from it at their own pace.
pub struct ChannelSink {
    forward: mpsc::Sender<Envelope>,
}

impl ChannelSink {
    /// Creates the sink and the consumer's receiving end.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (forward, consumer) = mpsc::channel(capacity.max(1));
        (Self { forward }, consumer)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(&mut self, message: &Envelope) -> anyhow::Result<()> {
        self.forward
            .send(message.clone())
            .await
            .map_err(|_| anyhow::anyhow!("consumer side of the channel is gone"))
    }
}

/// Sink that prints envelopes to stdout. For demos and debugging.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&mut self, message: &Envelope) -> anyhow::Result<()> {
        let request = &message.request;
        println!(
            "[notification] id={} level={:?} active={} message={:?} actions={:?}",
            message.request_id, request.level, request.active, request.message, request.actions
        );
        Ok(())
    }
}
