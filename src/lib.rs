//! # notivisor
//!
//! **Notivisor** is a lightweight in-process notification broker.
//!
//! It sits between producers (trusted components that want to surface a
//! message or prompt to the user) and subscribers (IDE front-ends,
//! terminal UIs) inside a supervisor-style process: a producer submits a
//! notification, the broker fans it out to every eligible subscriber,
//! and for requests that demand user input it parks the producer until
//! exactly one response (or a cancellation) arrives.
//!
//! ## Features
//!
//! | Area              | Description                                                            | Key types / traits                       |
//! |-------------------|------------------------------------------------------------------------|------------------------------------------|
//! | **Fan-out**       | Non-blocking delivery to per-subscriber bounded queues, with eviction. | [`Broker`]                               |
//! | **Prompts**       | Blocking requests rendezvous with the user's response by request id.   | [`NotifyRequest`], [`NotifyResponse`]    |
//! | **Replay**        | Late joiners receive the eligible backlog of parked notifications.     | [`Envelope`], [`SubscribeRequest`]       |
//! | **Delivery seam** | Transport bindings implement one async trait per subscriber stream.    | [`NotificationSink`], [`ChannelSink`]    |
//! | **Errors**        | Typed errors with stable labels and transport-facing categories.       | [`BrokerError`], [`ErrorCode`]           |
//! | **Configuration** | Bounded pending table and per-subscriber queues.                       | [`Config`]                               |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use notivisor::{Broker, ChannelSink, NotifyRequest, NotifyResponse, SubscribeRequest};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = Arc::new(Broker::default());
//!
//!     // Stream notifications for the focused front-end into a channel.
//!     let (sink, mut inbox) = ChannelSink::new(16);
//!     let stream_token = CancellationToken::new();
//!     let streamer = {
//!         let broker = Arc::clone(&broker);
//!         let token = stream_token.clone();
//!         tokio::spawn(async move {
//!             let mut sink = sink;
//!             broker
//!                 .subscribe(SubscribeRequest { active: true }, &mut sink, token)
//!                 .await
//!         })
//!     };
//!
//!     // Ask the user a question and wait for the answer.
//!     let producer = {
//!         let broker = Arc::clone(&broker);
//!         tokio::spawn(async move {
//!             let request = NotifyRequest::new("reload the window?")
//!                 .with_actions(["yes", "no"])
//!                 .with_active(true);
//!             broker.notify(CancellationToken::new(), request).await
//!         })
//!     };
//!
//!     // The front-end renders the prompt and relays the user's choice.
//!     let envelope = inbox.recv().await.expect("prompt delivered");
//!     broker.respond(envelope.request_id, NotifyResponse::Action("yes".into()))?;
//!     assert_eq!(producer.await??, NotifyResponse::Action("yes".into()));
//!
//!     stream_token.cancel();
//!     streamer.await??;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod broker;
mod config;
mod error;
mod notification;
mod pending;
mod sink;
mod subscription;

// ---- Public re-exports ----

pub use broker::Broker;
pub use config::Config;
pub use error::{BrokerError, ErrorCode};
pub use notification::{
    Command, Envelope, Level, NotifyRequest, NotifyResponse, OpenRequest, PreviewRequest,
    SubscribeRequest,
};
pub use sink::{ChannelSink, LogSink, NotificationSink};
