//! # Registry-side subscriber handles.
//!
//! A [`Subscription`] is what the broker's registry keeps per subscriber:
//! the sending half of the bounded outbound queue, the interest flag used
//! for routing, and a cancellation handle scoped to the subscriber's
//! transport context. The subscriber path owns the receiving half.
//!
//! ## Rules
//! - Fan-out uses [`try_push`](Subscription::try_push); a full queue is
//!   grounds for eviction, never for blocking the producer.
//! - Removing the subscription from the registry closes the queue
//!   (sender drop) and cancels the handle (`Drop` impl), exactly once on
//!   every exit path: unsubscribe, eviction, shutdown.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::notification::{Envelope, NotifyRequest};

/// One registered subscriber, as seen by the dispatcher.
pub(crate) struct Subscription {
    id: u64,
    active: bool,
    queue: mpsc::Sender<Arc<Envelope>>,
    cancel: CancellationToken,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        active: bool,
        queue: mpsc::Sender<Arc<Envelope>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            active,
            queue,
            cancel,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Eligibility: the subscriber's interest class must equal the
    /// request's. No other routing key exists.
    pub(crate) fn matches(&self, request: &NotifyRequest) -> bool {
        self.active == request.active
    }

    /// Non-blocking enqueue onto the outbound queue.
    pub(crate) fn try_push(
        &self,
        envelope: Arc<Envelope>,
    ) -> Result<(), mpsc::error::TrySendError<Arc<Envelope>>> {
        self.queue.try_send(envelope)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The queue sender is dropped with `self`; cancelling here makes
        // every removal path also release the transport-scoped handle.
        self.cancel.cancel();
    }
}
