//! # In-flight notifications awaiting a response.
//!
//! [`PendingNotification`] is the broker-side half of the single-slot
//! rendezvous between a producer and whoever answers on the user's
//! behalf. The producer holds the matching [`oneshot::Receiver`].
//!
//! ## Rules
//! - At most one value is ever sent; `resolve` takes the sender out, so
//!   a second call is a no-op.
//! - `close` drops the sender without a value; the producer observes a
//!   closed channel and maps it to `Aborted`.
//! - Whoever removes the entry from the pending table is responsible for
//!   resolving or closing it.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::notification::{Envelope, NotifyResponse};

/// A blocking (or freshly acked non-blocking) notification parked in the
/// pending table.
pub(crate) struct PendingNotification {
    envelope: Arc<Envelope>,
    responder: Option<oneshot::Sender<NotifyResponse>>,
}

impl PendingNotification {
    /// Creates the entry and the producer's receiving end.
    pub(crate) fn new(envelope: Arc<Envelope>) -> (Self, oneshot::Receiver<NotifyResponse>) {
        let (responder, response) = oneshot::channel();
        (
            Self {
                envelope,
                responder: Some(responder),
            },
            response,
        )
    }

    /// The envelope this entry was created for.
    pub(crate) fn envelope(&self) -> &Arc<Envelope> {
        &self.envelope
    }

    /// Hands the response to the waiting producer. The first resolution
    /// wins; later calls are no-ops.
    pub(crate) fn resolve(&mut self, response: NotifyResponse) {
        if let Some(responder) = self.responder.take() {
            // The producer may already be gone; dropping the value is the
            // right outcome then.
            let _ = responder.send(response);
        }
    }

    /// Closes the response channel without a value.
    pub(crate) fn close(&mut self) {
        self.responder = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotifyRequest;

    fn envelope(request_id: u64) -> Arc<Envelope> {
        Arc::new(Envelope {
            request_id,
            request: NotifyRequest::new("test"),
        })
    }

    #[tokio::test]
    async fn first_resolution_wins() {
        let (mut pending, response) = PendingNotification::new(envelope(0));
        pending.resolve(NotifyResponse::Action("yes".into()));
        pending.resolve(NotifyResponse::Action("no".into()));
        assert_eq!(
            response.await.expect("first value delivered"),
            NotifyResponse::Action("yes".into())
        );
    }

    #[tokio::test]
    async fn close_without_value_is_observable() {
        let (mut pending, response) = PendingNotification::new(envelope(1));
        pending.close();
        pending.resolve(NotifyResponse::Dismissed);
        assert!(response.await.is_err());
    }
}
