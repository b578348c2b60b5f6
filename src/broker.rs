//! # Broker: fan-out, correlation, and backpressure.
//!
//! The [`Broker`] sits between producers (components that want to surface
//! a message or prompt) and subscribers (front-ends that render it and
//! relay the user's reaction).
//!
//! ## Architecture
//! ```text
//! notify(req) ──► dispatcher (under the state mutex)
//!                   ├─► admission check against the pending table
//!                   ├─► try_push to every eligible subscription
//!                   │     └─► full queue? evict, never wait
//!                   └─► pending entry (oneshot) ──► producer waits
//!
//! respond(id, resp) ──► pending table ──► resolves the producer
//!
//! subscribe(req, sink) ──► register + replay backlog
//!                            └─► loop: queue ──► sink.deliver()
//! ```
//!
//! ## Rules
//! - One mutex guards both tables and both counters; it is never held
//!   across an await or a blocking send.
//! - Fan-out is non-blocking; a slow subscriber is evicted, so no
//!   subscriber can stall a producer or the lock.
//! - The producer-cancel / respond race is arbitrated by the pending
//!   table: whoever removes the entry first wins, the loser observes
//!   absence.
//! - Ids are monotonic and never reused within a broker lifetime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::BrokerError;
use crate::notification::{Envelope, NotifyRequest, NotifyResponse, SubscribeRequest};
use crate::pending::PendingNotification;
use crate::sink::NotificationSink;
use crate::subscription::Subscription;

/// In-process notification broker.
///
/// Producers call [`notify`](Broker::notify); front-ends call
/// [`subscribe`](Broker::subscribe) with a [`NotificationSink`] and relay
/// the user's reaction through [`respond`](Broker::respond). All three
/// paths may run concurrently; the broker is re-entrant across calls.
pub struct Broker {
    cfg: Config,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_subscription_id: u64,
    subscriptions: HashMap<u64, Subscription>,
    next_notification_id: u64,
    pending: HashMap<u64, PendingNotification>,
    shutdown: bool,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Broker {
    /// Creates a broker with the given capacity limits.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            state: Mutex::new(State::default()),
        }
    }

    /// Submits a notification and waits for the user's response.
    ///
    /// Non-blocking requests (no actions, no open, no preview) resolve
    /// immediately with [`NotifyResponse::Dismissed`], independent of any
    /// subscriber's behavior. Blocking requests park the caller until a
    /// matching [`respond`](Broker::respond) arrives or `cancel` fires;
    /// the broker imposes no timeout of its own.
    pub async fn notify(
        &self,
        cancel: CancellationToken,
        request: NotifyRequest,
    ) -> Result<NotifyResponse, BrokerError> {
        let (request_id, mut response) = self.dispatch(request)?;
        tokio::select! {
            outcome = &mut response => match outcome {
                Ok(resp) => Ok(resp),
                Err(_) => {
                    error!(request_id, "notify response channel closed");
                    Err(BrokerError::Aborted)
                }
            },
            _ = cancel.cancelled() => {
                debug!(request_id, "notify cancelled");
                let mut state = self.lock();
                // The response may have been handed over between the two
                // branches; the table lookup arbitrates that race.
                if let Some(mut pending) = state.pending.remove(&request_id) {
                    pending.close();
                }
                Err(BrokerError::Canceled)
            }
        }
    }

    /// Streams fan-out envelopes to one subscriber until its context is
    /// cancelled or the subscription is torn down.
    ///
    /// On entry the subscriber receives the eligible backlog from the
    /// pending table (see [`Config::subscriber_queue_floor`] for how the
    /// queue is sized against it). Returns `Ok(())` on cancellation,
    /// [`BrokerError::Aborted`] when the queue closes underneath it
    /// (eviction or shutdown), and [`BrokerError::DeliveryFailed`] when
    /// the sink reports an error.
    pub async fn subscribe<S>(
        &self,
        request: SubscribeRequest,
        sink: &mut S,
        cancel: CancellationToken,
    ) -> Result<(), BrokerError>
    where
        S: NotificationSink + ?Sized,
    {
        let (subscription_id, mut queue) = self.register(request, &cancel)?;
        debug!(
            subscription = subscription_id,
            active = request.active,
            "subscriber joined"
        );
        let outcome = Self::stream(&mut queue, sink, &cancel).await;
        self.unsubscribe(subscription_id);
        debug!(subscription = subscription_id, "subscriber left");
        outcome
    }

    /// Reports the user's reaction to a pending notification.
    ///
    /// Unknown or already-resolved ids yield
    /// [`BrokerError::StaleResponse`]; a response that does not match the
    /// original request yields [`BrokerError::InvalidResponse`] and
    /// leaves the entry in place for a corrected retry.
    pub fn respond(&self, request_id: u64, response: NotifyResponse) -> Result<(), BrokerError> {
        let mut state = self.lock();
        let Some(pending) = state.pending.get_mut(&request_id) else {
            info!(request_id, "invalid or late response to notification");
            return Err(BrokerError::StaleResponse);
        };
        if !response.is_valid_for(&pending.envelope().request) {
            warn!(
                request_id,
                ?response,
                "response does not match the original request"
            );
            return Err(BrokerError::InvalidResponse);
        }
        pending.resolve(response);
        state.pending.remove(&request_id);
        Ok(())
    }

    /// Shuts the broker down: closes every subscription and every pending
    /// entry. In-flight `notify` calls observe closed channels and return
    /// [`BrokerError::Aborted`], as do `notify`/`subscribe` calls made
    /// after this point. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        if state.shutdown {
            return;
        }
        state.shutdown = true;
        let subscriptions = state.subscriptions.len();
        let pending = state.pending.len();
        state.subscriptions.clear();
        for (_, mut entry) in state.pending.drain() {
            entry.close();
        }
        info!(subscriptions, pending, "broker shut down");
    }

    /// Number of entries currently in the pending table.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    /// Admits, fans out, and parks one request. Runs entirely under the
    /// state mutex; every channel operation in here is non-blocking.
    fn dispatch(
        &self,
        request: NotifyRequest,
    ) -> Result<(u64, oneshot::Receiver<NotifyResponse>), BrokerError> {
        let mut state = self.lock();
        if state.shutdown {
            return Err(BrokerError::Aborted);
        }
        // Admission before any mutation: a rejected request allocates no id.
        if state.pending.len() >= self.cfg.max_pending_notifications {
            return Err(BrokerError::PendingLimitExceeded);
        }

        let request_id = state.next_notification_id;
        state.next_notification_id += 1;
        let envelope = Arc::new(Envelope {
            request_id,
            request,
        });

        state.subscriptions.retain(|_, subscription| {
            if !subscription.matches(&envelope.request) {
                return true;
            }
            match subscription.try_push(Arc::clone(&envelope)) {
                Ok(()) => true,
                Err(_) => {
                    // The subscriber is not consuming fast enough; cut it
                    // loose rather than stall the producer.
                    warn!(
                        subscription = subscription.id(),
                        request_id, "evicting unresponsive subscriber"
                    );
                    false
                }
            }
        });

        let (mut pending, response) = PendingNotification::new(Arc::clone(&envelope));
        if !envelope.request.is_blocking() {
            // Pure information delivery: ack the producer up front. The
            // entry stays in the table for late-joining subscribers.
            pending.resolve(NotifyResponse::Dismissed);
        }
        state.pending.insert(request_id, pending);
        Ok((request_id, response))
    }

    /// Allocates and registers a subscription, replaying the eligible
    /// backlog onto its fresh queue.
    fn register(
        &self,
        request: SubscribeRequest,
        cancel: &CancellationToken,
    ) -> Result<(u64, mpsc::Receiver<Arc<Envelope>>), BrokerError> {
        let mut state = self.lock();
        if state.shutdown {
            return Err(BrokerError::Aborted);
        }

        // Size the queue so the replay burst below always fits.
        let capacity = self
            .cfg
            .subscriber_queue_floor
            .max(state.pending.len())
            .max(1);
        let (queue, receiver) = mpsc::channel(capacity);
        let subscription_id = state.next_subscription_id;
        state.next_subscription_id += 1;
        let subscription =
            Subscription::new(subscription_id, request.active, queue, cancel.child_token());

        // Replay the eligible backlog in request order. Blocking entries
        // still await a response and stay in the table; non-blocking ones
        // exist only to bridge the gap to the first eligible joiner and
        // are consumed here.
        let mut backlog: Vec<u64> = state
            .pending
            .iter()
            .filter(|(_, pending)| subscription.matches(&pending.envelope().request))
            .map(|(id, _)| *id)
            .collect();
        backlog.sort_unstable();
        debug!(
            subscription = subscription_id,
            backlog = backlog.len(),
            "replaying pending notifications"
        );
        for request_id in backlog {
            let Some(pending) = state.pending.get(&request_id) else {
                continue;
            };
            let envelope = Arc::clone(pending.envelope());
            let blocking = envelope.request.is_blocking();
            if subscription.try_push(envelope).is_err() {
                // Unreachable: capacity was sized against the whole table.
                warn!(
                    subscription = subscription_id,
                    request_id, "replay overflowed a fresh queue"
                );
                break;
            }
            if !blocking {
                state.pending.remove(&request_id);
            }
        }

        state.subscriptions.insert(subscription_id, subscription);
        Ok((subscription_id, receiver))
    }

    /// Forwards queued envelopes to the sink until cancellation, queue
    /// closure, or a delivery failure.
    async fn stream<S>(
        queue: &mut mpsc::Receiver<Arc<Envelope>>,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<(), BrokerError>
    where
        S: NotificationSink + ?Sized,
    {
        loop {
            tokio::select! {
                message = queue.recv() => match message {
                    Some(envelope) => {
                        if let Err(err) = sink.deliver(&envelope).await {
                            return Err(BrokerError::DeliveryFailed {
                                reason: err.to_string(),
                            });
                        }
                    }
                    None => return Err(BrokerError::Aborted),
                },
                _ = cancel.cancelled() => return Ok(()),
            }
        }
    }

    /// Removes a subscription if it is still registered. A no-op when the
    /// dispatcher already evicted it or shutdown cleared the registry.
    fn unsubscribe(&self, subscription_id: u64) {
        let mut state = self.lock();
        if state.subscriptions.remove(&subscription_id).is_none() {
            debug!(
                subscription = subscription_id,
                "subscription already removed"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("broker state mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::time::{sleep, timeout};

    use crate::notification::{Command, Level};
    use crate::sink::ChannelSink;

    const TICK: Duration = Duration::from_millis(1);
    const WAIT: Duration = Duration::from_secs(1);

    /// Spawns a channel-backed subscriber and waits until it is
    /// registered, so tests can rely on live fan-out reaching it.
    async fn spawn_subscriber(
        broker: &Arc<Broker>,
        active: bool,
    ) -> (
        mpsc::Receiver<Envelope>,
        CancellationToken,
        tokio::task::JoinHandle<Result<(), BrokerError>>,
    ) {
        let before = broker.subscriber_count();
        let (sink, consumer) = ChannelSink::new(64);
        let cancel = CancellationToken::new();
        let handle = {
            let broker = Arc::clone(broker);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut sink = sink;
                broker
                    .subscribe(SubscribeRequest { active }, &mut sink, cancel)
                    .await
            })
        };
        timeout(WAIT, async {
            while broker.subscriber_count() <= before {
                sleep(TICK).await;
            }
        })
        .await
        .expect("subscriber registered");
        (consumer, cancel, handle)
    }

    async fn wait_for_pending(broker: &Arc<Broker>, count: usize) {
        timeout(WAIT, async {
            while broker.pending_count() != count {
                sleep(TICK).await;
            }
        })
        .await
        .expect("pending table reached expected size");
    }

    #[tokio::test]
    async fn non_blocking_notify_acks_without_subscribers() {
        let broker = Broker::default();
        let response = timeout(
            WAIT,
            broker.notify(CancellationToken::new(), NotifyRequest::new("hi")),
        )
        .await
        .expect("acked immediately")
        .expect("accepted");
        assert_eq!(response, NotifyResponse::Dismissed);
        // The entry waits in the table for a first eligible joiner.
        assert_eq!(broker.pending_count(), 1);
    }

    #[tokio::test]
    async fn admission_is_checked_before_any_mutation() {
        let broker = Broker::new(Config {
            max_pending_notifications: 2,
            ..Config::default()
        });
        for _ in 0..2 {
            broker
                .notify(CancellationToken::new(), NotifyRequest::new("fill"))
                .await
                .expect("under the limit");
        }
        let err = broker
            .notify(CancellationToken::new(), NotifyRequest::new("overflow"))
            .await
            .expect_err("at capacity");
        assert!(matches!(err, BrokerError::PendingLimitExceeded));
        assert_eq!(broker.pending_count(), 2);
    }

    #[tokio::test]
    async fn ids_are_assigned_monotonically() {
        let broker = Arc::new(Broker::default());
        let (mut consumer, cancel, handle) = spawn_subscriber(&broker, false).await;

        for message in ["one", "two", "three"] {
            broker
                .notify(CancellationToken::new(), NotifyRequest::new(message))
                .await
                .expect("accepted");
        }
        for expected in 0..3u64 {
            let envelope = timeout(WAIT, consumer.recv())
                .await
                .expect("delivered")
                .expect("open");
            assert_eq!(envelope.request_id, expected);
        }

        cancel.cancel();
        handle.await.expect("join").expect("clean exit");
    }

    #[tokio::test]
    async fn respond_to_unknown_id_is_stale() {
        let broker = Broker::default();
        let err = broker
            .respond(42, NotifyResponse::Dismissed)
            .expect_err("nothing pending");
        assert!(matches!(err, BrokerError::StaleResponse));
    }

    #[tokio::test]
    async fn dismissal_resolves_a_blocking_request() {
        let broker = Arc::new(Broker::default());
        let producer = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move {
                broker
                    .notify(
                        CancellationToken::new(),
                        NotifyRequest::new("continue?").with_actions(["go"]),
                    )
                    .await
            })
        };
        wait_for_pending(&broker, 1).await;

        broker
            .respond(0, NotifyResponse::Dismissed)
            .expect("dismissal is always allowed");
        let response = producer.await.expect("join").expect("resolved");
        assert_eq!(response, NotifyResponse::Dismissed);
        assert_eq!(broker.pending_count(), 0);
    }

    #[tokio::test]
    async fn command_response_round_trip() {
        let broker = Arc::new(Broker::default());
        let producer = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move {
                broker
                    .notify(
                        CancellationToken::new(),
                        NotifyRequest::new("port 3000 is ready")
                            .with_level(Level::Info)
                            .with_open("http://localhost:3000"),
                    )
                    .await
            })
        };
        wait_for_pending(&broker, 1).await;

        let empty = NotifyResponse::Command(Command {
            cmd: String::new(),
            args: vec![],
        });
        assert!(matches!(
            broker.respond(0, empty).expect_err("empty cmd"),
            BrokerError::InvalidResponse
        ));

        let open = NotifyResponse::Command(Command {
            cmd: "xdg-open".into(),
            args: vec!["http://localhost:3000".into()],
        });
        broker.respond(0, open.clone()).expect("valid command");
        assert_eq!(producer.await.expect("join").expect("resolved"), open);
    }

    #[tokio::test]
    async fn producer_cancellation_removes_the_entry() {
        let broker = Arc::new(Broker::default());
        let cancel = CancellationToken::new();
        let producer = {
            let broker = Arc::clone(&broker);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                broker
                    .notify(cancel, NotifyRequest::new("still there?").with_actions(["yes"]))
                    .await
            })
        };
        wait_for_pending(&broker, 1).await;

        cancel.cancel();
        let err = producer.await.expect("join").expect_err("cancelled");
        assert!(matches!(err, BrokerError::Canceled));
        assert_eq!(broker.pending_count(), 0);
        // A late response now finds nothing.
        assert!(matches!(
            broker
                .respond(0, NotifyResponse::Action("yes".into()))
                .expect_err("entry is gone"),
            BrokerError::StaleResponse
        ));
    }

    #[tokio::test]
    async fn shutdown_aborts_producers_and_rejects_new_calls() {
        let broker = Arc::new(Broker::default());
        let (_consumer, _cancel, subscriber) = spawn_subscriber(&broker, true).await;
        let producer = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move {
                broker
                    .notify(
                        CancellationToken::new(),
                        NotifyRequest::new("hold on").with_actions(["ok"]).with_active(true),
                    )
                    .await
            })
        };
        wait_for_pending(&broker, 1).await;

        broker.shutdown();
        broker.shutdown(); // idempotent

        let err = producer.await.expect("join").expect_err("aborted");
        assert!(matches!(err, BrokerError::Aborted));
        let err = subscriber.await.expect("join").expect_err("aborted");
        assert!(matches!(err, BrokerError::Aborted));

        assert!(matches!(
            broker
                .notify(CancellationToken::new(), NotifyRequest::new("late"))
                .await
                .expect_err("rejected"),
            BrokerError::Aborted
        ));
        let mut sink = crate::sink::LogSink;
        assert!(matches!(
            broker
                .subscribe(
                    SubscribeRequest::default(),
                    &mut sink,
                    CancellationToken::new()
                )
                .await
                .expect_err("rejected"),
            BrokerError::Aborted
        ));
        assert_eq!(broker.pending_count(), 0);
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn replay_queue_is_sized_to_the_backlog() {
        // Floor of 2, but five parked notifications: the join-time burst
        // must still fit without evicting the newborn subscription.
        let broker = Arc::new(Broker::new(Config {
            subscriber_queue_floor: 2,
            ..Config::default()
        }));
        for message in ["a", "b", "c", "d", "e"] {
            broker
                .notify(
                    CancellationToken::new(),
                    NotifyRequest::new(message).with_active(true),
                )
                .await
                .expect("accepted");
        }
        assert_eq!(broker.pending_count(), 5);

        let (mut consumer, cancel, handle) = spawn_subscriber(&broker, true).await;
        for expected in 0..5u64 {
            let envelope = timeout(WAIT, consumer.recv())
                .await
                .expect("replayed")
                .expect("open");
            assert_eq!(envelope.request_id, expected);
        }
        assert_eq!(broker.pending_count(), 0);

        cancel.cancel();
        handle.await.expect("join").expect("clean exit");
    }
}
