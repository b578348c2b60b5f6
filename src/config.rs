//! # Broker configuration.
//!
//! [`Config`] bounds the broker's two memory-relevant resources: the
//! pending table (in-flight notifications awaiting a response) and the
//! per-subscriber outbound queue.
//!
//! # Example
//! ```
//! use notivisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.max_pending_notifications = 32;
//!
//! assert_eq!(cfg.max_pending_notifications, 32);
//! assert_eq!(cfg.subscriber_queue_floor, 100);
//! ```

/// Capacity limits for the broker.
///
/// Both limits exist to keep memory bounded under slow or absent
/// subscribers; neither introduces a timeout.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of entries in the pending table. A `notify` call
    /// that would exceed it fails up front with
    /// [`PendingLimitExceeded`](crate::BrokerError::PendingLimitExceeded).
    pub max_pending_notifications: usize,
    /// Minimum capacity of each subscriber's outbound queue.
    ///
    /// The actual capacity at subscribe time is the larger of this floor
    /// and the current pending-table size, so the join-time replay burst
    /// can never overflow a newborn subscription. Overflow during live
    /// fan-out evicts the subscriber.
    pub subscriber_queue_floor: usize,
}

impl Default for Config {
    /// Provides the default limits:
    /// - `max_pending_notifications = 120`
    /// - `subscriber_queue_floor = 100`
    fn default() -> Self {
        Self {
            max_pending_notifications: 120,
            subscriber_queue_floor: 100,
        }
    }
}
