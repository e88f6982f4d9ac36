//! Subscription types for register change notifications.

use crate::types::Value;
use std::time::{Duration, Instant};

/// Observer callback: receives the register's current value on delivery.
/// No return value; delivery is fire-and-forget.
pub type ObserveCallback = Box<dyn FnMut(&Value) + Send>;

/// Throttle state of one subscription (query response).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionInfo {
    /// Minimum time between two deliveries to this subscriber.
    pub min_interval: Duration,
    /// Deliveries are suppressed before this instant. Monotonically
    /// non-decreasing across successful deliveries.
    pub next_eligible: Instant,
}
