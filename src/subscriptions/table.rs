//! Subscription table and delivery throttling.

use super::types::{ObserveCallback, SubscriptionInfo};
use crate::types::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// Internal state of one subscriber's entry.
struct Subscription {
    callback: ObserveCallback,
    min_interval: Duration,
    next_eligible: Instant,
}

/// Per-register table of subscribers, keyed by subscriber id.
///
/// Subscriber ids are unique within the table; installing a subscription
/// for an existing id replaces it. Iteration (and therefore dispatch) runs
/// in subscriber-id order, which keeps delivery deterministic.
#[derive(Default)]
pub struct SubscriptionTable {
    entries: BTreeMap<String, Subscription>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace a subscription.
    ///
    /// Replacement resets eligibility to "now", so the first delivery after
    /// an observe is never throttled.
    pub fn observe(
        &mut self,
        subscriber: impl Into<String>,
        callback: ObserveCallback,
        min_interval: Duration,
    ) {
        self.entries.insert(
            subscriber.into(),
            Subscription {
                callback,
                min_interval,
                next_eligible: Instant::now(),
            },
        );
    }

    /// Remove a subscription. Returns false if the subscriber is unknown.
    pub fn unobserve(&mut self, subscriber: &str) -> bool {
        self.entries.remove(subscriber).is_some()
    }

    /// Look up a subscriber's throttle state without mutating it.
    pub fn query(&self, subscriber: &str) -> Option<SubscriptionInfo> {
        self.entries.get(subscriber).map(|sub| SubscriptionInfo {
            min_interval: sub.min_interval,
            next_eligible: sub.next_eligible,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver `value` to every due subscriber.
    ///
    /// A subscriber is due when `now >= next_eligible`; delivery advances
    /// its eligibility by its own interval. Subscribers still inside their
    /// interval are skipped silently, never queued. Returns the number of
    /// deliveries made.
    pub fn dispatch(&mut self, value: &Value) -> usize {
        self.dispatch_at(Instant::now(), value)
    }

    pub(crate) fn dispatch_at(&mut self, now: Instant, value: &Value) -> usize {
        let mut delivered = 0;
        for (subscriber, sub) in self.entries.iter_mut() {
            if now < sub.next_eligible {
                continue;
            }
            sub.next_eligible = now + sub.min_interval;
            (sub.callback)(value);
            trace!(%subscriber, "delivered register value");
            delivered += 1;
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recording() -> (Arc<Mutex<Vec<Value>>>, ObserveCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ObserveCallback = Box::new(move |value: &Value| sink.lock().push(value.clone()));
        (seen, callback)
    }

    #[test]
    fn test_first_delivery_is_never_throttled() {
        let mut table = SubscriptionTable::new();
        let (seen, callback) = recording();
        table.observe("node1", callback, Duration::from_secs(3600));

        let now = Instant::now();
        assert_eq!(table.dispatch_at(now, &Value::from("red")), 1);
        assert_eq!(seen.lock().as_slice(), &[Value::from("red")]);
    }

    #[test]
    fn test_throttle_suppresses_within_interval() {
        let mut table = SubscriptionTable::new();
        let (seen, callback) = recording();
        table.observe("node1", callback, Duration::from_millis(100));

        let base = Instant::now();
        assert_eq!(table.dispatch_at(base, &Value::from("a")), 1);
        assert_eq!(table.dispatch_at(base + Duration::from_millis(50), &Value::from("b")), 0);
        assert_eq!(table.dispatch_at(base + Duration::from_millis(150), &Value::from("c")), 1);
        assert_eq!(seen.lock().as_slice(), &[Value::from("a"), Value::from("c")]);
    }

    #[test]
    fn test_eligibility_advances_from_delivery_time() {
        let mut table = SubscriptionTable::new();
        let (_, callback) = recording();
        table.observe("node1", callback, Duration::from_millis(100));

        let base = Instant::now();
        table.dispatch_at(base + Duration::from_millis(30), &Value::from(1));
        let info = table.query("node1").unwrap();
        assert_eq!(info.next_eligible, base + Duration::from_millis(130));
    }

    #[test]
    fn test_next_eligible_is_monotonic() {
        let mut table = SubscriptionTable::new();
        let (_, callback) = recording();
        table.observe("node1", callback, Duration::from_millis(10));

        let base = Instant::now();
        let mut previous = table.query("node1").unwrap().next_eligible;
        for step in 0..20u64 {
            table.dispatch_at(base + Duration::from_millis(step * 7), &Value::from(step));
            let current = table.query("node1").unwrap().next_eligible;
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_zero_interval_delivers_every_time() {
        let mut table = SubscriptionTable::new();
        let (seen, callback) = recording();
        table.observe("node1", callback, Duration::ZERO);

        let base = Instant::now();
        for step in 0..5u64 {
            assert_eq!(table.dispatch_at(base + Duration::from_millis(step), &Value::from(step)), 1);
        }
        assert_eq!(seen.lock().len(), 5);
    }

    #[test]
    fn test_reobserve_replaces_and_resets_eligibility() {
        let mut table = SubscriptionTable::new();
        let (first, callback) = recording();
        table.observe("node1", callback, Duration::from_secs(3600));

        let base = Instant::now();
        table.dispatch_at(base, &Value::from("early"));
        // Throttled for an hour now, but re-observing resets that.
        let (second, callback) = recording();
        table.observe("node1", callback, Duration::from_secs(3600));
        assert_eq!(table.dispatch_at(Instant::now(), &Value::from("late")), 1);

        assert_eq!(first.lock().as_slice(), &[Value::from("early")]);
        assert_eq!(second.lock().as_slice(), &[Value::from("late")]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unobserve_stops_delivery() {
        let mut table = SubscriptionTable::new();
        let (seen, callback) = recording();
        table.observe("node1", callback, Duration::ZERO);

        assert!(table.unobserve("node1"));
        assert!(!table.unobserve("node1"));
        assert_eq!(table.dispatch_at(Instant::now(), &Value::from("x")), 0);
        assert!(seen.lock().is_empty());
        assert!(table.query("node1").is_none());
    }

    #[test]
    fn test_dispatch_order_follows_subscriber_ids() {
        let mut table = SubscriptionTable::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for id in ["zeta", "alpha", "mid"] {
            let log = Arc::clone(&order);
            table.observe(
                id,
                Box::new(move |_: &Value| log.lock().push(id)),
                Duration::ZERO,
            );
        }

        table.dispatch_at(Instant::now(), &Value::Null);
        assert_eq!(order.lock().as_slice(), &["alpha", "mid", "zeta"]);
    }
}
