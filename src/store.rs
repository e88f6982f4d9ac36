//! Main store struct: a keyed map of registers behind one exclusive lock.
//!
//! Every public operation holds the lock for its full duration, including
//! handler and observer callback invocation, so each operation is atomic
//! with respect to the others. The trade-off is a hard contract: handlers
//! and observer callbacks must never call back into the same store. Debug
//! builds detect that and panic with a clear message instead of
//! deadlocking; a reentrant handler surfaces as `RegError::Unknown`.

use crate::error::{RegError, Result};
use crate::registers::{ReadHandler, Register, WriteHandler};
use crate::subscriptions::{ObserveCallback, SubscriptionInfo};
use crate::types::{RegisterInfo, Value, WriteOutcome};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace, warn};

#[cfg(debug_assertions)]
thread_local! {
    static LOCK_HELD: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Marks the store lock as held by the current thread for the duration of
/// one public operation. Catches callback reentrancy in debug builds.
struct ReentrancyGuard;

impl ReentrancyGuard {
    fn enter() -> Self {
        #[cfg(debug_assertions)]
        LOCK_HELD.with(|held| {
            if held.get() {
                panic!("reentrant call into RegStore from a handler or observer callback");
            }
            held.set(true);
        });
        ReentrancyGuard
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        LOCK_HELD.with(|held| held.set(false));
    }
}

/// The register store.
///
/// Maps unique string keys to [`Register`]s and owns their subscription
/// tables. All operations are synchronous call/return; the store never
/// blocks on I/O, spawns threads or runs timers. Throttling is checked
/// lazily at dispatch time against the monotonic clock, so a register that
/// is never written or explicitly notified never triggers a subscriber.
pub struct RegStore {
    registers: Mutex<BTreeMap<String, Register>>,
}

impl RegStore {
    pub fn new() -> Self {
        Self {
            registers: Mutex::new(BTreeMap::new()),
        }
    }

    // --- Register CRUD ---

    /// Add a register. Both handlers may be absent (inert placeholder).
    ///
    /// Fails with `KeyExists` if the key is already present.
    pub fn add(
        &self,
        key: impl Into<String>,
        reader: Option<ReadHandler>,
        writer: Option<WriteHandler>,
    ) -> Result<()> {
        let _guard = ReentrancyGuard::enter();
        let key = key.into();
        let mut registers = self.registers.lock();
        if registers.contains_key(&key) {
            return Err(RegError::KeyExists(key));
        }
        let register = Register::new(key.clone(), reader, writer);
        debug!(%key, flags = %register.flags(), "added register");
        registers.insert(key, register);
        Ok(())
    }

    /// Remove a register together with all its subscriptions.
    /// Returns false if the key is absent.
    pub fn delete(&self, key: &str) -> bool {
        let _guard = ReentrancyGuard::enter();
        let mut registers = self.registers.lock();
        match registers.remove(key) {
            Some(register) => {
                debug!(
                    %key,
                    subscriptions = register.subscriptions.len(),
                    "deleted register"
                );
                true
            }
            None => false,
        }
    }

    /// Read a register's current value via its read handler.
    pub fn get(&self, key: &str) -> Result<Value> {
        let _guard = ReentrancyGuard::enter();
        let mut registers = self.registers.lock();
        let register = registers
            .get_mut(key)
            .ok_or_else(|| RegError::InvalidKey(key.to_string()))?;
        register.read()
    }

    /// Write a value to a register via its write handler.
    ///
    /// A successful write that changed state dispatches to due subscribers.
    /// The read handler is authoritative for the notification payload; a
    /// write-only register notifies with the supplied value instead. A
    /// write the handler accepted without any actual change reports `Ok`
    /// but skips dispatch.
    pub fn set(&self, key: &str, value: &Value) -> Result<()> {
        let _guard = ReentrancyGuard::enter();
        let mut registers = self.registers.lock();
        let register = registers
            .get_mut(key)
            .ok_or_else(|| RegError::InvalidKey(key.to_string()))?;
        match register.write(value)? {
            WriteOutcome::Unchanged => {
                trace!(%key, "write accepted without change, skipping dispatch");
                Ok(())
            }
            WriteOutcome::Changed => {
                let payload = match register.read() {
                    Ok(current) => current,
                    Err(RegError::NotReadable(_)) => value.clone(),
                    Err(err) => {
                        warn!(%key, %err, "read-back after write failed, notifying with written value");
                        value.clone()
                    }
                };
                let delivered = register.subscriptions.dispatch(&payload);
                trace!(%key, delivered, "dispatched after write");
                Ok(())
            }
        }
    }

    /// Snapshot all registers in key order.
    ///
    /// With `include_values`, readable registers are read through their
    /// handler; a failing reader leaves that entry's value empty and never
    /// aborts the rest of the listing. With `subscriber` given, each entry
    /// reports that identity's subscription, if any.
    pub fn list(&self, subscriber: Option<&str>, include_values: bool) -> Vec<RegisterInfo> {
        let _guard = ReentrancyGuard::enter();
        let mut registers = self.registers.lock();
        let mut out = Vec::with_capacity(registers.len());
        for (name, register) in registers.iter_mut() {
            let flags = register.flags();
            let value = if include_values && flags.readable {
                match register.read() {
                    Ok(value) => Some(value),
                    Err(err) => {
                        warn!(key = %name, %err, "skipping value in listing");
                        None
                    }
                }
            } else {
                None
            };
            out.push(RegisterInfo {
                name: name.clone(),
                flags,
                value,
                subscription: subscriber.and_then(|id| register.subscriptions.query(id)),
            });
        }
        out
    }

    // --- Subscriptions ---

    /// Install or replace a subscription on a register.
    ///
    /// Returns false if the key is absent. Replacement resets the throttle,
    /// so the first delivery after an observe is never suppressed.
    pub fn observe(
        &self,
        key: &str,
        subscriber: impl Into<String>,
        callback: ObserveCallback,
        min_interval: Duration,
    ) -> bool {
        let _guard = ReentrancyGuard::enter();
        let mut registers = self.registers.lock();
        let Some(register) = registers.get_mut(key) else {
            return false;
        };
        let subscriber = subscriber.into();
        debug!(%key, %subscriber, ?min_interval, "subscription installed");
        register.subscriptions.observe(subscriber, callback, min_interval);
        true
    }

    /// Remove a subscription. Returns false if the key or subscription is
    /// absent.
    pub fn unobserve(&self, key: &str, subscriber: &str) -> bool {
        let _guard = ReentrancyGuard::enter();
        let mut registers = self.registers.lock();
        let Some(register) = registers.get_mut(key) else {
            return false;
        };
        let removed = register.subscriptions.unobserve(subscriber);
        if removed {
            debug!(%key, %subscriber, "subscription removed");
        }
        removed
    }

    /// Look up a subscription's throttle state. Read-only.
    pub fn query_subscription(&self, key: &str, subscriber: &str) -> Option<SubscriptionInfo> {
        let _guard = ReentrancyGuard::enter();
        let registers = self.registers.lock();
        registers.get(key)?.subscriptions.query(subscriber)
    }

    /// Number of subscriptions on a register; 0 if the key is absent.
    pub fn subscription_count(&self, key: &str) -> usize {
        let _guard = ReentrancyGuard::enter();
        let registers = self.registers.lock();
        registers
            .get(key)
            .map(|register| register.subscriptions.len())
            .unwrap_or(0)
    }

    // --- Notification ---

    /// Read the register's current value and dispatch it to due
    /// subscribers, independent of any write. Used when an external event
    /// changed underlying state the store does not poll.
    pub fn notify(&self, key: &str) -> Result<()> {
        let _guard = ReentrancyGuard::enter();
        let mut registers = self.registers.lock();
        let register = registers
            .get_mut(key)
            .ok_or_else(|| RegError::InvalidKey(key.to_string()))?;
        let delivered = Self::notify_register(register)?;
        trace!(%key, delivered, "dispatched on notify");
        Ok(())
    }

    /// Notify several registers under a single lock acquisition.
    /// Per-key failures are logged and skipped.
    pub fn notify_many<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _guard = ReentrancyGuard::enter();
        let mut registers = self.registers.lock();
        for key in keys {
            let key = key.as_ref();
            match registers.get_mut(key) {
                Some(register) => {
                    if let Err(err) = Self::notify_register(register) {
                        debug!(%key, %err, "notify skipped");
                    }
                }
                None => debug!(%key, "notify skipped, no such register"),
            }
        }
    }

    fn notify_register(register: &mut Register) -> Result<usize> {
        let value = register.read()?;
        Ok(register.subscriptions.dispatch(&value))
    }

    // --- Introspection ---

    pub fn len(&self) -> usize {
        let _guard = ReentrancyGuard::enter();
        self.registers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        let _guard = ReentrancyGuard::enter();
        self.registers.lock().contains_key(key)
    }
}

impl Default for RegStore {
    fn default() -> Self {
        Self::new()
    }
}
