//! Core types for the register store.

use crate::subscriptions::SubscriptionInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Register values are JSON documents. Collaborating layers translate
/// external key/value encodings to and from this type.
pub type Value = serde_json::Value;

/// What a write handler did with an accepted value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The backing state changed.
    Changed,
    /// The value was accepted but nothing actually changed. The store
    /// reports success to the caller and skips notification dispatch.
    Unchanged,
}

/// Readable/writeable flags, derived from handler presence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFlags {
    pub readable: bool,
    pub writeable: bool,
}

impl fmt::Display for RegisterFlags {
    /// Renders as `rw`, `r-`, `-w` or `--`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            if self.readable { 'r' } else { '-' },
            if self.writeable { 'w' } else { '-' }
        )
    }
}

/// Read-only snapshot of one register, produced by `RegStore::list`.
#[derive(Clone, Debug)]
pub struct RegisterInfo {
    pub name: String,
    pub flags: RegisterFlags,
    /// Current value; present only when values were requested, the register
    /// is readable and the read succeeded.
    pub value: Option<Value>,
    /// Subscription held by the queried subscriber, if any.
    pub subscription: Option<SubscriptionInfo>,
}

impl RegisterInfo {
    /// Whether the queried subscriber holds a subscription on this register.
    pub fn subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_render() {
        let rw = RegisterFlags {
            readable: true,
            writeable: true,
        };
        let ro = RegisterFlags {
            readable: true,
            writeable: false,
        };
        let wo = RegisterFlags {
            readable: false,
            writeable: true,
        };
        assert_eq!(rw.to_string(), "rw");
        assert_eq!(ro.to_string(), "r-");
        assert_eq!(wo.to_string(), "-w");
        assert_eq!(RegisterFlags::default().to_string(), "--");
    }
}
