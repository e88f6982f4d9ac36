//! # Register Store
//!
//! An in-process registry of named values ("registers"), each backed by an
//! optional read handler and/or write handler, with throttled per-subscriber
//! change notifications.
//!
//! ## Core Concepts
//!
//! - **Registers**: named slots; readability and writeability follow from
//!   which handlers are attached
//! - **Handlers**: owned closures that read or write the backing state
//! - **Subscriptions**: per-subscriber callbacks invoked after a register
//!   changes, rate-limited by a minimum delivery interval
//!
//! The store has no network, persistence or protocol awareness; a remote
//! exposure layer translates wire requests into these calls and maps the
//! error taxonomy back to its own status codes. All operations run under a
//! single exclusive lock, so handlers and observer callbacks must never
//! call back into the same store.
//!
//! ## Example
//!
//! ```
//! use regstore::{RegStore, Value, WriteOutcome};
//! use std::sync::{Arc, Mutex};
//!
//! let store = RegStore::new();
//! let color = Arc::new(Mutex::new(Value::from("red")));
//!
//! let read_state = Arc::clone(&color);
//! let write_state = Arc::clone(&color);
//! store.add(
//!     "color",
//!     Some(Box::new(move || Ok(read_state.lock().unwrap().clone()))),
//!     Some(Box::new(move |value: &Value| {
//!         *write_state.lock().unwrap() = value.clone();
//!         Ok(WriteOutcome::Changed)
//!     })),
//! )?;
//!
//! store.set("color", &Value::from("blue"))?;
//! assert_eq!(store.get("color")?, Value::from("blue"));
//! # Ok::<(), regstore::RegError>(())
//! ```

pub mod error;
pub mod registers;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use error::{RegError, Result};
pub use registers::{ReadHandler, Register, WriteHandler};
pub use store::RegStore;
pub use subscriptions::{ObserveCallback, SubscriptionInfo, SubscriptionTable};
pub use types::{RegisterFlags, RegisterInfo, Value, WriteOutcome};
