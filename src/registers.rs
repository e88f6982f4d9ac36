//! Register slots: named keys with optional read/write handlers.

use crate::error::{RegError, Result};
use crate::subscriptions::SubscriptionTable;
use crate::types::{RegisterFlags, Value, WriteOutcome};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Read handler: produces the register's current value.
///
/// Handlers own whatever context they need (typically an `Arc` to backing
/// state). A handler signalling domain validation failure returns
/// [`RegError::InvalidValue`]; anything it cannot classify is
/// [`RegError::Unknown`].
pub type ReadHandler = Box<dyn FnMut() -> Result<Value> + Send>;

/// Write handler: applies a proposed value to the backing state and reports
/// whether anything changed.
pub type WriteHandler = Box<dyn FnMut(&Value) -> Result<WriteOutcome> + Send>;

/// A named slot in the store.
///
/// Readability and writeability are derived from which handlers are
/// attached; a register with neither is a legal inert placeholder. The key
/// and handlers never change after creation; only the subscription table
/// mutates over the register's lifetime.
pub struct Register {
    key: String,
    reader: Option<ReadHandler>,
    writer: Option<WriteHandler>,
    pub(crate) subscriptions: SubscriptionTable,
}

impl Register {
    pub fn new(
        key: impl Into<String>,
        reader: Option<ReadHandler>,
        writer: Option<WriteHandler>,
    ) -> Self {
        Self {
            key: key.into(),
            reader,
            writer,
            subscriptions: SubscriptionTable::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn flags(&self) -> RegisterFlags {
        RegisterFlags {
            readable: self.reader.is_some(),
            writeable: self.writer.is_some(),
        }
    }

    /// Invoke the read handler.
    ///
    /// Fails with `NotReadable` if no reader is attached. A panicking
    /// handler is caught and mapped to `Unknown` so one faulty register
    /// cannot destabilize store-wide operations.
    pub fn read(&mut self) -> Result<Value> {
        let Register { key, reader, .. } = self;
        let Some(reader) = reader.as_mut() else {
            return Err(RegError::NotReadable(key.clone()));
        };
        match catch_unwind(AssertUnwindSafe(|| reader())) {
            Ok(result) => result,
            Err(payload) => Err(RegError::Unknown(format!(
                "read handler for \"{key}\" panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }

    /// Invoke the write handler with a proposed value.
    ///
    /// Fails with `NotWriteable` if no writer is attached; panics are
    /// mapped to `Unknown` as for [`Register::read`].
    pub fn write(&mut self, value: &Value) -> Result<WriteOutcome> {
        let Register { key, writer, .. } = self;
        let Some(writer) = writer.as_mut() else {
            return Err(RegError::NotWriteable(key.clone()));
        };
        match catch_unwind(AssertUnwindSafe(|| writer(value))) {
            Ok(result) => result,
            Err(payload) => Err(RegError::Unknown(format!(
                "write handler for \"{key}\" panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
