//! Per-register change subscriptions with min-interval throttling.

mod table;
mod types;

pub use table::SubscriptionTable;
pub use types::{ObserveCallback, SubscriptionInfo};
