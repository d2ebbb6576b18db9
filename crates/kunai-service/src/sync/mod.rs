//! Push propagation of local availability changes.
//!
//! Each push provider gets a persisted [`SyncQueue`] and a [`Dispatcher`]
//! task draining it; [`SyncManager`] ties both to the provider registry.

mod dispatcher;
mod manager;
mod queue;

pub use dispatcher::Dispatcher;
pub use manager::SyncManager;
pub use queue::{SyncQueue, validate_account_id};
