//! Cross-crate integration tests for the kunai node.

mod exchange;
mod helpers;
mod http_api;
mod orchestrator;
mod sync_queue;
