pub mod app;
pub mod error;
pub mod registry;
pub mod state;
pub mod store;
