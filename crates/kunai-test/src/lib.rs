//! kunai free/busy federation node - integration test support.
//!
//! This crate re-exports the workspace crates so integration tests can use
//! `kunai_test::` paths.

#![allow(ambiguous_glob_reexports)]

pub mod component {
    // Re-export core and service modules at the component level
    pub use kunai_core::*;
    pub use kunai_service::*;

    // Re-export config from core plus the app's registry assembly
    pub mod config {
        pub use kunai_app::registry::{build_registry, server_lookup};
        pub use kunai_core::config::*;
    }
}

// Re-export top-level modules for convenience
pub mod app {
    pub use kunai_app::*;

    pub mod api {
        pub use kunai_app::app::api::*;
    }
}

pub use kunai_rfc as rfc;
