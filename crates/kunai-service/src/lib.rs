pub mod directory;
pub mod error;
pub mod provider;
pub mod query;
pub mod sync;
pub mod working_hours;
