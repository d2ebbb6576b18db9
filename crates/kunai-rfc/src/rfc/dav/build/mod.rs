//! WebDAV request bodies.

mod proppatch;

pub use proppatch::build_proppatch;
