//! Wire formats spoken with calendar clients, peers, and Exchange.

pub mod dav;
pub mod ews;
pub mod ical;
pub mod mapi;
pub mod merged;
pub mod peer;
pub mod xml;
