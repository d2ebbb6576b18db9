/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_ROUTE_PREFIX: &str = const_str::concat!("/", API_ROUTE_COMPONENT);

pub const FB_ROUTE_COMPONENT: &str = "fb";
pub const FB_ROUTE_PREFIX: &str = const_str::concat!(API_ROUTE_PREFIX, "/", FB_ROUTE_COMPONENT);

pub const PEER_ROUTE_COMPONENT: &str = "peer";
pub const PEER_ROUTE_PATH: &str = const_str::concat!(FB_ROUTE_PREFIX, "/", PEER_ROUTE_COMPONENT);

pub const ADMIN_ROUTE_COMPONENT: &str = "admin";
pub const ADMIN_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", ADMIN_ROUTE_COMPONENT);

/// `PRODID` emitted on every generated iCalendar object.
pub const ICAL_PRODID: &str = "-//kunai//Free-Busy Federation//EN";

/// Seconds the sync dispatcher pauses a provider queue after a failed push.
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 60;

/// Upper bound on the size of a persisted sync queue file.
pub const MAX_QUEUE_FILE_BYTES: u64 = 10 * 1024;

/// Slot width used when talking to Exchange free/busy endpoints.
pub const EXCHANGE_FB_INTERVAL_MINUTES: u32 = 30;
