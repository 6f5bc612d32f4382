//! Error code constants
//!
//! Front ends map these strings to localized messages instead of parsing
//! error text.

/// Server unreachable or connection dropped
pub const ERR_TRANSPORT: &str = "ERR_TRANSPORT";

/// Server answered with a status the client does not handle
pub const ERR_UNEXPECTED_STATUS: &str = "ERR_UNEXPECTED_STATUS";

/// Response body could not be decoded
pub const ERR_DECODE: &str = "ERR_DECODE";

/// Drive list did not carry one entry per slot
pub const ERR_INVALID_SNAPSHOT: &str = "ERR_INVALID_SNAPSHOT";

/// Slot index outside 1..=8
pub const ERR_INVALID_SLOT: &str = "ERR_INVALID_SLOT";

/// Local file could not be read
pub const ERR_IO: &str = "ERR_IO";

/// Client configuration is unusable
pub const ERR_CONFIG: &str = "ERR_CONFIG";
