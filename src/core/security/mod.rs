/*!
Security utilities for the QKD protocol.

Constant-time comparison and the channel MAC.
*/

// Constant-time operations to prevent timing attacks
pub mod constant_time;

// Keyed message authentication
pub mod mac;

// Re-export main components
pub use constant_time::{constant_time_eq, constant_time_eq_arrays, constant_time_eq_u128};
pub use mac::{ChannelKeys, PresharedKey, Tag, compute_tag};
