//! End-to-end QKD post-processing.
//!
//! A [`QkdSession`] drives one party through reconciliation, verification
//! and privacy amplification; [`QkdProtocolBuilder`] assembles one from a
//! configuration, a role, a pre-shared key and a transport.

// Result record
pub mod result;

// Pipeline driver
pub mod session;

// Builder
pub mod builder;

// Re-export for convenience
pub use builder::{QkdProtocolBuilder, initiator, responder};
pub use result::{AbortReason, QkdResult};
pub use session::{QkdSession, final_key_length, run_local_pair};
