//! Core components for the QKD protocol.
//!
//! Bit utilities, message formats, channel authentication, configuration
//! and error handling shared by every stage.

// Bit-level helpers and the key type
pub mod bits;

// Run configuration
pub mod config;

// Export message handling
pub mod message;

// Export security utilities
pub mod security;

// Roles and run states
pub mod state;

// Protocol constants
pub mod constants;

// Error handling
pub mod error;

// Re-exports for convenience
pub use self::bits::KeyBits;
pub use self::config::{CascadeConfig, PrivacyConfig, ProtocolConfig, TagWidth, VerificationConfig};
pub use self::error::{Error, IntegrityError, Result};
pub use self::message::{Message, MessageType, Payload};
pub use self::state::{ReconciliationState, Role, SessionState};
pub use self::constants::VERSION;
