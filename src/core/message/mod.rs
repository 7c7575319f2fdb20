/*!
Message handling for the QKD protocol.

Message types, typed payloads with their canonical encoding, and the
transport frame.
*/

pub mod types;
pub mod format;

// Re-export commonly used items
pub use types::{MessageType, PayloadKind};
pub use format::{Frame, Message, Payload};
