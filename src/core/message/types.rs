/*!
Message types for the QKD protocol.

Each message carries a fixed header string on the wire; the header decides
the payload shape.
*/

use std::fmt;

/// Protocol message types
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Binary search: indices whose parity the initiator wants
    CascadeRequest = 0x01,
    /// Binary search: responder's parity of the requested indices
    CascadeParity = 0x02,
    /// Binary search: index the initiator corrected
    CascadeDone = 0x03,
    /// One parity per block of the current pass
    BlockParities = 0x04,
    /// End of a Cascade pass
    PassComplete = 0x05,
    /// Verification salt and hash
    KeyVerifySeed = 0x10,
    /// Verification outcome
    KeyVerifyResult = 0x11,
    /// Toeplitz seed for privacy amplification
    PaSeed = 0x20,
}

/// Shape of the payload carried by a message type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// No payload
    Empty,
    /// List of global indices
    Indices,
    /// One bit
    Bit,
    /// One global index
    Index,
    /// List of bits
    Bits,
    /// Salt and hash pair
    VerifySeed,
    /// Boolean
    Flag,
}

impl MessageType {
    /// All message types
    pub const ALL: [MessageType; 8] = [
        MessageType::CascadeRequest,
        MessageType::CascadeParity,
        MessageType::CascadeDone,
        MessageType::BlockParities,
        MessageType::PassComplete,
        MessageType::KeyVerifySeed,
        MessageType::KeyVerifyResult,
        MessageType::PaSeed,
    ];

    /// Convert a u8 value to a MessageType
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_u8() == value)
    }

    /// Get the u8 value of this MessageType
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Wire header string
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::CascadeRequest => "CASCADE_REQ",
            MessageType::CascadeParity => "CASCADE_PARITY",
            MessageType::CascadeDone => "CASCADE_DONE",
            MessageType::BlockParities => "BLOCK_PARITIES",
            MessageType::PassComplete => "PASS_COMPLETE",
            MessageType::KeyVerifySeed => "KEY_VERIFY_SEED",
            MessageType::KeyVerifyResult => "KEY_VERIFY_RESULT",
            MessageType::PaSeed => "PA_SEED",
        }
    }

    /// Parse a wire header string
    pub fn from_header(header: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == header)
    }

    /// Payload shape for this type
    pub fn payload_kind(self) -> PayloadKind {
        match self {
            MessageType::CascadeRequest => PayloadKind::Indices,
            MessageType::CascadeParity => PayloadKind::Bit,
            MessageType::CascadeDone => PayloadKind::Index,
            MessageType::BlockParities => PayloadKind::Bits,
            MessageType::PassComplete => PayloadKind::Empty,
            MessageType::KeyVerifySeed => PayloadKind::VerifySeed,
            MessageType::KeyVerifyResult => PayloadKind::Flag,
            MessageType::PaSeed => PayloadKind::Bits,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_conversion() {
        for t in MessageType::ALL {
            assert_eq!(MessageType::from_u8(t.as_u8()), Some(t));
            assert_eq!(MessageType::from_header(t.as_str()), Some(t));
        }
        assert_eq!(MessageType::from_u8(0x06), None);
        assert_eq!(MessageType::from_header("cascade_req"), None);
        assert_eq!(MessageType::from_header("HELLO"), None);
    }

    #[test]
    fn test_wire_headers() {
        assert_eq!(MessageType::CascadeRequest.to_string(), "CASCADE_REQ");
        assert_eq!(MessageType::KeyVerifySeed.to_string(), "KEY_VERIFY_SEED");
        assert_eq!(MessageType::PaSeed.to_string(), "PA_SEED");
    }

    #[test]
    fn test_payload_kinds() {
        assert_eq!(MessageType::PassComplete.payload_kind(), PayloadKind::Empty);
        assert_eq!(MessageType::BlockParities.payload_kind(), PayloadKind::Bits);
        assert_eq!(MessageType::PaSeed.payload_kind(), PayloadKind::Bits);
        assert_eq!(MessageType::CascadeDone.payload_kind(), PayloadKind::Index);
    }
}
