/*!
Constants for the QKD protocol.

Frame sizes, key-derivation labels, security thresholds and configuration
defaults.
*/

/// Frame format version
pub const VERSION: u8 = 0x01;

/// Shor–Preskill QBER threshold above which no key can be distilled
pub const QBER_THRESHOLD: f64 = 0.11;

/// Size constants for the protocol
pub mod sizes {
    /// Frame prefix: version (1) + header length (2)
    pub const FRAME_PREFIX_SIZE: usize = 3;

    /// Longest header string accepted on the wire
    pub const MAX_HEADER_LEN: usize = 64;

    /// Largest frame body accepted on the wire (16 MB)
    pub const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

    /// HMAC-SHA256 tag size in bytes
    pub const TAG_SIZE: usize = 32;

    /// Derived MAC key size in bytes
    pub const MAC_KEY_SIZE: usize = 32;

    /// Shortest pre-shared secret accepted for authentication
    pub const MIN_PSK_SIZE: usize = 16;
}

/// Salt for HKDF derivation of the channel MAC keys
pub const HKDF_SALT: &[u8] = b"QKD-Protocol-v1-Channel-Auth";

/// HKDF info for the initiator-to-responder MAC key
pub const HKDF_INFO_I2R: &[u8] = b"mac initiator->responder";

/// HKDF info for the responder-to-initiator MAC key
pub const HKDF_INFO_R2I: &[u8] = b"mac responder->initiator";

/// Domain label mixed into every per-pass permutation seed
pub const PERMUTATION_DOMAIN: &[u8] = b"QKD-Protocol-v1-Cascade-Permutation";

/// Configuration defaults
pub mod defaults {
    /// Number of Cascade passes
    pub const NUM_PASSES: usize = 4;

    /// Shared permutation seed
    pub const PERMUTATION_SEED: u64 = 42;

    /// Polynomial-hash tag width in bits
    pub const TAG_BITS: u32 = 128;

    /// Security parameter for privacy amplification
    pub const SECURITY_PARAMETER: f64 = 1e-12;

    /// Safety factor applied to the computed final length
    pub const COMPRESSION_FACTOR: f64 = 0.8;

    /// Shortest final key that counts as a success
    pub const MIN_KEY_LENGTH: usize = 100;

    /// Block size used when the estimated QBER is zero
    pub const MAX_INITIAL_BLOCK_SIZE: usize = 64;

    /// Smallest Cascade block size
    pub const MIN_BLOCK_SIZE: usize = 4;

    /// Fallback block size divisor (`key_length / 50`)
    pub const FALLBACK_BLOCK_DIVISOR: usize = 50;

    /// Numerator of the optimal block size formula (`ceil(0.73 / qber)`)
    pub const OPTIMAL_BLOCK_FACTOR: f64 = 0.73;
}
