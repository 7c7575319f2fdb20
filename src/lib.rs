/*!
# QKD Protocol

Post-processing for quantum key distribution: two parties holding
correlated sifted keys turn them into an identical secret key over an
authenticated classical channel.

## Overview

A run goes through four stages:

- Cascade error reconciliation with binary search and backtracking
- Key verification with a polynomial universal hash over GF(2^n)
- Final key length from the Devetak-Winter bound with finite-size terms
- Privacy amplification with a Toeplitz matrix

Every classical message is authenticated with HMAC-SHA256 under keys
derived from a pre-shared secret; a tampered, replayed or reordered
message ends the run.

## Example

```no_run
use qkd_protocol::{KeyBits, PresharedKey, ProtocolConfig, Result, run_local_pair};

fn main() -> Result<()> {
    let psk = PresharedKey::new(b"a pre-shared secret of 32 bytes!".to_vec())?;
    let alice_key = KeyBits::new((0..2048).map(|i| (i % 3 == 0) as u8).collect())?;
    let mut bob_key = alice_key.clone();
    bob_key.flip(17)?;

    let (alice, bob) = run_local_pair(&ProtocolConfig::default(), &psk, alice_key, bob_key, Some(0.01))?;
    assert_eq!(alice.secret_key, bob.secret_key);
    println!("{} secret bits, {} disclosed", alice.key_length, alice.leakage);
    Ok(())
}
```
*/

// Core protocol components
pub mod core;

// Authenticated classical channel
pub mod channel;

// Cascade error reconciliation
pub mod reconciliation;

// Key verification
pub mod verification;

// Privacy amplification
pub mod privacy;

// Protocol implementation
pub mod protocol;

// Shorter paths for the core modules
pub use self::core::{bits, config, constants, error, message};

// Re-export commonly used types for convenience
pub use self::core::error::{Error, IntegrityError, Result};
pub use self::core::bits::KeyBits;
pub use self::core::config::{CascadeConfig, PrivacyConfig, ProtocolConfig, TagWidth, VerificationConfig};
pub use self::core::message::{Frame, Message, MessageType, Payload};
pub use self::core::state::{ReconciliationState, Role, SessionState};
pub use self::core::constants::{QBER_THRESHOLD, VERSION, sizes};
pub use self::core::security::PresharedKey;

// Re-export channel types
pub use channel::{AuthenticatedChannel, MemoryTransport, MessageChannel, TcpTransport, Transport};

// Re-export the protocol stages
pub use reconciliation::{CascadeReconciliator, CascadeStats};
pub use verification::KeyVerifier;
pub use privacy::{PrivacyAmplifier, compute_final_key_length};

// Re-export protocol builder
pub use protocol::builder::{QkdProtocolBuilder, initiator, responder};
pub use protocol::{AbortReason, QkdResult, QkdSession, run_local_pair};
