/*!
Key verification with a polynomial universal hash.

- [`gf2n`]: binary extension field arithmetic
- [`polynomial_hash`]: the salted hash of a key
- [`verifier`]: the two-party exchange
*/

pub mod gf2n;
pub mod polynomial_hash;
pub mod verifier;

pub use gf2n::BinaryField;
pub use polynomial_hash::{collision_bound, polynomial_hash};
pub use verifier::KeyVerifier;
