/*!
Privacy amplification and the key-length budget.

- [`entropy`]: binary entropy and the final-length formula
- [`estimation`]: QBER estimates
- [`amplifier`]: Toeplitz compression
*/

pub mod amplifier;
pub mod entropy;
pub mod estimation;

pub use amplifier::{PrivacyAmplifier, generate_toeplitz_seed};
pub use entropy::{binary_entropy, compute_final_key_length};
pub use estimation::{effective_qber, estimate_qber_from_cascade};
