/*!
Outcome of one post-processing run.
*/

use std::fmt;

use crate::core::bits::KeyBits;

/// Why a run ended without a key
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum AbortReason {
    /// Error rate above the security threshold
    QberTooHigh {
        /// Estimated QBER
        qber: f64,
        /// Configured threshold
        threshold: f64,
    },
    /// Reconciled keys still differ
    VerificationFailed,
    /// Nothing (or too little) left after privacy amplification
    KeyTooShort {
        /// Computed final length
        length: usize,
        /// Configured minimum
        minimum: usize,
    },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::QberTooHigh { qber, threshold } => {
                write!(f, "QBER {:.4} exceeds threshold {:.4}", qber, threshold)
            }
            AbortReason::VerificationFailed => write!(f, "reconciled keys do not match"),
            AbortReason::KeyTooShort { length, minimum } => {
                write!(f, "final key length {} below minimum {}", length, minimum)
            }
        }
    }
}

/// Final record of a run.
///
/// `success == false` means the caller must discard everything and may start
/// over with fresh raw material; `secret_key` is empty in that case.
#[derive(Debug, Clone, PartialEq)]
pub struct QkdResult {
    /// Distilled secret key
    pub secret_key: KeyBits,
    /// QBER used for the security decision
    pub qber: f64,
    /// Length of `secret_key`
    pub key_length: usize,
    /// Bits disclosed by reconciliation and verification
    pub leakage: u64,
    /// Whether a key was produced
    pub success: bool,
    /// Human-readable abort reason
    pub error_message: Option<String>,
    /// Typed abort reason
    pub abort_reason: Option<AbortReason>,
    /// Bits corrected by Cascade
    pub errors_corrected: usize,
    /// Length of the reconciled key
    pub reconciled_length: usize,
}

impl QkdResult {
    pub(crate) fn completed(
        secret_key: KeyBits,
        qber: f64,
        leakage: u64,
        errors_corrected: usize,
        reconciled_length: usize,
    ) -> Self {
        Self {
            key_length: secret_key.len(),
            secret_key,
            qber,
            leakage,
            success: true,
            error_message: None,
            abort_reason: None,
            errors_corrected,
            reconciled_length,
        }
    }

    pub(crate) fn aborted(
        reason: AbortReason,
        qber: f64,
        leakage: u64,
        errors_corrected: usize,
        reconciled_length: usize,
    ) -> Self {
        Self {
            secret_key: KeyBits::default(),
            qber,
            key_length: 0,
            leakage,
            success: false,
            error_message: Some(reason.to_string()),
            abort_reason: Some(reason),
            errors_corrected,
            reconciled_length,
        }
    }
}
