/*!
Run configuration for the QKD post-processing pipeline.

Each stage has its own section with defaults, `with_*` setters and a
`validate()` check. The authentication key is deliberately absent: it is
handed to the builder and never serialized.
*/

use crate::core::constants::{QBER_THRESHOLD, defaults};
use crate::core::error::{Error, Result};

/// Cascade reconciliation settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct CascadeConfig {
    /// Number of passes
    pub num_passes: usize,
    /// Explicit first-pass block size; derived from the QBER estimate when unset
    pub initial_block_size: Option<usize>,
    /// Shared permutation seed
    pub seed: u64,
    /// Upper bound on the doubled block size; unset means plain doubling
    pub max_block_size: Option<usize>,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            num_passes: defaults::NUM_PASSES,
            initial_block_size: None,
            seed: defaults::PERMUTATION_SEED,
            max_block_size: None,
        }
    }
}

impl CascadeConfig {
    /// Set the number of passes
    pub fn with_passes(mut self, num_passes: usize) -> Self {
        self.num_passes = num_passes;
        self
    }

    /// Force the first-pass block size
    pub fn with_initial_block_size(mut self, size: usize) -> Self {
        self.initial_block_size = Some(size);
        self
    }

    /// Set the shared permutation seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Stop doubling the block size at `size`
    pub fn with_max_block_size(mut self, size: usize) -> Self {
        self.max_block_size = Some(size);
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.num_passes == 0 {
            return Err(Error::InvalidConfig("at least one Cascade pass is required".into()));
        }
        if self.initial_block_size == Some(0) {
            return Err(Error::InvalidConfig("initial block size must be positive".into()));
        }
        if self.max_block_size == Some(0) {
            return Err(Error::InvalidConfig("maximum block size must be positive".into()));
        }
        Ok(())
    }
}

/// Width of the polynomial hash field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum TagWidth {
    /// GF(2^32)
    Bits32,
    /// GF(2^64)
    Bits64,
    /// GF(2^128)
    Bits128,
}

impl TagWidth {
    /// Parse a width in bits
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(TagWidth::Bits32),
            64 => Some(TagWidth::Bits64),
            128 => Some(TagWidth::Bits128),
            _ => None,
        }
    }

    /// Width in bits
    pub fn bits(self) -> u32 {
        match self {
            TagWidth::Bits32 => 32,
            TagWidth::Bits64 => 64,
            TagWidth::Bits128 => 128,
        }
    }
}

impl Default for TagWidth {
    fn default() -> Self {
        TagWidth::Bits128
    }
}

/// Key verification settings
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct VerificationConfig {
    /// Polynomial hash width
    pub tag_width: TagWidth,
}

impl VerificationConfig {
    /// Set the tag width
    pub fn with_tag_width(mut self, tag_width: TagWidth) -> Self {
        self.tag_width = tag_width;
        self
    }

    /// Bits disclosed by one verification
    pub fn leakage(&self) -> u64 {
        self.tag_width.bits() as u64
    }
}

/// Privacy amplification and abort policy settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct PrivacyConfig {
    /// Security parameter ε
    pub security_parameter: f64,
    /// Safety factor in (0, 1] applied to the computed length
    pub compression_factor: f64,
    /// Abort when the QBER exceeds this value
    pub qber_threshold: f64,
    /// Shortest final key that counts as a success
    pub min_key_length: usize,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            security_parameter: defaults::SECURITY_PARAMETER,
            compression_factor: defaults::COMPRESSION_FACTOR,
            qber_threshold: QBER_THRESHOLD,
            min_key_length: defaults::MIN_KEY_LENGTH,
        }
    }
}

impl PrivacyConfig {
    /// Set ε
    pub fn with_security_parameter(mut self, epsilon: f64) -> Self {
        self.security_parameter = epsilon;
        self
    }

    /// Set the compression safety factor
    pub fn with_compression_factor(mut self, factor: f64) -> Self {
        self.compression_factor = factor;
        self
    }

    /// Set the abort threshold
    pub fn with_qber_threshold(mut self, threshold: f64) -> Self {
        self.qber_threshold = threshold;
        self
    }

    /// Set the minimum final key length
    pub fn with_min_key_length(mut self, len: usize) -> Self {
        self.min_key_length = len;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if !(self.security_parameter > 0.0 && self.security_parameter < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "security parameter must lie in (0, 1), got {}",
                self.security_parameter
            )));
        }
        if !(self.compression_factor > 0.0 && self.compression_factor <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "compression factor must lie in (0, 1], got {}",
                self.compression_factor
            )));
        }
        if !(0.0..=0.5).contains(&self.qber_threshold) {
            return Err(Error::InvalidConfig(format!(
                "QBER threshold must lie in [0, 0.5], got {}",
                self.qber_threshold
            )));
        }
        if self.min_key_length == 0 {
            return Err(Error::InvalidConfig("minimum key length must be positive".into()));
        }
        Ok(())
    }
}

/// Complete configuration for one run
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtocolConfig {
    /// Reconciliation
    pub cascade: CascadeConfig,
    /// Key verification
    pub verification: VerificationConfig,
    /// Privacy amplification
    pub privacy: PrivacyConfig,
}

impl ProtocolConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for quiet links: few passes over large blocks
    pub fn low_noise() -> Self {
        Self {
            cascade: CascadeConfig::default().with_passes(4),
            ..Self::default()
        }
    }

    /// Preset for links close to the abort threshold
    pub fn high_noise() -> Self {
        Self {
            cascade: CascadeConfig::default().with_passes(8),
            privacy: PrivacyConfig::default().with_compression_factor(0.7),
            ..Self::default()
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.cascade.validate()?;
        self.privacy.validate()
    }
}
