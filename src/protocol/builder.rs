/*!
Protocol builder for the QKD protocol.

Collects the configuration, the role and the pre-shared key, then wraps a
transport into an authenticated session.
*/

use rand::Rng;
use rand::rngs::ThreadRng;

use crate::channel::{AuthenticatedChannel, Transport};
use crate::core::{
    config::{ProtocolConfig, TagWidth},
    error::{Error, Result},
    security::PresharedKey,
    state::Role,
};
use crate::protocol::session::QkdSession;

/// Builder for QKD sessions
#[derive(Debug, Clone)]
pub struct QkdProtocolBuilder {
    /// Run configuration
    config: ProtocolConfig,

    /// Role (initiator or responder)
    role: Role,

    /// Authentication secret
    psk: Option<PresharedKey>,
}

impl QkdProtocolBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ProtocolConfig::default(),
            role: Role::Initiator,
            psk: None,
        }
    }

    /// Set the role
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set as initiator
    pub fn as_initiator(mut self) -> Self {
        self.role = Role::Initiator;
        self
    }

    /// Set as responder
    pub fn as_responder(mut self) -> Self {
        self.role = Role::Responder;
        self
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ProtocolConfig) -> Self {
        self.config = config;
        self
    }

    /// Use the preset for quiet links
    pub fn low_noise(mut self) -> Self {
        self.config = ProtocolConfig::low_noise();
        self
    }

    /// Use the preset for noisy links
    pub fn high_noise(mut self) -> Self {
        self.config = ProtocolConfig::high_noise();
        self
    }

    /// Number of Cascade passes
    pub fn with_passes(mut self, num_passes: usize) -> Self {
        self.config.cascade.num_passes = num_passes;
        self
    }

    /// First-pass block size
    pub fn with_initial_block_size(mut self, size: usize) -> Self {
        self.config.cascade.initial_block_size = Some(size);
        self
    }

    /// Cap on the doubled block size
    pub fn with_max_block_size(mut self, size: usize) -> Self {
        self.config.cascade.max_block_size = Some(size);
        self
    }

    /// Shared permutation seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.cascade.seed = seed;
        self
    }

    /// Verification hash width
    pub fn with_tag_width(mut self, tag_width: TagWidth) -> Self {
        self.config.verification.tag_width = tag_width;
        self
    }

    /// Security parameter ε
    pub fn with_security_parameter(mut self, epsilon: f64) -> Self {
        self.config.privacy.security_parameter = epsilon;
        self
    }

    /// Compression safety factor
    pub fn with_compression_factor(mut self, factor: f64) -> Self {
        self.config.privacy.compression_factor = factor;
        self
    }

    /// Pre-shared authentication key
    pub fn with_preshared_key(mut self, psk: PresharedKey) -> Self {
        self.psk = Some(psk);
        self
    }

    /// Current configuration
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Build a session over `transport` using the thread RNG
    pub fn build<T: Transport>(self, transport: T) -> Result<QkdSession<AuthenticatedChannel<T>>> {
        let (channel, role, config) = self.into_parts(transport)?;
        QkdSession::new(channel, role, config)
    }

    /// Build a session over `transport` with an explicit RNG
    pub fn build_with_rng<T: Transport, R: Rng>(
        self,
        transport: T,
        rng: R,
    ) -> Result<QkdSession<AuthenticatedChannel<T>, R>> {
        let (channel, role, config) = self.into_parts(transport)?;
        QkdSession::with_rng(channel, role, config, rng)
    }

    fn into_parts<T: Transport>(self, transport: T) -> Result<(AuthenticatedChannel<T>, Role, ProtocolConfig)> {
        self.config.validate()?;
        let psk = match self.psk {
            Some(psk) => psk,
            None => return Err(Error::InvalidConfig("pre-shared key not set".into())),
        };
        let channel = AuthenticatedChannel::new(transport, &psk, self.role)?;
        Ok((channel, self.role, self.config))
    }
}

impl Default for QkdProtocolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// Convenience functions

/// Initiator session with default settings
pub fn initiator<T: Transport>(
    transport: T,
    psk: PresharedKey,
) -> Result<QkdSession<AuthenticatedChannel<T>, ThreadRng>> {
    QkdProtocolBuilder::new().with_preshared_key(psk).build(transport)
}

/// Responder session with default settings
pub fn responder<T: Transport>(
    transport: T,
    psk: PresharedKey,
) -> Result<QkdSession<AuthenticatedChannel<T>, ThreadRng>> {
    QkdProtocolBuilder::new()
        .as_responder()
        .with_preshared_key(psk)
        .build(transport)
}
