/*!
Post-reconciliation key equality check.

The initiator draws a random non-zero salt, hashes its key and sends
`KEY_VERIFY_SEED(salt, hash)`. The responder hashes its own key at the same
salt and answers `KEY_VERIFY_RESULT(match)`. Both return the same verdict.
A mismatch is a normal outcome, not an error.
*/

use rand::Rng;
use tracing::debug;

use crate::channel::MessageChannel;
use crate::core::{
    bits::KeyBits,
    config::VerificationConfig,
    error::Result,
    message::{MessageType, Payload},
    security::constant_time_eq_u128,
    state::Role,
};
use crate::desync_err;
use crate::verification::{gf2n::BinaryField, polynomial_hash::polynomial_hash};

/// One party's side of the equality check
#[derive(Debug, Clone)]
pub struct KeyVerifier {
    field: BinaryField,
    role: Role,
}

impl KeyVerifier {
    /// Create a verifier for `role`
    pub fn new(config: &VerificationConfig, role: Role) -> Self {
        Self {
            field: BinaryField::new(config.tag_width),
            role,
        }
    }

    /// Bits revealed by one check
    pub fn leakage(&self) -> u64 {
        self.field.bits() as u64
    }

    /// Hash field in use
    pub fn field(&self) -> &BinaryField {
        &self.field
    }

    /// Draw a uniformly random non-zero salt
    pub fn draw_salt<R: Rng>(&self, rng: &mut R) -> u128 {
        loop {
            let salt = rng.random::<u128>() & self.field.mask();
            if salt != 0 {
                return salt;
            }
        }
    }

    /// Hash `key` at `salt`
    pub fn hash(&self, key: &KeyBits, salt: u128) -> u128 {
        polynomial_hash(&self.field, key, salt)
    }

    /// Run the check against the peer
    pub fn verify<C, R>(&self, channel: &mut C, key: &KeyBits, rng: &mut R) -> Result<bool>
    where
        C: MessageChannel + ?Sized,
        R: Rng,
    {
        let matched = match self.role {
            Role::Initiator => {
                let salt = self.draw_salt(rng);
                let hash = self.hash(key, salt);
                channel.send(MessageType::KeyVerifySeed, Payload::VerifySeed { salt, hash })?;
                channel.expect(MessageType::KeyVerifyResult)?.into_flag()?
            }
            Role::Responder => {
                let (salt, remote_hash) = channel.expect(MessageType::KeyVerifySeed)?.into_verify_seed()?;
                if salt == 0 || !self.field.contains(salt) || !self.field.contains(remote_hash) {
                    return desync_err!(
                        format!("non-zero {}-bit salt and hash", self.field.bits()),
                        format!("salt {:#x}", salt)
                    );
                }
                let matched = constant_time_eq_u128(self.hash(key, salt), remote_hash);
                channel.send(MessageType::KeyVerifyResult, Payload::Flag(matched))?;
                matched
            }
        };
        debug!(role = %self.role, matched, tag_bits = self.field.bits(), "key verification done");
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{AuthenticatedChannel, MemoryTransport};
    use crate::core::{config::TagWidth, error::Error, security::PresharedKey};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::thread;

    fn verify_pair(alice: Vec<u8>, bob: Vec<u8>, width: TagWidth) -> (bool, bool) {
        let psk = PresharedKey::new(vec![0x17; 32]).unwrap();
        let (a, b) = MemoryTransport::pair();
        let mut alice_ch = AuthenticatedChannel::new(a, &psk, Role::Initiator).unwrap();
        let mut bob_ch = AuthenticatedChannel::new(b, &psk, Role::Responder).unwrap();
        let config = VerificationConfig::default().with_tag_width(width);

        let bob_config = config.clone();
        let responder = thread::spawn(move || {
            let key = KeyBits::new(bob).unwrap();
            let mut rng = ChaCha20Rng::seed_from_u64(2);
            KeyVerifier::new(&bob_config, Role::Responder)
                .verify(&mut bob_ch, &key, &mut rng)
                .unwrap()
        });
        let key = KeyBits::new(alice).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let a = KeyVerifier::new(&config, Role::Initiator)
            .verify(&mut alice_ch, &key, &mut rng)
            .unwrap();
        (a, responder.join().unwrap())
    }

    #[test]
    fn test_equal_keys_match() {
        let key = vec![1, 0, 0, 1, 1, 1, 0, 1, 0, 0];
        assert_eq!(verify_pair(key.clone(), key, TagWidth::Bits128), (true, true));
    }

    #[test]
    fn test_different_keys_mismatch() {
        let a = vec![1, 0, 0, 1, 1, 1, 0, 1, 0, 0];
        let mut b = a.clone();
        b[6] ^= 1;
        assert_eq!(verify_pair(a.clone(), b.clone(), TagWidth::Bits128), (false, false));
        assert_eq!(verify_pair(a, b, TagWidth::Bits32), (false, false));
    }

    #[test]
    fn test_salt_is_non_zero_and_in_field() {
        let verifier = KeyVerifier::new(
            &VerificationConfig::default().with_tag_width(TagWidth::Bits32),
            Role::Initiator,
        );
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        for _ in 0..100 {
            let salt = verifier.draw_salt(&mut rng);
            assert_ne!(salt, 0);
            assert!(salt <= u32::MAX as u128);
        }
        assert_eq!(verifier.leakage(), 32);
    }

    #[test]
    fn test_responder_rejects_zero_salt() {
        let psk = PresharedKey::new(vec![0x17; 32]).unwrap();
        let (a, b) = MemoryTransport::pair();
        let mut alice_ch = AuthenticatedChannel::new(a, &psk, Role::Initiator).unwrap();
        let mut bob_ch = AuthenticatedChannel::new(b, &psk, Role::Responder).unwrap();
        alice_ch
            .send(MessageType::KeyVerifySeed, Payload::VerifySeed { salt: 0, hash: 0 })
            .unwrap();

        let key = KeyBits::new(vec![1, 0]).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let err = KeyVerifier::new(&VerificationConfig::default(), Role::Responder)
            .verify(&mut bob_ch, &key, &mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolDesync { .. }));
    }
}
