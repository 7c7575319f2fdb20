/*!
One party's end-to-end post-processing run.

Stages, in order:

1. abort early if the prior QBER estimate is already above the threshold;
2. Cascade reconciliation;
3. key verification (a mismatch aborts);
4. QBER check on the combined estimate;
5. final length from the entropy budget and the compression factor;
6. the initiator draws the Toeplitz seed and sends it (`PA_SEED`);
7. both parties compress their keys.

Policy aborts come back as a [`QkdResult`] with `success == false`. Channel
failures, desynchronization and broken contracts come back as errors.
*/

use std::thread;

use rand::Rng;
use rand::rngs::ThreadRng;
use tracing::info;

use crate::channel::{AuthenticatedChannel, MemoryTransport, MessageChannel};
use crate::contract_err;
use crate::core::{
    bits::KeyBits,
    config::{PrivacyConfig, ProtocolConfig},
    error::{Error, Result},
    message::{MessageType, Payload},
    security::PresharedKey,
    state::{Role, SessionState},
};
use crate::privacy::{PrivacyAmplifier, compute_final_key_length, effective_qber, generate_toeplitz_seed};
use crate::protocol::result::{AbortReason, QkdResult};
use crate::reconciliation::CascadeReconciliator;
use crate::verification::KeyVerifier;

/// Final key length after the safety factor
pub fn final_key_length(
    reconciled_length: usize,
    qber: f64,
    leakage_ec: u64,
    leakage_ver: u64,
    privacy: &PrivacyConfig,
) -> usize {
    let budget = compute_final_key_length(
        reconciled_length,
        qber,
        leakage_ec,
        leakage_ver,
        privacy.security_parameter,
    );
    (budget as f64 * privacy.compression_factor).floor() as usize
}

/// Post-processing driver for one party
#[derive(Debug)]
pub struct QkdSession<C: MessageChannel, R: Rng = ThreadRng> {
    channel: C,
    role: Role,
    config: ProtocolConfig,
    rng: R,
    state: SessionState,
}

impl<C: MessageChannel> QkdSession<C, ThreadRng> {
    /// Create a session drawing salts and seeds from the thread RNG
    pub fn new(channel: C, role: Role, config: ProtocolConfig) -> Result<Self> {
        Self::with_rng(channel, role, config, rand::rng())
    }
}

impl<C: MessageChannel, R: Rng> QkdSession<C, R> {
    /// Create a session with an explicit randomness source
    pub fn with_rng(channel: C, role: Role, config: ProtocolConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            channel,
            role,
            config,
            rng,
            state: SessionState::New,
        })
    }

    /// This party's role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Run configuration
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Current stage
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Borrow the channel
    pub fn channel(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Turn a sifted key into a secret key.
    ///
    /// `prior_qber` is the public estimate from the sifting layer; both
    /// parties must pass the same value.
    pub fn run(&mut self, raw_key: KeyBits, prior_qber: Option<f64>) -> Result<QkdResult> {
        if self.state != SessionState::New {
            return contract_err!("session already ran (state {})", self.state);
        }
        let threshold = self.config.privacy.qber_threshold;
        let n = raw_key.len();
        info!(role = %self.role, raw_bits = n, ?prior_qber, "starting post-processing");

        if let Some(prior) = prior_qber {
            if prior > threshold {
                return Ok(self.abort(AbortReason::QberTooHigh { qber: prior, threshold }, prior, 0, 0, n));
            }
        }
        if n == 0 {
            let minimum = self.config.privacy.min_key_length;
            let qber = prior_qber.unwrap_or(0.0);
            return Ok(self.abort(AbortReason::KeyTooShort { length: 0, minimum }, qber, 0, 0, 0));
        }

        self.state = SessionState::Reconciling;
        let mut cascade = CascadeReconciliator::new(self.role, raw_key, &self.config.cascade, prior_qber)?;
        let leakage_ec = cascade.reconcile(&mut self.channel)?;
        let errors = cascade.errors_corrected();
        let key = cascade.into_key();

        self.state = SessionState::Verifying;
        let verifier = KeyVerifier::new(&self.config.verification, self.role);
        let matched = verifier.verify(&mut self.channel, &key, &mut self.rng)?;
        let leakage_ver = verifier.leakage();
        let leakage = leakage_ec + leakage_ver;
        let qber = effective_qber(prior_qber, n, errors);

        if !matched {
            return Ok(self.abort(AbortReason::VerificationFailed, qber, leakage, errors, n));
        }
        if qber > threshold {
            return Ok(self.abort(AbortReason::QberTooHigh { qber, threshold }, qber, leakage, errors, n));
        }

        let final_length = final_key_length(n, qber, leakage_ec, leakage_ver, &self.config.privacy);
        let minimum = self.config.privacy.min_key_length;
        if final_length < minimum {
            return Ok(self.abort(
                AbortReason::KeyTooShort { length: final_length, minimum },
                qber,
                leakage,
                errors,
                n,
            ));
        }

        self.state = SessionState::Amplifying;
        let seed = self.exchange_seed(n, final_length)?;
        let secret_key = PrivacyAmplifier::new().amplify(&key, &seed, final_length)?;

        self.state = SessionState::Completed;
        info!(
            role = %self.role,
            qber,
            leakage,
            errors_corrected = errors,
            final_bits = final_length,
            "post-processing completed"
        );
        Ok(QkdResult::completed(secret_key, qber, leakage, errors, n))
    }

    fn exchange_seed(&mut self, key_length: usize, final_length: usize) -> Result<Vec<u8>> {
        let expected = PrivacyAmplifier::seed_length(key_length, final_length);
        match self.role {
            Role::Initiator => {
                let seed = generate_toeplitz_seed(&mut self.rng, key_length, final_length);
                self.channel.send(MessageType::PaSeed, Payload::Bits(seed.clone()))?;
                Ok(seed)
            }
            Role::Responder => {
                let seed = self.channel.expect(MessageType::PaSeed)?.into_bits()?;
                if seed.len() != expected {
                    return Err(Error::ContractViolation(format!(
                        "received seed of {} bits, expected {}",
                        seed.len(),
                        expected
                    )));
                }
                Ok(seed)
            }
        }
    }

    fn abort(
        &mut self,
        reason: AbortReason,
        qber: f64,
        leakage: u64,
        errors: usize,
        reconciled_length: usize,
    ) -> QkdResult {
        self.state = SessionState::Aborted;
        info!(role = %self.role, %reason, "post-processing aborted");
        QkdResult::aborted(reason, qber, leakage, errors, reconciled_length)
    }
}

/// Run both parties on two threads over an in-memory authenticated link.
///
/// Returns the initiator's and the responder's results.
pub fn run_local_pair(
    config: &ProtocolConfig,
    psk: &PresharedKey,
    initiator_key: KeyBits,
    responder_key: KeyBits,
    prior_qber: Option<f64>,
) -> Result<(QkdResult, QkdResult)> {
    let (a, b) = MemoryTransport::pair();
    let initiator_channel = AuthenticatedChannel::new(a, psk, Role::Initiator)?;
    let responder_channel = AuthenticatedChannel::new(b, psk, Role::Responder)?;

    thread::scope(|scope| {
        let responder = scope.spawn(|| {
            QkdSession::new(responder_channel, Role::Responder, config.clone())?
                .run(responder_key, prior_qber)
        });
        let initiator = QkdSession::new(initiator_channel, Role::Initiator, config.clone())
            .and_then(|mut s| s.run(initiator_key, prior_qber));
        let responder = match responder.join() {
            Ok(r) => r,
            Err(_) => return contract_err!("responder thread panicked"),
        };
        Ok((initiator?, responder?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CascadeConfig;

    fn psk() -> PresharedKey {
        PresharedKey::new(b"session test pre-shared key 0001".to_vec()).unwrap()
    }

    fn pattern(n: usize) -> Vec<u8> {
        (0..n).map(|i| ((i * 37 + i / 3) % 5 < 2) as u8).collect()
    }

    #[test]
    fn test_final_key_length_applies_factor() {
        let privacy = PrivacyConfig::default().with_compression_factor(0.5);
        let full = compute_final_key_length(2000, 0.0, 100, 128, 1e-12);
        assert_eq!(final_key_length(2000, 0.0, 100, 128, &privacy), full / 2);
    }

    #[test]
    fn test_identical_keys_succeed() {
        let key = pattern(1024);
        let (alice, bob) = run_local_pair(
            &ProtocolConfig::default(),
            &psk(),
            KeyBits::new(key.clone()).unwrap(),
            KeyBits::new(key).unwrap(),
            Some(0.0),
        )
        .unwrap();

        assert!(alice.success && bob.success);
        assert_eq!(alice.secret_key, bob.secret_key);
        assert_eq!(alice.errors_corrected, 0);
        assert_eq!(alice.leakage, bob.leakage);
        assert!(alice.key_length > 0);
    }

    #[test]
    fn test_prior_qber_above_threshold_aborts_without_exchange() {
        let key = pattern(256);
        let (alice, bob) = run_local_pair(
            &ProtocolConfig::default(),
            &psk(),
            KeyBits::new(key.clone()).unwrap(),
            KeyBits::new(key).unwrap(),
            Some(0.2),
        )
        .unwrap();
        for r in [alice, bob] {
            assert!(!r.success);
            assert_eq!(r.leakage, 0);
            assert!(matches!(r.abort_reason, Some(AbortReason::QberTooHigh { .. })));
        }
    }

    #[test]
    fn test_short_key_aborts() {
        let key = pattern(64);
        let config = ProtocolConfig {
            cascade: CascadeConfig::default().with_initial_block_size(8),
            ..ProtocolConfig::default()
        };
        let (alice, bob) = run_local_pair(
            &config,
            &psk(),
            KeyBits::new(key.clone()).unwrap(),
            KeyBits::new(key).unwrap(),
            None,
        )
        .unwrap();
        assert_eq!(
            alice.abort_reason,
            Some(AbortReason::KeyTooShort { length: 0, minimum: 100 })
        );
        assert_eq!(alice.abort_reason, bob.abort_reason);
    }

    #[test]
    fn test_final_key_below_default_minimum_aborts() {
        // 300 - 11 block parities - 128 tag bits - 79.7 margin, times 0.8
        let key = pattern(300);
        let (alice, bob) = run_local_pair(
            &ProtocolConfig::default(),
            &psk(),
            KeyBits::new(key.clone()).unwrap(),
            KeyBits::new(key).unwrap(),
            Some(0.0),
        )
        .unwrap();
        assert_eq!(
            alice.abort_reason,
            Some(AbortReason::KeyTooShort { length: 64, minimum: 100 })
        );
        assert_eq!(alice.leakage, 11 + 128);
        assert!(alice.secret_key.is_empty() && bob.secret_key.is_empty());

        let config = ProtocolConfig {
            privacy: PrivacyConfig::default().with_min_key_length(64),
            ..ProtocolConfig::default()
        };
        let key = pattern(300);
        let (alice, bob) = run_local_pair(
            &config,
            &psk(),
            KeyBits::new(key.clone()).unwrap(),
            KeyBits::new(key).unwrap(),
            Some(0.0),
        )
        .unwrap();
        assert!(alice.success && bob.success);
        assert_eq!(alice.key_length, 64);
    }

    #[test]
    fn test_empty_key_is_a_policy_abort() {
        let (alice, bob) = run_local_pair(
            &ProtocolConfig::default(),
            &psk(),
            KeyBits::default(),
            KeyBits::default(),
            None,
        )
        .unwrap();
        for r in [alice, bob] {
            assert!(!r.success);
            assert_eq!(r.leakage, 0);
            assert_eq!(r.reconciled_length, 0);
            assert_eq!(
                r.abort_reason,
                Some(AbortReason::KeyTooShort { length: 0, minimum: 100 })
            );
        }
    }

    #[test]
    fn test_session_runs_once() {
        let (a, _b) = MemoryTransport::pair();
        let channel = AuthenticatedChannel::new(a, &psk(), Role::Initiator).unwrap();
        let mut session = QkdSession::new(channel, Role::Initiator, ProtocolConfig::default()).unwrap();
        let key = KeyBits::new(pattern(32)).unwrap();
        let r = session.run(key.clone(), Some(0.5)).unwrap();
        assert!(!r.success);
        assert_eq!(session.state(), SessionState::Aborted);
        assert!(session.run(key, None).unwrap_err().is_contract_violation());
    }
}
