use std::thread;

use qkd_protocol::{
    AuthenticatedChannel, CascadeConfig, CascadeReconciliator, KeyBits, MemoryTransport, Result, Role,
    TagWidth,
    bits::{apply_permutation, inverse_permutation, pack_bits, parity, permute, split_into_blocks, unpack_bits},
    core::security::{ChannelKeys, PresharedKey},
    privacy::{PrivacyAmplifier, compute_final_key_length},
    verification::{BinaryField, polynomial_hash},
};

use proptest::prelude::*;

// Strategy for generating bit vectors
fn bit_vectors(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0..2u8, 1..max_len)
}

// Strategy for generating field widths
fn tag_widths() -> impl Strategy<Value = TagWidth> {
    prop_oneof![
        Just(TagWidth::Bits32),
        Just(TagWidth::Bits64),
        Just(TagWidth::Bits128)
    ]
}

// Key, a second key of the same length, a final length and a Toeplitz seed
fn toeplitz_inputs() -> impl Strategy<Value = (Vec<u8>, Vec<u8>, usize, Vec<u8>)> {
    (1..64usize)
        .prop_flat_map(|n| (Just(n), 1..=n))
        .prop_flat_map(|(n, m)| {
            (
                prop::collection::vec(0..2u8, n),
                prop::collection::vec(0..2u8, n),
                Just(m),
                prop::collection::vec(0..2u8, n + m - 1),
            )
        })
}

// Key, error positions (at most 2% of the key) and a permutation seed
fn noisy_keys() -> impl Strategy<Value = (Vec<u8>, Vec<usize>, u64)> {
    (32..512usize).prop_flat_map(|n| {
        (
            prop::collection::vec(0..2u8, n),
            prop::sample::subsequence((0..n).collect::<Vec<_>>(), 1..=(n / 50).max(1)),
            any::<u64>(),
        )
    })
}

fn reconcile_pair(
    config: &CascadeConfig,
    alice: Vec<u8>,
    bob: Vec<u8>,
) -> Result<(CascadeReconciliator, CascadeReconciliator)> {
    let psk = PresharedKey::new(vec![0x21; 32])?;
    let (a, b) = MemoryTransport::pair();
    let mut alice_channel = AuthenticatedChannel::new(a, &psk, Role::Initiator)?;
    let mut bob_channel = AuthenticatedChannel::new(b, &psk, Role::Responder)?;

    let bob_config = config.clone();
    let responder = thread::spawn(move || -> Result<CascadeReconciliator> {
        let mut bob = CascadeReconciliator::new(Role::Responder, KeyBits::new(bob)?, &bob_config, None)?;
        bob.reconcile(&mut bob_channel)?;
        Ok(bob)
    });

    let mut alice = CascadeReconciliator::new(Role::Initiator, KeyBits::new(alice)?, config, None)?;
    let outcome = alice.reconcile(&mut alice_channel);
    drop(alice_channel);
    let bob = responder.join().expect("responder thread panicked")?;
    outcome?;
    Ok((alice, bob))
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

proptest! {
    #[test]
    fn test_parity_is_xor_of_selected_bits(bits in bit_vectors(200), picks in prop::collection::vec(any::<prop::sample::Index>(), 1..20)) {
        let indices: Vec<usize> = picks.iter().map(|p| p.index(bits.len())).collect();
        let expected = indices.iter().fold(0u8, |acc, &i| acc ^ bits[i]);
        prop_assert_eq!(parity(&bits, &indices).unwrap(), expected);
    }

    #[test]
    fn test_permutation_is_a_bijection(n in 1..500usize, seed in any::<u64>(), pass in 0..10usize) {
        let perm = permute(n, seed, pass).unwrap();
        let mut sorted = perm.clone();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..n).collect::<Vec<_>>());

        // same inputs give the same order on both sides
        prop_assert_eq!(&perm, &permute(n, seed, pass).unwrap());

        let inverse = inverse_permutation(&perm).unwrap();
        for (j, &i) in perm.iter().enumerate() {
            prop_assert_eq!(inverse[i], j);
        }
    }

    #[test]
    fn test_apply_permutation_moves_bits(bits in bit_vectors(300), seed in any::<u64>()) {
        let perm = permute(bits.len(), seed, 0).unwrap();
        let shuffled = apply_permutation(&bits, &perm).unwrap();
        for (j, &i) in perm.iter().enumerate() {
            prop_assert_eq!(shuffled[j], bits[i]);
        }
        prop_assert_eq!(
            shuffled.iter().filter(|&&b| b == 1).count(),
            bits.iter().filter(|&&b| b == 1).count()
        );
    }

    #[test]
    fn test_blocks_cover_every_position_once(n in 1..1000usize, size in 1..80usize) {
        let blocks = split_into_blocks(n, size).unwrap();
        prop_assert_eq!(blocks.len(), n.div_ceil(size));
        let flat: Vec<usize> = blocks.iter().flatten().copied().collect();
        prop_assert_eq!(flat, (0..n).collect::<Vec<_>>());
        for block in &blocks[..blocks.len() - 1] {
            prop_assert_eq!(block.len(), size);
        }
    }

    #[test]
    fn test_packed_bits_survive(bits in bit_vectors(300)) {
        let packed = pack_bits(&bits);
        prop_assert_eq!(packed.len(), bits.len().div_ceil(8));
        prop_assert_eq!(unpack_bits(&packed, bits.len()).unwrap(), bits);
    }

    #[test]
    fn test_toeplitz_matches_matrix_product((key, other, m, seed) in toeplitz_inputs()) {
        let n = key.len();
        let amplifier = PrivacyAmplifier::new();
        let out = amplifier.amplify(&KeyBits::new(key.clone()).unwrap(), &seed, m).unwrap();
        prop_assert_eq!(out.len(), m);

        for i in 0..m {
            let mut acc = 0u8;
            for j in 0..n {
                let entry = if i >= j { seed[i - j] } else { seed[m - 1 + j - i] };
                acc ^= entry & key[j];
            }
            prop_assert_eq!(out.as_slice()[i], acc);
        }

        // linear over GF(2)
        let other_out = amplifier.amplify(&KeyBits::new(other.clone()).unwrap(), &seed, m).unwrap();
        let sum_out = amplifier.amplify(&KeyBits::new(xor(&key, &other)).unwrap(), &seed, m).unwrap();
        let expected_sum = xor(out.as_slice(), other_out.as_slice());
        prop_assert_eq!(sum_out.as_slice(), expected_sum.as_slice());
    }

    #[test]
    fn test_field_multiplication_laws(width in tag_widths(), a in any::<u128>(), b in any::<u128>(), c in any::<u128>()) {
        let f = BinaryField::new(width);
        let (a, b, c) = (a & f.mask(), b & f.mask(), c & f.mask());
        prop_assert_eq!(f.mul(a, b), f.mul(b, a));
        prop_assert_eq!(f.mul(a, f.add(b, c)), f.add(f.mul(a, b), f.mul(a, c)));
        prop_assert!(f.contains(f.mul(a, b)));
        if a != 0 {
            prop_assert_eq!(f.mul(a, f.inverse(a)), 1);
        }
    }

    #[test]
    fn test_polynomial_hash_is_linear(width in tag_widths(), pair in (1..300usize).prop_flat_map(|n| (prop::collection::vec(0..2u8, n), prop::collection::vec(0..2u8, n))), salt in 1..u128::MAX) {
        let f = BinaryField::new(width);
        let salt = (salt & f.mask()).max(1);
        let (x, y) = pair;
        let hx = polynomial_hash(&f, &KeyBits::new(x.clone()).unwrap(), salt);
        let hy = polynomial_hash(&f, &KeyBits::new(y.clone()).unwrap(), salt);
        let hxy = polynomial_hash(&f, &KeyBits::new(xor(&x, &y)).unwrap(), salt);
        prop_assert_eq!(hxy, f.add(hx, hy));
    }

    #[test]
    fn test_tampered_messages_fail_authentication(payload in prop::collection::vec(any::<u8>(), 1..256), counter in any::<u64>(), flip in any::<prop::sample::Index>(), bit in 0..8u8) {
        let psk = PresharedKey::new(vec![0x33; 32]).unwrap();
        let alice = ChannelKeys::derive(&psk, Role::Initiator).unwrap();
        let bob = ChannelKeys::derive(&psk, Role::Responder).unwrap();

        let tag = alice.sign(counter, "BLOCK_PARITIES", &payload).unwrap();
        prop_assert!(bob.verify(counter, "BLOCK_PARITIES", &payload, &tag).unwrap());

        let mut tampered = payload.clone();
        tampered[flip.index(payload.len())] ^= 1 << bit;
        prop_assert!(!bob.verify(counter, "BLOCK_PARITIES", &tampered, &tag).unwrap());
        prop_assert!(!bob.verify(counter.wrapping_add(1), "BLOCK_PARITIES", &payload, &tag).unwrap());
        prop_assert!(!bob.verify(counter, "PA_SEED", &payload, &tag).unwrap());
    }

    #[test]
    fn test_final_length_shrinks_with_noise_and_leakage(n in 100..100_000usize, q in 0.0..0.11f64, leak in 0..5_000u64) {
        let base = compute_final_key_length(n, q, leak, 128, 1e-12);
        prop_assert!(base <= n);
        prop_assert!(compute_final_key_length(n, (q + 0.01).min(0.5), leak, 128, 1e-12) <= base);
        prop_assert!(compute_final_key_length(n, q, leak + 10, 128, 1e-12) <= base);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_cascade_converges_with_backtracking((alice, errors, seed) in noisy_keys()) {
        let mut bob = alice.clone();
        for &i in &errors {
            bob[i] ^= 1;
        }
        let config = CascadeConfig::default()
            .with_seed(seed)
            .with_passes(10)
            .with_initial_block_size(4);

        let (alice, responder) = reconcile_pair(&config, alice, bob.clone()).unwrap();
        prop_assert_eq!(alice.key(), responder.key());
        prop_assert_eq!(alice.key().as_slice(), bob.as_slice());
        prop_assert_eq!(alice.errors_corrected(), errors.len());
        prop_assert_eq!(responder.errors_corrected(), errors.len());
        prop_assert_eq!(alice.leakage(), responder.leakage());
        prop_assert!(alice.backtrack_corrections() <= alice.errors_corrected());
    }
}
