/*!
Toeplitz-hash privacy amplification.

For a key of `n` bits and an output of `m` bits the seed holds exactly
`n + m - 1` bits. The `m × n` matrix has `seed[0..m]` as its first column
and `seed[m-1..]` as its first row (the diagonal taken from the column):

```text
T[i][j] = seed[i - j]          when i >= j
T[i][j] = seed[m - 1 + j - i]  when j > i
```

The output is `T · key` over GF(2).
*/

use rand::Rng;
use tracing::debug;

use crate::contract_err;
use crate::core::{bits::KeyBits, error::Result};

/// Toeplitz compressor
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivacyAmplifier;

impl PrivacyAmplifier {
    /// Create an amplifier
    pub fn new() -> Self {
        Self
    }

    /// Seed length needed to compress `key_length` bits to `final_length`
    pub fn seed_length(key_length: usize, final_length: usize) -> usize {
        (key_length + final_length).saturating_sub(1)
    }

    /// Compress `key` to `final_length` bits with the matrix defined by `seed`
    pub fn amplify(&self, key: &KeyBits, seed: &[u8], final_length: usize) -> Result<KeyBits> {
        let n = key.len();
        let m = final_length;
        if n == 0 {
            return contract_err!("cannot amplify an empty key");
        }
        if m == 0 || m > n {
            return contract_err!("final length {} must lie in 1..={}", m, n);
        }
        if seed.len() != n + m - 1 {
            return contract_err!(
                "seed length {} does not equal key length {} + final length {} - 1",
                seed.len(),
                n,
                m
            );
        }
        if seed.iter().any(|&b| b > 1) {
            return contract_err!("seed holds a non-bit value");
        }

        // diagonals in order: row i is diagonals[m-1-i .. m-1-i+n]
        let diagonals: Vec<u8> = (0..n + m - 1)
            .map(|t| if t < m { seed[m - 1 - t] } else { seed[t] })
            .collect();

        let bits = key.as_slice();
        let output = (0..m)
            .map(|i| {
                let start = m - 1 - i;
                diagonals[start..start + n]
                    .iter()
                    .zip(bits)
                    .fold(0u8, |acc, (t, k)| acc ^ (t & k))
            })
            .collect();

        debug!(input_bits = n, output_bits = m, "privacy amplification applied");
        KeyBits::new(output)
    }
}

/// Draw a uniformly random Toeplitz seed
pub fn generate_toeplitz_seed<R: Rng>(rng: &mut R, key_length: usize, final_length: usize) -> Vec<u8> {
    (0..PrivacyAmplifier::seed_length(key_length, final_length))
        .map(|_| rng.random::<bool>() as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn reference(key: &[u8], seed: &[u8], m: usize) -> Vec<u8> {
        let n = key.len();
        (0..m)
            .map(|i| {
                (0..n).fold(0u8, |acc, j| {
                    let t = if i >= j { seed[i - j] } else { seed[m - 1 + j - i] };
                    acc ^ (t & key[j])
                })
            })
            .collect()
    }

    #[test]
    fn test_small_matrix_by_hand() {
        // n = 3, m = 2: T = [[s0, s2, s3], [s1, s0, s2]]
        let seed = [1, 0, 1, 1];
        let key = KeyBits::new(vec![1, 1, 0]).unwrap();
        let out = PrivacyAmplifier::new().amplify(&key, &seed, 2).unwrap();
        // row 0: 1·1 ^ 1·1 ^ 1·0 = 0; row 1: 0·1 ^ 1·1 ^ 1·0 = 1
        assert_eq!(out.as_slice(), &[0, 1]);
    }

    #[test]
    fn test_matches_reference_matrix() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        for (n, m) in [(1, 1), (8, 3), (64, 40), (100, 100)] {
            let key: Vec<u8> = (0..n).map(|_| rng.random::<bool>() as u8).collect();
            let seed = generate_toeplitz_seed(&mut rng, n, m);
            assert_eq!(seed.len(), n + m - 1);
            let out = PrivacyAmplifier::new()
                .amplify(&KeyBits::new(key.clone()).unwrap(), &seed, m)
                .unwrap();
            assert_eq!(out.as_slice(), reference(&key, &seed, m).as_slice());
        }
    }

    #[test]
    fn test_seed_length_contract() {
        let key = KeyBits::new(vec![1, 0, 1, 1]).unwrap();
        let amp = PrivacyAmplifier::new();
        assert!(amp.amplify(&key, &[1, 0, 1, 1, 0], 2).is_ok());
        assert!(amp.amplify(&key, &[1, 0, 1, 1], 2).unwrap_err().is_contract_violation());
        assert!(amp.amplify(&key, &[1, 0, 1, 1, 0, 0], 2).unwrap_err().is_contract_violation());
        assert!(amp.amplify(&key, &[1, 0, 1], 0).is_err());
        assert!(amp.amplify(&key, &[0; 8], 5).is_err());
        assert!(amp.amplify(&key, &[1, 2, 1, 1, 0], 2).is_err());
    }

    #[test]
    fn test_deterministic() {
        let key = KeyBits::new(vec![1, 0, 0, 1, 1, 0, 1, 0, 1, 1]).unwrap();
        let seed = generate_toeplitz_seed(&mut ChaCha20Rng::seed_from_u64(5), 10, 6);
        let amp = PrivacyAmplifier::new();
        let a = amp.amplify(&key, &seed, 6).unwrap();
        let b = amp.amplify(&key, &seed, 6).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
    }
}
