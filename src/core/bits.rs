/*!
Bit-level utilities shared by every stage of the pipeline.

[`KeyBits`] is the owned key representation. The free functions are the
pure helpers Cascade and the amplifier build on: subset parity, seeded
permutations, block splitting and bit packing.
*/

use std::fmt;
use std::ops::Index;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::contract_err;
use crate::core::constants::{PERMUTATION_DOMAIN, defaults};
use crate::core::error::Result;

/// Owned, fixed-length key of single bits.
///
/// The length never changes; the only mutation is [`KeyBits::flip`].
/// Contents are wiped on drop.
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct KeyBits {
    bits: Vec<u8>,
}

impl KeyBits {
    /// Build a key from 0/1 values, rejecting anything else.
    pub fn new(bits: Vec<u8>) -> Result<Self> {
        if let Some(pos) = bits.iter().position(|&b| b > 1) {
            return contract_err!("value {} at index {} is not a bit", bits[pos], pos);
        }
        Ok(Self { bits })
    }

    /// Unpack the first `len` bits of `bytes`, most significant bit first
    pub fn from_bytes(bytes: &[u8], len: usize) -> Result<Self> {
        Ok(Self {
            bits: unpack_bits(bytes, len)?,
        })
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the key holds no bits
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Bit at `index`
    pub fn get(&self, index: usize) -> Option<u8> {
        self.bits.get(index).copied()
    }

    /// Flip the bit at `index`
    pub fn flip(&mut self, index: usize) -> Result<()> {
        match self.bits.get_mut(index) {
            Some(bit) => {
                *bit ^= 1;
                Ok(())
            }
            None => contract_err!("flip index {} out of range for length {}", index, self.bits.len()),
        }
    }

    /// Borrow the bits
    pub fn as_slice(&self) -> &[u8] {
        &self.bits
    }

    /// Pack into bytes, most significant bit first
    pub fn to_bytes(&self) -> Vec<u8> {
        pack_bits(&self.bits)
    }

    /// Parity of the bits at `indices`
    pub fn parity(&self, indices: &[usize]) -> Result<u8> {
        parity(&self.bits, indices)
    }
}

impl Index<usize> for KeyBits {
    type Output = u8;

    fn index(&self, index: usize) -> &u8 {
        &self.bits[index]
    }
}

impl fmt::Debug for KeyBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // key material never goes to logs
        write!(f, "KeyBits({} bits)", self.bits.len())
    }
}

impl TryFrom<Vec<u8>> for KeyBits {
    type Error = crate::core::error::Error;

    fn try_from(bits: Vec<u8>) -> Result<Self> {
        Self::new(bits)
    }
}

impl TryFrom<&[u8]> for KeyBits {
    type Error = crate::core::error::Error;

    fn try_from(bits: &[u8]) -> Result<Self> {
        Self::new(bits.to_vec())
    }
}

/// XOR of `bits` over `indices`.
///
/// Fails on an empty index set or any index outside `bits`.
pub fn parity(bits: &[u8], indices: &[usize]) -> Result<u8> {
    if indices.is_empty() {
        return contract_err!("parity over an empty index set");
    }
    let mut acc = 0u8;
    for &i in indices {
        match bits.get(i) {
            Some(&b) => acc ^= b,
            None => return contract_err!("index {} out of range for length {}", i, bits.len()),
        }
    }
    Ok(acc & 1)
}

/// Derive the 32-byte PRNG seed for one Cascade pass.
///
/// Seed and pass index are hashed together so that no two (seed, pass)
/// pairs share a stream.
fn pass_seed(seed: u64, pass_index: usize) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(PERMUTATION_DOMAIN);
    hasher.update(seed.to_be_bytes());
    hasher.update((pass_index as u64).to_be_bytes());
    hasher.finalize().into()
}

/// Uniform draw from `[0, bound)` using only raw `u64` outputs.
///
/// Multiply-shift with rejection, so the result depends on the ChaCha20
/// stream alone and not on how a `rand` release maps words to ranges.
fn draw_below(rng: &mut ChaCha20Rng, bound: u64) -> u64 {
    let zone = bound.wrapping_neg() % bound;
    loop {
        let wide = rng.next_u64() as u128 * bound as u128;
        if (wide as u64) >= zone {
            return (wide >> 64) as u64;
        }
    }
}

/// Deterministic permutation of `[0, length)` for `(seed, pass_index)`.
///
/// Fisher–Yates shuffle driven by ChaCha20; both parties derive the same
/// output bit for bit. An empty range gives an empty permutation.
pub fn permute(length: usize, seed: u64, pass_index: usize) -> Result<Vec<usize>> {
    let mut rng = ChaCha20Rng::from_seed(pass_seed(seed, pass_index));
    let mut perm: Vec<usize> = (0..length).collect();
    for i in (1..length).rev() {
        let j = draw_below(&mut rng, i as u64 + 1) as usize;
        perm.swap(i, j);
    }
    Ok(perm)
}

/// Inverse of a permutation: `inv[perm[i]] == i`
pub fn inverse_permutation(perm: &[usize]) -> Result<Vec<usize>> {
    let mut inv = vec![usize::MAX; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        if p >= perm.len() || inv[p] != usize::MAX {
            return contract_err!("not a permutation: value {} at position {}", p, i);
        }
        inv[p] = i;
    }
    Ok(inv)
}

/// Reorder `bits` so that `out[i] = bits[perm[i]]`
pub fn apply_permutation(bits: &[u8], perm: &[usize]) -> Result<Vec<u8>> {
    if bits.len() != perm.len() {
        return contract_err!("permutation length {} does not match {}", perm.len(), bits.len());
    }
    perm.iter()
        .map(|&p| match bits.get(p) {
            Some(&b) => Ok(b),
            None => contract_err!("permutation index {} out of range", p),
        })
        .collect()
}

/// Contiguous blocks of `block_size` positions over `[0, length)`.
///
/// The last block is shorter when `length` is not a multiple; an empty
/// range gives no blocks.
pub fn split_into_blocks(length: usize, block_size: usize) -> Result<Vec<Vec<usize>>> {
    if block_size == 0 {
        return contract_err!("block size must be positive");
    }
    Ok((0..length)
        .step_by(block_size)
        .map(|start| (start..(start + block_size).min(length)).collect())
        .collect())
}

/// Initial Cascade block size for an expected error rate
pub fn optimal_initial_block_size(qber: f64) -> usize {
    if qber <= 0.0 {
        return defaults::MAX_INITIAL_BLOCK_SIZE;
    }
    if qber >= 0.5 {
        return defaults::MIN_BLOCK_SIZE;
    }
    let size = (defaults::OPTIMAL_BLOCK_FACTOR / qber).ceil() as usize;
    size.max(defaults::MIN_BLOCK_SIZE)
}

/// Pack bits into bytes, most significant bit first, zero padded
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, &b) in bits.iter().enumerate() {
        if b & 1 == 1 {
            out[i / 8] |= 0x80 >> (i % 8);
        }
    }
    out
}

/// Unpack `len` bits from `bytes`; padding bits must be zero
pub fn unpack_bits(bytes: &[u8], len: usize) -> Result<Vec<u8>> {
    if bytes.len() != len.div_ceil(8) {
        return contract_err!("{} bytes cannot hold exactly {} bits", bytes.len(), len);
    }
    if len % 8 != 0 {
        let used = len % 8;
        if let Some(&last) = bytes.last() {
            if last & (0xFF >> used) != 0 {
                return contract_err!("non-zero padding bits");
            }
        }
    }
    Ok((0..len)
        .map(|i| (bytes[i / 8] >> (7 - i % 8)) & 1)
        .collect())
}
