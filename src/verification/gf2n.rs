/*!
Arithmetic in GF(2^n) for n in {32, 64, 128}.

Elements are polynomials over GF(2) packed into a `u128`, bit `i` being
the coefficient of `x^i`. Addition is XOR; multiplication is shift-and-add
with reduction by a fixed irreducible polynomial:

| n   | modulus                       |
|-----|-------------------------------|
| 32  | x^32 + x^7 + x^3 + x^2 + 1    |
| 64  | x^64 + x^4 + x^3 + x + 1      |
| 128 | x^128 + x^7 + x^2 + x + 1     |
*/

use crate::core::config::TagWidth;

/// A binary extension field of 32, 64 or 128 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryField {
    bits: u32,
    /// Modulus without its leading `x^n` term
    reduction: u128,
    mask: u128,
}

impl BinaryField {
    /// Field for the given tag width
    pub fn new(width: TagWidth) -> Self {
        let (bits, reduction) = match width {
            TagWidth::Bits32 => (32, 0x8D),
            TagWidth::Bits64 => (64, 0x1B),
            TagWidth::Bits128 => (128, 0x87),
        };
        let mask = if bits == 128 { u128::MAX } else { (1u128 << bits) - 1 };
        Self { bits, reduction, mask }
    }

    /// Degree of the field
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Mask selecting valid element bits
    pub fn mask(&self) -> u128 {
        self.mask
    }

    /// Whether `value` is an element of this field
    pub fn contains(&self, value: u128) -> bool {
        value & !self.mask == 0
    }

    /// Field addition
    #[inline]
    pub fn add(&self, a: u128, b: u128) -> u128 {
        a ^ b
    }

    /// Field multiplication
    pub fn mul(&self, a: u128, b: u128) -> u128 {
        let top = 1u128 << (self.bits - 1);
        let mut a = a & self.mask;
        let mut b = b & self.mask;
        let mut acc = 0u128;
        while b != 0 {
            if b & 1 == 1 {
                acc ^= a;
            }
            let carry = a & top != 0;
            a = (a << 1) & self.mask;
            if carry {
                a ^= self.reduction;
            }
            b >>= 1;
        }
        acc
    }

    /// `base^exp` by repeated squaring
    pub fn pow(&self, base: u128, mut exp: u128) -> u128 {
        let mut result = 1u128;
        let mut square = base & self.mask;
        while exp != 0 {
            if exp & 1 == 1 {
                result = self.mul(result, square);
            }
            square = self.mul(square, square);
            exp >>= 1;
        }
        result
    }

    /// Multiplicative inverse (`a^(2^n - 2)`); zero maps to zero
    pub fn inverse(&self, a: u128) -> u128 {
        self.pow(a, self.mask - 1)
    }
}
