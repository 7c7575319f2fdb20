/*!
Polynomial universal hash over GF(2^n).

`H_r(K) = Σ_{i=1..L} k_i · r^(L-i+1)`, evaluated with Horner's rule. Two
different keys of length `L` collide for at most `L` of the `2^n` salts.
*/

use crate::core::bits::KeyBits;
use crate::verification::gf2n::BinaryField;

/// Hash `key` at evaluation point `salt`
pub fn polynomial_hash(field: &BinaryField, key: &KeyBits, salt: u128) -> u128 {
    let salt = salt & field.mask();
    key.as_slice()
        .iter()
        .fold(0u128, |acc, &bit| field.mul(field.add(acc, bit as u128), salt))
}

/// Upper bound on the collision probability for keys of `key_length` bits
pub fn collision_bound(field: &BinaryField, key_length: usize) -> f64 {
    key_length as f64 / 2f64.powi(field.bits() as i32)
}
