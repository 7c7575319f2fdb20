/*!
Entropy accounting for the final key length.

`final = floor(n·(1 - h(Q)) - leak_EC - leak_ver - 2·log2(1/ε))`, never
negative.
*/

/// Binary entropy `h(p)`; zero at and beyond the endpoints
pub fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    -p * p.log2() - (1.0 - p) * (1.0 - p).log2()
}

/// Bits of the reconciled key that survive privacy amplification
pub fn compute_final_key_length(
    reconciled_length: usize,
    qber: f64,
    leakage_ec: u64,
    leakage_ver: u64,
    epsilon_sec: f64,
) -> usize {
    let security_margin = 2.0 * (1.0 / epsilon_sec).log2();
    let available = reconciled_length as f64 * (1.0 - binary_entropy(qber));
    let length = available - leakage_ec as f64 - leakage_ver as f64 - security_margin;
    if length.is_nan() || length <= 0.0 {
        0
    } else {
        length.floor() as usize
    }
}
