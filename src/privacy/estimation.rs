/*!
Error-rate estimation.
*/

/// QBER from errors seen while sampling plus errors Cascade corrected
pub fn estimate_qber_from_cascade(total_bits: usize, sample_errors: usize, cascade_errors: usize) -> f64 {
    if total_bits == 0 {
        return 0.0;
    }
    (sample_errors + cascade_errors) as f64 / total_bits as f64
}

/// QBER used for the abort decision and the length formula.
///
/// The prior estimate and the observed correction rate measure the same
/// errors, so the larger of the two is taken.
pub fn effective_qber(prior: Option<f64>, total_bits: usize, cascade_errors: usize) -> f64 {
    let observed = estimate_qber_from_cascade(total_bits, 0, cascade_errors);
    prior.map_or(observed, |p| p.max(observed))
}
