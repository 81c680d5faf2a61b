//! Fixed-length time windows measured from a start time.

use kmc_core::InputError;

pub(crate) fn check_length(what: &str, tau: f64) -> Result<f64, InputError> {
    if tau.is_finite() && tau > 0.0 {
        Ok(tau)
    } else {
        Err(InputError::invalid(
            what,
            format!("window length must be finite and > 0, got {tau}"),
        ))
    }
}

/// Index of the window holding `time`. Times before `start` fall in
/// window 0.
pub(crate) fn index(start: f64, tau: f64, time: f64) -> usize {
    ((time - start) / tau).floor().max(0.0) as usize
}

/// Grow `v` with defaults until `i` is a valid index, then return it.
pub(crate) fn slot<T: Default>(v: &mut Vec<T>, i: usize) -> &mut T {
    if v.len() <= i {
        v.resize_with(i + 1, T::default);
    }
    &mut v[i]
}
