//! The custom rate calculator capability.
//!
//! A [`RateCalculator`] is consulted every time an event is (re-)enabled.
//! It sees the local environment through a [`RateContext`] and returns a
//! rate, which either replaces or is added to the process's rate constant
//! according to its [`RatePolicy`].

use smallvec::SmallVec;

use kmc_core::{ProcessId, Vec3};

/// How a calculator's return value combines with the rate constant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RatePolicy {
    /// The returned value is the rate.
    #[default]
    Replace,
    /// The returned value is added to the rate constant.
    Additive,
}

impl RatePolicy {
    /// Combine a calculator value with a rate constant.
    pub fn combine(self, rate_constant: f64, value: f64) -> f64 {
        match self {
            Self::Replace => value,
            Self::Additive => rate_constant + value,
        }
    }
}

/// The local environment of an event, as a calculator sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct RateContext<'a> {
    /// The process being enabled.
    pub process: ProcessId,
    /// Its centre site.
    pub site: usize,
    /// The process's default rate constant.
    pub rate_constant: f64,
    /// Pattern offsets in fractional units, centre first.
    pub coordinates: &'a [Vec3],
    /// Type names currently at each pattern position (`"*"` past a
    /// non-periodic edge).
    pub types_before: SmallVec<[&'a str; 16]>,
    /// Type names each position will hold after firing.
    pub types_after: SmallVec<[&'a str; 16]>,
    /// Cartesian coordinate of the centre site.
    pub global_coordinate: Vec3,
}

/// A user-supplied rate function.
///
/// # Contract
///
/// - `rate()` must be deterministic in its context.
/// - The returned value, and the combined rate (see
///   [`RatePolicy::combine`]), must be finite and strictly positive; the
///   engine fails the step otherwise. This holds for both policies: an
///   additive calculator may not lower a rate.
/// - If `cache_rates()` returns true, the rate may depend only on the
///   process and `types_before`, and the engine memoises it on that key.
///
/// # Examples
///
/// ```
/// use kmc_process::{RateCalculator, RateContext, RatePolicy};
///
/// struct Crowding;
///
/// impl RateCalculator for Crowding {
///     fn name(&self) -> &str { "crowding" }
///
///     fn rate(&self, ctx: &RateContext<'_>) -> f64 {
///         let occupied = ctx.types_before.iter().filter(|t| **t == "A").count();
///         ctx.rate_constant / occupied.max(1) as f64
///     }
/// }
///
/// assert_eq!(Crowding.policy(), RatePolicy::Replace);
/// ```
pub trait RateCalculator: Send + 'static {
    /// Human-readable name for error reporting.
    fn name(&self) -> &str;

    /// Whether the value replaces or adds to the rate constant.
    fn policy(&self) -> RatePolicy {
        RatePolicy::Replace
    }

    /// Rate for one event.
    fn rate(&self, ctx: &RateContext<'_>) -> f64;

    /// Whether rates depend only on the process and local before-types.
    fn cache_rates(&self) -> bool {
        false
    }
}
