//! Cumulative run counters.

/// Counters accumulated over a run.
///
/// The step function updates the event counters; the driver fills in the
/// sink and timing fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunMetrics {
    /// Events fired.
    pub steps: u64,
    /// Matcher queries issued while refreshing enabled events.
    pub matcher_queries: u64,
    /// Calls into the custom rate calculator.
    pub rate_evaluations: u64,
    /// Rates served from the memo instead of the calculator.
    pub rate_cache_hits: u64,
    /// Frames handed to trajectory sinks.
    pub frames_dumped: u64,
    /// Sink writes that failed once and succeeded on retry.
    pub sink_retries: u64,
    /// Wall-clock time spent in the run loop, in microseconds.
    pub total_us: u64,
}
