use std::time::Duration;

/// Delay before the first reconnection attempt
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1);

/// Starting point of the growth sequence used after the first attempt
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound on any single reconnection delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(60_000);

/// Growth factor applied to the previous delay
pub const BACKOFF_FACTOR: f64 = 1.5;

/// Multiplicative reconnection backoff with an optional lifetime budget
///
/// The first delay is `initial_delay`, so the first retry happens almost
/// at once. Later delays grow from `base_delay`: base x 1.5, then x 1.5
/// again, each capped at `max_delay`. With the defaults that is
/// 1 ms, 1500 ms, 2250 ms, 3375 ms and so on up to 60 s.
///
/// Every delay that actually elapses is charged against `budget`; once the
/// charged total exceeds the budget the backoff reports itself exhausted.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial_delay: Duration,
    base_delay: Duration,
    max_delay: Duration,
    budget: Option<Duration>,
    growth: Option<Duration>,
    elapsed: Duration,
}

impl ReconnectBackoff {
    /// Create a new backoff
    ///
    /// # Arguments
    /// * `initial_delay` - Delay before the first attempt
    /// * `base_delay` - Value the 1.5x growth starts from for later attempts
    /// * `max_delay` - Cap for every later delay
    /// * `budget` - Total delay allowed over the manager's lifetime (None = unlimited)
    pub fn new(
        initial_delay: Duration,
        base_delay: Duration,
        max_delay: Duration,
        budget: Option<Duration>,
    ) -> Self {
        Self {
            initial_delay,
            base_delay,
            max_delay: max_delay.max(initial_delay),
            budget,
            growth: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Compute the delay for the next attempt and advance the sequence
    pub fn next_delay(&mut self) -> Duration {
        match self.growth {
            None => {
                self.growth = Some(self.base_delay);
                self.initial_delay
            }
            Some(previous) => {
                let delay = previous.mul_f64(BACKOFF_FACTOR).min(self.max_delay);
                self.growth = Some(delay);
                delay
            }
        }
    }

    /// Charge a delay that has fully elapsed against the budget
    pub fn charge(&mut self, delay: Duration) {
        self.elapsed = self.elapsed.saturating_add(delay);
    }

    /// True once the charged delay exceeds the configured budget
    pub fn is_exhausted(&self) -> bool {
        self.budget.is_some_and(|budget| self.elapsed > budget)
    }

    /// Restart the delay sequence (called after a successful open).
    /// The budget keeps counting.
    pub fn reset(&mut self) {
        self.growth = None;
    }

    /// Total delay charged so far
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_DELAY, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, None)
    }
}
