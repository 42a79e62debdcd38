use std::time::Duration;

use rand::Rng;

pub const DEFAULT_INITIAL_DELAY_MILLIS: u64 = 250;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
pub const MAX_BACKOFF_MILLIS: u64 = 10_000;
pub const RANDOM_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub initial_delay_millis: u64,
    pub backoff_factor: f64,
    pub max_delay_millis: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_millis: DEFAULT_INITIAL_DELAY_MILLIS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_delay_millis: MAX_BACKOFF_MILLIS,
        }
    }
}

impl BackoffConfig {
    /// Jittered delay before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(delay_millis_with_rng(attempt, *self, &mut rand::thread_rng()))
    }
}

fn delay_millis_with_rng<R: Rng + ?Sized>(attempt: u32, config: BackoffConfig, rng: &mut R) -> u64 {
    let base = (config.initial_delay_millis as f64) * config.backoff_factor.powi(attempt as i32);
    let jitter = RANDOM_FACTOR * base * rng.gen_range(-1.0..=1.0);
    (base + jitter)
        .round()
        .clamp(0.0, config.max_delay_millis as f64) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn delay_stays_within_jitter_band() {
        let config = BackoffConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 0..4 {
            let base = config.initial_delay_millis as f64 * 2f64.powi(attempt as i32);
            let value = delay_millis_with_rng(attempt, config, &mut rng) as f64;
            assert!(value >= (base * 0.5).floor());
            assert!(value <= (base * 1.5).ceil());
        }
    }

    #[test]
    fn delay_is_capped() {
        let config = BackoffConfig {
            max_delay_millis: 300,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert!(delay_millis_with_rng(10, config, &mut rng) <= 300);
    }
}
