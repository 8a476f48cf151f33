//! Retry Policy (§4.3): a pure function from `(attempts, base, cap)` to the
//! next-run delay, plus jitter to avoid synchronized retry storms.

/// Anything that can produce a uniform draw in `[0, 1)`. Exists so tests can
/// supply a deterministic sequence instead of `fastrand`'s global RNG.
pub trait JitterSource {
    fn next_unit(&mut self) -> f64;
}

/// The default jitter source backed by `fastrand`.
#[derive(Debug, Default)]
pub struct FastrandJitter;

impl JitterSource for FastrandJitter {
    fn next_unit(&mut self) -> f64 {
        fastrand::f64()
    }
}

/// `delay(attempts, base, max_cap) = min(max_cap, base^attempts) + U(0, 0.5*base)`.
///
/// `attempts` is zero-based: the first retry (after the first failed
/// attempt) passes `attempts = 0`, giving `base^0 = 1` as specified.
pub fn next_delay_secs(
    attempts: u32,
    base: f64,
    max_cap: f64,
    jitter: &mut dyn JitterSource,
) -> f64 {
    let raw = base.powi(attempts as i32);
    let capped = raw.min(max_cap);
    let jitter_span = 0.5 * base;
    capped + jitter.next_unit() * jitter_span
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedJitter(f64);
    impl JitterSource for FixedJitter {
        fn next_unit(&mut self) -> f64 {
            self.0
        }
    }

    #[test]
    fn zero_attempts_is_base_power_zero_plus_jitter() {
        let mut j = FixedJitter(0.0);
        let d = next_delay_secs(0, 2.0, 3600.0, &mut j);
        assert_eq!(d, 1.0);
    }

    #[test]
    fn delay_is_bounded_by_cap_plus_half_base() {
        let mut j = FixedJitter(1.0);
        let d = next_delay_secs(20, 2.0, 3600.0, &mut j);
        assert!(d <= 3600.0 + 0.5 * 2.0 + f64::EPSILON);
    }

    #[test]
    fn delay_is_never_negative() {
        let mut j = FixedJitter(0.0);
        for attempts in 0..10 {
            let d = next_delay_secs(attempts, 2.0, 3600.0, &mut j);
            assert!(d >= 0.0);
        }
    }

    #[test]
    fn expected_delay_is_monotonic_below_the_cap() {
        // Average out jitter across many draws so only the base^attempts term
        // dominates below the cap.
        let mut rng = FastrandJitter;
        let mut prev_avg = 0.0;
        for attempts in 0..8u32 {
            let mut total = 0.0;
            for _ in 0..500 {
                total += next_delay_secs(attempts, 2.0, 3600.0, &mut rng);
            }
            let avg = total / 500.0;
            assert!(avg + 1e-9 >= prev_avg, "attempts={attempts} avg={avg} prev={prev_avg}");
            prev_avg = avg;
        }
    }
}
