/// Exponential moving average with smoothing `alpha = 2 / (period + 1)`.
///
/// Seeded with the first value it sees, so every update is O(1) and no price
/// buffer is kept.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    /// A zero period is treated as 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            value: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Fold one value in and return the new average.
    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            Some(prev) => x * self.alpha + prev * (1.0 - self.alpha),
            None => x,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_seeds_the_average() {
        let mut ema = Ema::new(12);
        assert_eq!(ema.value(), None);
        assert_eq!(ema.update(50.0), 50.0);
    }

    #[test]
    fn constant_series_stays_constant() {
        let mut ema = Ema::new(9);
        for _ in 0..100 {
            assert!((ema.update(42.0) - 42.0).abs() < 1e-12);
        }
    }

    #[test]
    fn known_recurrence_value() {
        // period 3 → alpha 0.5
        let mut ema = Ema::new(3);
        ema.update(10.0);
        assert!((ema.update(20.0) - 15.0).abs() < 1e-12);
        assert!((ema.update(30.0) - 22.5).abs() < 1e-12);
    }

    #[test]
    fn shorter_period_reacts_faster() {
        let mut fast = Ema::new(3);
        let mut slow = Ema::new(10);
        fast.update(100.0);
        slow.update(100.0);
        let f = fast.update(110.0);
        let s = slow.update(110.0);
        assert!(f > s);
    }

    #[test]
    fn zero_period_behaves_like_one() {
        let mut ema = Ema::new(0);
        assert_eq!(ema.period(), 1);
        ema.update(10.0);
        assert_eq!(ema.update(20.0), 20.0);
    }
}
