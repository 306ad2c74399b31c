/// RSI (Relative Strength Index) indicator.
///
/// Uses Wilder's smoothed moving average: `avg = (avg * (n - 1) + current) / n`.
/// While fewer than `period` changes have been seen, `n` is the number of
/// changes so far, which makes the first `period` steps a plain average seed.
/// State is four numbers; no price window is stored.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_price: Option<f64>,
    changes: usize,
    avg_gain: f64,
    avg_loss: f64,
}

impl Rsi {
    /// Periods below 2 are raised to 2.
    pub fn new(period: usize) -> Self {
        let period = period.max(2);
        Self {
            period,
            prev_price: None,
            changes: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Fold one price in. Returns `None` until at least one price change has
    /// been observed.
    pub fn update(&mut self, price: f64) -> Option<f64> {
        let Some(prev) = self.prev_price.replace(price) else {
            return None;
        };

        let change = price - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        self.changes += 1;
        let n = self.changes.min(self.period) as f64;
        self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
        self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;

        Some(self.value())
    }

    fn value(&self) -> f64 {
        if self.avg_loss == 0.0 {
            return 100.0;
        }
        let rs = self.avg_gain / self.avg_loss;
        (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(rsi: &mut Rsi, prices: &[f64]) -> Option<f64> {
        prices.iter().fold(None, |_, &p| rsi.update(p))
    }

    #[test]
    fn rsi_returns_none_before_first_change() {
        let mut rsi = Rsi::new(14);
        assert!(rsi.update(100.0).is_none());
        assert!(rsi.update(101.0).is_some());
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let mut rsi = Rsi::new(3);
        let value = feed(&mut rsi, &[10.0, 11.0, 12.0, 13.0, 14.0]).unwrap();
        assert!((value - 100.0).abs() < 1e-6, "Expected ~100, got {value}");
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let mut rsi = Rsi::new(3);
        let value = feed(&mut rsi, &[14.0, 13.0, 12.0, 11.0, 10.0]).unwrap();
        assert!((value - 0.0).abs() < 1e-6, "Expected ~0, got {value}");
    }

    #[test]
    fn rsi_flat_prices_count_as_no_loss() {
        let mut rsi = Rsi::new(5);
        let value = feed(&mut rsi, &[50.0; 10]).unwrap();
        assert_eq!(value, 100.0);
    }

    #[test]
    fn rsi_matches_batch_wilder_computation() {
        // Reference: seed with the simple average of the first `period`
        // changes, then Wilder smoothing. The incremental form must agree.
        let period = 14;
        let prices = [
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ];
        let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
        let seed = &changes[..period];
        let mut g = seed.iter().filter(|&&c| c > 0.0).sum::<f64>() / period as f64;
        let mut l = seed.iter().filter(|&&c| c < 0.0).map(|c| c.abs()).sum::<f64>() / period as f64;
        for &c in &changes[period..] {
            g = (g * (period - 1) as f64 + c.max(0.0)) / period as f64;
            l = (l * (period - 1) as f64 + (-c).max(0.0)) / period as f64;
        }
        let expected = 100.0 - 100.0 / (1.0 + g / l);

        let mut rsi = Rsi::new(period);
        let value = feed(&mut rsi, &prices).unwrap();
        assert!((value - expected).abs() < 1e-9, "got {value}, expected {expected}");
        assert!((0.0..=100.0).contains(&value));
    }

    #[test]
    fn tiny_period_is_raised_instead_of_panicking() {
        let mut rsi = Rsi::new(0);
        assert_eq!(rsi.period(), 2);
        let value = feed(&mut rsi, &[10.0, 11.0, 10.5]).unwrap();
        assert!((0.0..=100.0).contains(&value));
    }
}
