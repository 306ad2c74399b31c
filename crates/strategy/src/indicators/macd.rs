use super::Ema;

/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// Computes: MACD line = EMA(fast) − EMA(slow), Signal = EMA(macd_line, signal_period),
/// histogram = MACD line − Signal. Updated one price at a time.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

/// The result of one MACD update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdReading {
    pub fast_ema: f64,
    pub slow_ema: f64,
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl Macd {
    /// `IndicatorPeriods::from_window` keeps `fast < slow` for every valid window.
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        debug_assert!(fast < slow, "MACD fast period must be less than slow period");
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
        }
    }

    pub fn update(&mut self, price: f64) -> MacdReading {
        let fast_ema = self.fast.update(price);
        let slow_ema = self.slow.update(price);
        let macd = fast_ema - slow_ema;
        let signal = self.signal.update(macd);
        MacdReading {
            fast_ema,
            slow_ema,
            macd,
            signal,
            histogram: macd - signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(macd: &mut Macd, prices: impl IntoIterator<Item = f64>) -> MacdReading {
        let mut last = None;
        for p in prices {
            last = Some(macd.update(p));
        }
        last.expect("at least one price")
    }

    #[test]
    fn flat_prices_give_zero_macd() {
        let mut macd = Macd::new(12, 26, 9);
        let r = feed(&mut macd, std::iter::repeat(100.0).take(60));
        assert!(r.macd.abs() < 1e-12);
        assert!(r.histogram.abs() < 1e-12);
    }

    #[test]
    fn uptrend_gives_positive_macd_line() {
        let mut macd = Macd::new(12, 26, 9);
        let r = feed(&mut macd, (0..60).map(|i| 100.0 + i as f64));
        assert!(r.macd > 0.0, "macd {}", r.macd);
        assert!(r.fast_ema > r.slow_ema);
    }

    #[test]
    fn downtrend_gives_negative_macd_line() {
        let mut macd = Macd::new(12, 26, 9);
        let r = feed(&mut macd, (0..60).map(|i| 200.0 - i as f64 * 0.5));
        assert!(r.macd < 0.0, "macd {}", r.macd);
    }

    #[test]
    fn reversal_turns_histogram_positive() {
        let mut macd = Macd::new(3, 6, 3);
        // Down then sharply up: signal line lags, histogram goes positive
        let mut prices: Vec<f64> = (0..20).map(|i| 100.0 - i as f64 * 0.5).collect();
        prices.extend((0..5).map(|i| 90.0 + i as f64 * 2.0));
        let r = feed(&mut macd, prices);
        assert!(r.histogram > 0.0, "histogram {}", r.histogram);
    }

    #[test]
    fn histogram_is_macd_minus_signal() {
        let mut macd = Macd::new(12, 26, 9);
        let r = feed(&mut macd, [100.0, 101.5, 99.0, 102.0, 103.3]);
        assert!((r.histogram - (r.macd - r.signal)).abs() < 1e-12);
    }
}
