//! Incremental indicator state.
//!
//! Each indicator is an explicit state object advanced exactly once per bar
//! with `update`; values are never recomputed from scratch. `update` returns
//! `None` until the seed window has filled.
//!
//! EMA seeding follows the usual convention: the value at the end of the seed
//! window is the SMA of the first `period` inputs, then the recursion
//! `ema = alpha * x + (1 - alpha) * ema` takes over.

/// Incremental exponential moving average.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    seed_sum: f64,
    seen: usize,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seen: 0,
            value: None,
        }
    }

    /// Advance one bar. Returns the EMA once seeded.
    pub fn update(&mut self, x: f64) -> Option<f64> {
        self.seen += 1;
        match self.value {
            Some(prev) => {
                let next = self.alpha * x + (1.0 - self.alpha) * prev;
                self.value = Some(next);
            }
            None => {
                self.seed_sum += x;
                if self.seen == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// One MACD observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Incremental MACD: fast EMA minus slow EMA, with an EMA signal line.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        assert!(
            fast_period < slow_period,
            "MACD fast period must be shorter than slow"
        );
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
        }
    }

    /// Advance one bar. Returns a point once the slow EMA and the signal line
    /// have both seeded.
    pub fn update(&mut self, close: f64) -> Option<MacdPoint> {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        let macd = match (fast, slow) {
            (Some(f), Some(s)) => f - s,
            _ => return None,
        };
        let signal = self.signal.update(macd)?;
        Some(MacdPoint {
            macd,
            signal,
            histogram: macd - signal,
        })
    }
}
