//! MACD crossover strategy with a long-period EMA trend filter.
//!
//! Long: MACD crosses above its signal line below the zero line while price
//! is above the trend EMA. Short: the mirror image. The stop sits at the
//! most recent swing low (long) or swing high (short) inside a fixed
//! lookback window; the target is derived from the reward:risk ratio.

use crate::config::{SizingKind, StrategyConfig};
use crate::domain::{Direction, OrderIntent, Sizing};
use crate::indicators::{Ema, Macd, MacdPoint};
use crate::strategy::{Strategy, StrategyContext, StrategyError};

pub struct MacdCrossover {
    trend: Ema,
    macd: Macd,
    prev: Option<MacdPoint>,
    swing_lookback: usize,
    reward_risk: f64,
    sizing: SizingKind,
    risk_pc: f64,
    fixed_size: Option<f64>,
}

impl MacdCrossover {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            trend: Ema::new(config.param_usize("ema_period", 200)),
            macd: Macd::new(
                config.param_usize("macd_fast", 5),
                config.param_usize("macd_slow", 19),
                config.param_usize("macd_smoothing", 9),
            ),
            prev: None,
            swing_lookback: config.param_usize("swing_lookback", 12),
            reward_risk: config.param("rr", 1.5),
            sizing: config.sizing,
            risk_pc: config.risk_pc,
            fixed_size: config.fixed_size,
        }
    }

    fn sizing(&self) -> Sizing {
        match self.sizing {
            SizingKind::Risk => Sizing::Risk {
                risk_pc: self.risk_pc,
            },
            SizingKind::Fixed => Sizing::Fixed {
                size: self.fixed_size.unwrap_or(0.0),
            },
        }
    }

    /// Stop distance from the nearest swing extreme in the lookback window.
    fn swing_stop_distance(&self, ctx: &StrategyContext<'_>, direction: Direction) -> f64 {
        let bars = ctx.bars;
        let window = &bars[bars.len().saturating_sub(self.swing_lookback)..];
        let close = ctx.current_bar().close;
        match direction {
            Direction::Long => {
                let swing_low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
                close - swing_low
            }
            Direction::Short => {
                let swing_high = window
                    .iter()
                    .map(|b| b.high)
                    .fold(f64::NEG_INFINITY, f64::max);
                swing_high - close
            }
        }
    }
}

impl Strategy for MacdCrossover {
    fn name(&self) -> &str {
        "macd_crossover"
    }

    fn on_bar(&mut self, ctx: &StrategyContext<'_>) -> Result<Vec<OrderIntent>, StrategyError> {
        let close = ctx.current_bar().close;
        let trend = self.trend.update(close);
        let point = self.macd.update(close);

        let (Some(trend), Some(point)) = (trend, point) else {
            self.prev = point.or(self.prev);
            return Ok(Vec::new());
        };
        let Some(prev) = self.prev.replace(point) else {
            return Ok(Vec::new());
        };

        let crossed_up = prev.macd <= prev.signal && point.macd > point.signal;
        let crossed_down = prev.macd >= prev.signal && point.macd < point.signal;

        let direction = if crossed_up && point.macd < 0.0 && close > trend {
            Some(Direction::Long)
        } else if crossed_down && point.macd > 0.0 && close < trend {
            Some(Direction::Short)
        } else {
            None
        };

        let Some(direction) = direction else {
            return Ok(Vec::new());
        };

        // A non-positive swing distance is still emitted; sizing rejects it
        // and the rejection shows up in the summary counts.
        let stop_distance = self.swing_stop_distance(ctx, direction);
        Ok(vec![OrderIntent {
            instrument: ctx.instrument.symbol.clone(),
            direction,
            sizing: self.sizing(),
            stop_distance: Some(stop_distance),
            reward_risk: self.reward_risk,
        }])
    }
}
