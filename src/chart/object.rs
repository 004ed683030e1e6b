//! Bar and per-bar indicator value objects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::indicator::{KdjParams, MacdParams};

/// One OHLCV sample for a fixed interval.
///
/// Field aliases accept the common exchange JSON shape
/// (`id`, `vol`, `count`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(alias = "id")]
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(alias = "vol")]
    pub volume: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, alias = "count")]
    pub trade_count: i64,
    #[serde(skip)]
    pub values: IndicatorValues,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            ..Default::default()
        }
    }

    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// Running-sum moving average state for one period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovingAverage {
    pub value: Option<f64>,
    pub(crate) window_sum: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bollinger {
    pub mid: Option<f64>,
    pub upper: Option<f64>,
    pub lower: Option<f64>,
    pub(crate) window_sum: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Macd {
    pub dif: Option<f64>,
    pub dea: Option<f64>,
    pub histogram: Option<f64>,
    pub(crate) ema_fast: f64,
    pub(crate) ema_slow: f64,
    pub(crate) dea_raw: f64,
}

/// KDJ output. `raw_k`/`raw_d` carry the recursion through the warm-up
/// window even while the displayed values are unset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Kdj {
    pub k: Option<f64>,
    pub d: Option<f64>,
    pub j: Option<f64>,
    pub(crate) raw_k: f64,
    pub(crate) raw_d: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rsi {
    pub rsi: Option<f64>,
    pub(crate) avg_gain: f64,
    pub(crate) avg_loss: f64,
}

/// Indicator fields attached to a bar.
///
/// `None` means "not yet computed" (warm-up). A computed value that hit a
/// zero denominator is `Some(0.0)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorValues {
    pub ma: BTreeMap<usize, MovingAverage>,
    pub ema: BTreeMap<usize, f64>,
    pub volume_ma: BTreeMap<usize, MovingAverage>,
    pub boll: Option<Bollinger>,
    pub macd: BTreeMap<MacdParams, Macd>,
    pub kdj: BTreeMap<KdjParams, Kdj>,
    pub rsi: BTreeMap<usize, Rsi>,
    pub wr: BTreeMap<usize, Option<f64>>,
}

impl IndicatorValues {
    pub fn ma(&self, period: usize) -> Option<f64> {
        self.ma.get(&period).and_then(|m| m.value)
    }

    pub fn ema(&self, period: usize) -> Option<f64> {
        self.ema.get(&period).copied()
    }

    pub fn volume_ma(&self, period: usize) -> Option<f64> {
        self.volume_ma.get(&period).and_then(|m| m.value)
    }

    pub fn macd(&self, params: MacdParams) -> Option<&Macd> {
        self.macd.get(&params)
    }

    pub fn kdj(&self, params: KdjParams) -> Option<&Kdj> {
        self.kdj.get(&params)
    }

    pub fn rsi(&self, period: usize) -> Option<f64> {
        self.rsi.get(&period).and_then(|r| r.rsi)
    }

    pub fn wr(&self, period: usize) -> Option<f64> {
        self.wr.get(&period).copied().flatten()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Filter used by renderers: zero is treated like an unset value.
#[inline]
pub fn drawable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && v.is_finite())
}
