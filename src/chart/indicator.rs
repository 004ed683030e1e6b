//! Technical indicators for charting.
//!
//! Indicator selections are plain values: one [`MainIndicator`] overlay on
//! the price pane plus an ordered [`SecondarySet`] of sub panes. The
//! [`IndicatorEngine`] writes results into each bar's
//! [`IndicatorValues`](super::object::IndicatorValues).
//!
//! Every calculator walks `from..len` and reads its carry state from bar
//! `from - 1`, so a full pass (`from = 0`) and a last-bar pass
//! (`from = len - 1`) perform the same arithmetic per bar.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::object::{Bar, Bollinger, IndicatorValues, Kdj, Macd, MovingAverage, Rsi};

/// Indicator display location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorLocation {
    /// Main price chart
    Main,
    /// Sub chart below main
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KdjParams {
    pub period: usize,
    pub k_smooth: usize,
    pub d_smooth: usize,
}

impl Default for KdjParams {
    fn default() -> Self {
        Self {
            period: 9,
            k_smooth: 3,
            d_smooth: 3,
        }
    }
}

/// Overlay drawn on the price pane. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MainIndicator {
    #[default]
    None,
    Ma([usize; 3]),
    Ema([usize; 3]),
    Bollinger { period: usize, k: f64 },
}

impl MainIndicator {
    pub fn default_ma() -> Self {
        MainIndicator::Ma([5, 10, 30])
    }

    pub fn default_ema() -> Self {
        MainIndicator::Ema([5, 10, 30])
    }

    pub fn default_bollinger() -> Self {
        MainIndicator::Bollinger { period: 20, k: 2.0 }
    }

    /// Periods with a positive length, in selection order
    pub fn periods(&self) -> Vec<usize> {
        match self {
            MainIndicator::Ma(periods) | MainIndicator::Ema(periods) => {
                periods.iter().copied().filter(|p| *p > 0).collect()
            }
            MainIndicator::Bollinger { period, .. } if *period > 0 => vec![*period],
            _ => Vec::new(),
        }
    }
}

/// Indicator occupying its own pane. Equality and hashing are by kind and
/// parameters so a [`SecondarySet`] can toggle entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecondaryIndicator {
    Macd(MacdParams),
    Kdj(KdjParams),
    Rsi(usize),
    WilliamsR(usize),
    Volume(usize, usize),
}

impl SecondaryIndicator {
    pub fn default_macd() -> Self {
        SecondaryIndicator::Macd(MacdParams::default())
    }

    pub fn default_kdj() -> Self {
        SecondaryIndicator::Kdj(KdjParams::default())
    }

    pub fn default_volume() -> Self {
        SecondaryIndicator::Volume(5, 10)
    }
}

/// Ordered, duplicate-free set of secondary panes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SecondaryIndicator>", into = "Vec<SecondaryIndicator>")]
pub struct SecondarySet {
    items: Vec<SecondaryIndicator>,
}

impl SecondarySet {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add at the end. Returns false if already present.
    pub fn insert(&mut self, indicator: SecondaryIndicator) -> bool {
        if self.items.contains(&indicator) {
            return false;
        }
        self.items.push(indicator);
        true
    }

    pub fn remove(&mut self, indicator: &SecondaryIndicator) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item != indicator);
        self.items.len() != before
    }

    /// Flip membership. Returns true if the indicator is now active.
    pub fn toggle(&mut self, indicator: SecondaryIndicator) -> bool {
        if self.remove(&indicator) {
            false
        } else {
            self.items.push(indicator);
            true
        }
    }

    pub fn contains(&self, indicator: &SecondaryIndicator) -> bool {
        self.items.contains(indicator)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SecondaryIndicator> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl From<Vec<SecondaryIndicator>> for SecondarySet {
    fn from(items: Vec<SecondaryIndicator>) -> Self {
        let mut set = SecondarySet::new();
        for item in items {
            set.insert(item);
        }
        set
    }
}

impl From<SecondarySet> for Vec<SecondaryIndicator> {
    fn from(set: SecondarySet) -> Self {
        set.items
    }
}

impl FromIterator<SecondaryIndicator> for SecondarySet {
    fn from_iter<T: IntoIterator<Item = SecondaryIndicator>>(iter: T) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl<'a> IntoIterator for &'a SecondarySet {
    type Item = &'a SecondaryIndicator;
    type IntoIter = std::slice::Iter<'a, SecondaryIndicator>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Base trait for all indicator selections
pub trait Indicator {
    /// Short display name, e.g. `MACD(12,26,9)`
    fn name(&self) -> String;

    /// Display location (main or sub chart)
    fn location(&self) -> IndicatorLocation;

    /// Write values for bars `from..len`, reading carry state from bar
    /// `from - 1`
    fn calculate(&self, bars: &mut [Bar], from: usize);
}

impl Indicator for MainIndicator {
    fn name(&self) -> String {
        match self {
            MainIndicator::None => String::new(),
            MainIndicator::Ma(p) => format!("MA({},{},{})", p[0], p[1], p[2]),
            MainIndicator::Ema(p) => format!("EMA({},{},{})", p[0], p[1], p[2]),
            MainIndicator::Bollinger { period, k } => format!("BOLL({},{})", period, k),
        }
    }

    fn location(&self) -> IndicatorLocation {
        IndicatorLocation::Main
    }

    fn calculate(&self, bars: &mut [Bar], from: usize) {
        match *self {
            MainIndicator::None => {}
            MainIndicator::Ma(periods) => {
                for period in periods {
                    calc_close_ma(bars, period, from);
                }
            }
            MainIndicator::Ema(periods) => {
                for period in periods {
                    calc_ema(bars, period, from);
                }
            }
            MainIndicator::Bollinger { period, k } => calc_boll(bars, period, k, from),
        }
    }
}

impl Indicator for SecondaryIndicator {
    fn name(&self) -> String {
        match self {
            SecondaryIndicator::Macd(p) => format!("MACD({},{},{})", p.fast, p.slow, p.signal),
            SecondaryIndicator::Kdj(p) => format!("KDJ({},{},{})", p.period, p.k_smooth, p.d_smooth),
            SecondaryIndicator::Rsi(p) => format!("RSI({})", p),
            SecondaryIndicator::WilliamsR(p) => format!("WR({})", p),
            SecondaryIndicator::Volume(a, b) => format!("VOL({},{})", a, b),
        }
    }

    fn location(&self) -> IndicatorLocation {
        IndicatorLocation::Sub
    }

    fn calculate(&self, bars: &mut [Bar], from: usize) {
        match *self {
            SecondaryIndicator::Macd(params) => calc_macd(bars, params, from),
            SecondaryIndicator::Kdj(params) => calc_kdj(bars, params, from),
            SecondaryIndicator::Rsi(period) => calc_rsi(bars, period, from),
            SecondaryIndicator::WilliamsR(period) => calc_wr(bars, period, from),
            SecondaryIndicator::Volume(p1, p2) => {
                calc_volume_ma(bars, p1, from);
                calc_volume_ma(bars, p2, from);
            }
        }
    }
}

/// Computes indicator fields for the active selections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorEngine {
    main: MainIndicator,
    secondary: SecondarySet,
}

impl IndicatorEngine {
    pub fn new(main: MainIndicator, secondary: SecondarySet) -> Self {
        Self { main, secondary }
    }

    pub fn main(&self) -> &MainIndicator {
        &self.main
    }

    pub fn secondary(&self) -> &SecondarySet {
        &self.secondary
    }

    pub fn set_main(&mut self, main: MainIndicator) {
        self.main = main;
    }

    pub fn set_secondary(&mut self, secondary: SecondarySet) {
        self.secondary = secondary;
    }

    /// Flip one secondary pane; returns true if it is now active
    pub fn toggle_secondary(&mut self, indicator: SecondaryIndicator) -> bool {
        self.secondary.toggle(indicator)
    }

    /// Clear every bar's fields and recompute the active selections from
    /// index 0
    pub fn recompute_all(&self, bars: &mut [Bar]) {
        for bar in bars.iter_mut() {
            bar.values.clear();
        }
        self.calculate_from(bars, 0);
        tracing::debug!(
            count = bars.len(),
            main = %self.main.name(),
            secondary = self.secondary.len(),
            "indicators recomputed"
        );
    }

    /// Recompute only the last bar from the previous bar's carry state
    pub fn recompute_incremental(&self, bars: &mut [Bar]) {
        if let Some(last) = bars.len().checked_sub(1) {
            self.calculate_from(bars, last);
        }
    }

    fn calculate_from(&self, bars: &mut [Bar], from: usize) {
        self.main.calculate(bars, from);
        for indicator in &self.secondary {
            indicator.calculate(bars, from);
        }
    }
}

/// Sum of `source` over the window of `period` bars ending at `end`
/// (inclusive), clamped at index 0.
fn window_sum(bars: &[Bar], period: usize, end: usize, source: fn(&Bar) -> f64) -> f64 {
    let start = (end + 1).saturating_sub(period);
    bars[start..=end].iter().map(source).sum()
}

fn window_high_low(bars: &[Bar], period: usize, end: usize) -> (f64, f64) {
    let start = (end + 1).saturating_sub(period);
    bars[start..=end]
        .iter()
        .fold((f64::MIN, f64::MAX), |(high, low), bar| {
            (high.max(bar.high), low.min(bar.low))
        })
}

/// Running-sum mean shared by price MA and volume MA
fn calc_running_mean(
    bars: &mut [Bar],
    period: usize,
    from: usize,
    source: fn(&Bar) -> f64,
    slot: fn(&mut IndicatorValues) -> &mut BTreeMap<usize, MovingAverage>,
) {
    if period == 0 {
        return;
    }

    for i in from..bars.len() {
        let mut sum = if i == 0 {
            0.0
        } else {
            let carried = slot(&mut bars[i - 1].values).get(&period).map(|prev| prev.window_sum);
            carried.unwrap_or_else(|| window_sum(bars, period, i - 1, source))
        };

        sum += source(&bars[i]);
        if i >= period {
            sum -= source(&bars[i - period]);
        }

        let value = if i + 1 >= period {
            Some(sum / period as f64)
        } else {
            None
        };

        slot(&mut bars[i].values).insert(
            period,
            MovingAverage {
                value,
                window_sum: sum,
            },
        );
    }
}

fn calc_close_ma(bars: &mut [Bar], period: usize, from: usize) {
    calc_running_mean(bars, period, from, |bar| bar.close, |values| &mut values.ma);
}

fn calc_volume_ma(bars: &mut [Bar], period: usize, from: usize) {
    calc_running_mean(bars, period, from, |bar| bar.volume, |values| &mut values.volume_ma);
}

fn calc_ema(bars: &mut [Bar], period: usize, from: usize) {
    if period == 0 {
        return;
    }
    let alpha = 2.0 / (period as f64 + 1.0);

    for i in from..bars.len() {
        let close = bars[i].close;
        let prev = if i == 0 {
            None
        } else {
            bars[i - 1].values.ema(period)
        };
        let ema = match prev {
            Some(prev) => prev + (close - prev) * alpha,
            None => close,
        };
        bars[i].values.ema.insert(period, ema);
    }
}

fn calc_boll(bars: &mut [Bar], period: usize, k: f64, from: usize) {
    if period == 0 {
        return;
    }

    for i in from..bars.len() {
        let mut sum = if i == 0 {
            0.0
        } else {
            match bars[i - 1].values.boll {
                Some(prev) => prev.window_sum,
                None => window_sum(bars, period, i - 1, |bar| bar.close),
            }
        };
        sum += bars[i].close;
        if i >= period {
            sum -= bars[i - period].close;
        }

        let mut boll = Bollinger {
            window_sum: sum,
            ..Default::default()
        };

        if i + 1 >= period {
            let mid = sum / period as f64;
            let variance = bars[i + 1 - period..=i]
                .iter()
                .map(|bar| (bar.close - mid).powi(2))
                .sum::<f64>()
                / period as f64;
            let std_dev = variance.sqrt();

            boll.mid = Some(mid);
            boll.upper = Some(mid + k * std_dev);
            boll.lower = Some(mid - k * std_dev);
        }

        bars[i].values.boll = Some(boll);
    }
}

fn calc_macd(bars: &mut [Bar], params: MacdParams, from: usize) {
    if params.fast == 0 || params.slow == 0 || params.signal == 0 {
        return;
    }
    let fast_alpha = 2.0 / (params.fast as f64 + 1.0);
    let slow_alpha = 2.0 / (params.slow as f64 + 1.0);
    let signal_alpha = 2.0 / (params.signal as f64 + 1.0);

    for i in from..bars.len() {
        let close = bars[i].close;
        let prev = if i == 0 {
            None
        } else {
            bars[i - 1].values.macd(params).copied()
        };

        let (ema_fast, ema_slow, dea) = match prev {
            Some(prev) => {
                let ema_fast = prev.ema_fast + (close - prev.ema_fast) * fast_alpha;
                let ema_slow = prev.ema_slow + (close - prev.ema_slow) * slow_alpha;
                let dif = ema_fast - ema_slow;
                (ema_fast, ema_slow, prev.dea_raw + (dif - prev.dea_raw) * signal_alpha)
            }
            None => (close, close, 0.0),
        };
        let dif = ema_fast - ema_slow;

        bars[i].values.macd.insert(
            params,
            Macd {
                dif: Some(dif),
                dea: Some(dea),
                histogram: Some((dif - dea) * 2.0),
                ema_fast,
                ema_slow,
                dea_raw: dea,
            },
        );
    }
}

fn calc_kdj(bars: &mut [Bar], params: KdjParams, from: usize) {
    let KdjParams {
        period,
        k_smooth,
        d_smooth,
    } = params;
    if period == 0 || k_smooth == 0 || d_smooth == 0 {
        return;
    }

    for i in from..bars.len() {
        let (high, low) = window_high_low(bars, period, i);
        let range = high - low;
        let rsv = if range == 0.0 || !range.is_finite() {
            0.0
        } else {
            100.0 * (bars[i].close - low) / range
        };

        let prev = if i == 0 {
            None
        } else {
            bars[i - 1].values.kdj(params).copied()
        };
        let (raw_k, raw_d) = match prev {
            Some(prev) => {
                let k = (rsv + (k_smooth as f64 - 1.0) * prev.raw_k) / k_smooth as f64;
                let d = (k + (d_smooth as f64 - 1.0) * prev.raw_d) / d_smooth as f64;
                (k, d)
            }
            None => (50.0, 50.0),
        };

        let mut kdj = Kdj {
            raw_k,
            raw_d,
            ..Default::default()
        };
        // two-bar warm-up: k alone at period-1 and period
        if i + 1 >= period {
            kdj.k = Some(raw_k);
        }
        if i > period {
            kdj.d = Some(raw_d);
            kdj.j = Some(3.0 * raw_k - 2.0 * raw_d);
        }

        bars[i].values.kdj.insert(params, kdj);
    }
}

fn calc_rsi(bars: &mut [Bar], period: usize, from: usize) {
    if period == 0 {
        return;
    }
    let weight = period as f64;

    for i in from..bars.len() {
        let (avg_gain, avg_loss) = if i == 0 {
            (0.0, 0.0)
        } else {
            let delta = bars[i].close - bars[i - 1].close;
            let (prev_gain, prev_loss) = bars[i - 1]
                .values
                .rsi
                .get(&period)
                .map(|prev| (prev.avg_gain, prev.avg_loss))
                .unwrap_or((0.0, 0.0));
            (
                (delta.max(0.0) + (weight - 1.0) * prev_gain) / weight,
                (delta.abs() + (weight - 1.0) * prev_loss) / weight,
            )
        };

        let rsi = if i + 1 < period {
            None
        } else if avg_loss == 0.0 {
            Some(0.0)
        } else {
            Some(100.0 * avg_gain / avg_loss)
        };

        bars[i].values.rsi.insert(
            period,
            Rsi {
                rsi,
                avg_gain,
                avg_loss,
            },
        );
    }
}

fn calc_wr(bars: &mut [Bar], period: usize, from: usize) {
    if period == 0 {
        return;
    }

    for i in from..bars.len() {
        let value = if i + 1 < period {
            None
        } else {
            let (high, low) = window_high_low(bars, period, i);
            let range = high - low;
            if range == 0.0 {
                Some(0.0)
            } else {
                Some(100.0 * (high - bars[i].close) / range)
            }
        };
        bars[i].values.wr.insert(period, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_bar(ix: usize, close: f64) -> Bar {
        Bar::new(ix as i64 * 60, close, close + 1.5, close - 1.0, close, 100.0 + ix as f64 * 7.0)
    }

    fn wavy_series(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                create_test_bar(i, 100.0 + (x * 0.37).sin() * 8.0 + x * 0.11)
            })
            .collect()
    }

    fn all_selections() -> Vec<(MainIndicator, SecondarySet)> {
        let secondary: SecondarySet = vec![
            SecondaryIndicator::default_macd(),
            SecondaryIndicator::Macd(MacdParams { fast: 5, slow: 35, signal: 5 }),
            SecondaryIndicator::default_kdj(),
            SecondaryIndicator::Kdj(KdjParams { period: 14, k_smooth: 3, d_smooth: 3 }),
            SecondaryIndicator::Rsi(6),
            SecondaryIndicator::Rsi(14),
            SecondaryIndicator::WilliamsR(14),
            SecondaryIndicator::WilliamsR(1),
            SecondaryIndicator::default_volume(),
            SecondaryIndicator::Volume(0, 20),
        ]
        .into();

        vec![
            (MainIndicator::default_ma(), secondary.clone()),
            (MainIndicator::Ma([1, 7, 60]), SecondarySet::new()),
            (MainIndicator::default_ema(), secondary.clone()),
            (MainIndicator::default_bollinger(), secondary.clone()),
            (MainIndicator::Bollinger { period: 5, k: 1.5 }, secondary),
            (MainIndicator::None, SecondarySet::new()),
        ]
    }

    #[test]
    fn test_ma_warm_up_and_value() {
        let mut bars = wavy_series(40);
        let engine = IndicatorEngine::new(MainIndicator::Ma([5, 10, 20]), SecondarySet::new());
        engine.recompute_all(&mut bars);

        for p in [5usize, 10, 20] {
            let mean = bars[..p].iter().map(|b| b.close).sum::<f64>() / p as f64;
            let value = bars[p - 1].values.ma(p).unwrap();
            assert!((value - mean).abs() < 1e-9);
            for bar in &bars[..p - 1] {
                assert_eq!(bar.values.ma(p), None);
            }
        }
    }

    #[test]
    fn test_flat_bars_ma() {
        let mut bars: Vec<Bar> = (0..30).map(|i| Bar::new(i, 100.0, 105.0, 95.0, 100.0, 1.0)).collect();
        let engine = IndicatorEngine::new(MainIndicator::Ma([5, 10, 30]), SecondarySet::new());
        engine.recompute_all(&mut bars);

        assert_eq!(bars[4].values.ma(5), Some(100.0));
        assert_eq!(bars[3].values.ma(5), None);
        assert_eq!(bars[29].values.ma(30), Some(100.0));
    }

    #[test]
    fn test_ema_seeded_at_first_close() {
        let mut bars = wavy_series(10);
        let engine = IndicatorEngine::new(MainIndicator::Ema([3, 12, 26]), SecondarySet::new());
        engine.recompute_all(&mut bars);

        for p in [3usize, 12, 26] {
            assert_eq!(bars[0].values.ema(p), Some(bars[0].close));
        }
        let expected = bars[0].close + (bars[1].close - bars[0].close) * 2.0 / 4.0;
        assert!((bars[1].values.ema(3).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_bollinger_bands() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, c)| create_test_bar(i, *c))
            .collect();
        let engine = IndicatorEngine::new(MainIndicator::Bollinger { period: 5, k: 2.0 }, SecondarySet::new());
        engine.recompute_all(&mut bars);

        let boll = bars[4].values.boll.unwrap();
        let std_dev = 2.0_f64.sqrt();
        assert_eq!(boll.mid, Some(3.0));
        assert!((boll.upper.unwrap() - (3.0 + 2.0 * std_dev)).abs() < 1e-12);
        assert!((boll.lower.unwrap() - (3.0 - 2.0 * std_dev)).abs() < 1e-12);
        assert_eq!(bars[3].values.boll.unwrap().mid, None);
    }

    #[test]
    fn test_macd_seed() {
        let mut bars = wavy_series(30);
        let params = MacdParams::default();
        let engine = IndicatorEngine::new(MainIndicator::None, vec![SecondaryIndicator::Macd(params)].into());
        engine.recompute_all(&mut bars);

        let first = bars[0].values.macd(params).unwrap();
        assert_eq!(first.dif, Some(0.0));
        assert_eq!(first.dea, Some(0.0));
        assert_eq!(first.histogram, Some(0.0));

        let last = bars[29].values.macd(params).unwrap();
        let (dif, dea) = (last.dif.unwrap(), last.dea.unwrap());
        assert!((last.histogram.unwrap() - (dif - dea) * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_kdj_warm_up() {
        let mut bars: Vec<Bar> = (0..20).map(|i| create_test_bar(i, 10.0 + i as f64)).collect();
        let params = KdjParams::default();
        let engine = IndicatorEngine::new(MainIndicator::None, vec![SecondaryIndicator::Kdj(params)].into());
        engine.recompute_all(&mut bars);

        for bar in &bars[..8] {
            let kdj = bar.values.kdj(params).unwrap();
            assert_eq!((kdj.k, kdj.d, kdj.j), (None, None, None));
        }
        for ix in [8, 9] {
            let kdj = bars[ix].values.kdj(params).unwrap();
            assert!(kdj.k.is_some());
            assert_eq!((kdj.d, kdj.j), (None, None));
        }
        for bar in &bars[10..] {
            let kdj = bar.values.kdj(params).unwrap();
            let (k, d) = (kdj.k.unwrap(), kdj.d.unwrap());
            assert!(kdj.j.is_some());
            assert!(k >= d);
        }
    }

    #[test]
    fn test_rsi_and_wr_edges() {
        let mut bars: Vec<Bar> = (0..20).map(|i| Bar::new(i, 5.0, 5.0, 5.0, 5.0, 1.0)).collect();
        let engine = IndicatorEngine::new(
            MainIndicator::None,
            vec![SecondaryIndicator::Rsi(14), SecondaryIndicator::WilliamsR(14)].into(),
        );
        engine.recompute_all(&mut bars);

        assert_eq!(bars[12].values.rsi(14), None);
        assert_eq!(bars[13].values.rsi(14), Some(0.0));
        assert_eq!(bars[12].values.wr(14), None);
        assert_eq!(bars[13].values.wr(14), Some(0.0));
    }

    #[test]
    fn test_rsi_all_gains() {
        let mut bars: Vec<Bar> = (0..10).map(|i| create_test_bar(i, 1.0 + i as f64)).collect();
        let engine = IndicatorEngine::new(MainIndicator::None, vec![SecondaryIndicator::Rsi(6)].into());
        engine.recompute_all(&mut bars);
        assert!((bars[9].values.rsi(6).unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_incremental_equivalence() {
        let source = wavy_series(80);

        for (main, secondary) in all_selections() {
            let engine = IndicatorEngine::new(main, secondary);

            let mut full = source.clone();
            engine.recompute_all(&mut full);

            let mut incremental: Vec<Bar> = Vec::new();
            for bar in &source {
                incremental.push(bar.clone());
                engine.recompute_incremental(&mut incremental);
            }

            assert_eq!(full.len(), incremental.len());
            for (a, b) in full.iter().zip(&incremental) {
                assert_eq!(a.values, b.values, "mismatch for {}", main.name());
            }
        }
    }

    #[test]
    fn test_incremental_after_last_bar_update() {
        let mut source = wavy_series(30);
        let engine = IndicatorEngine::new(MainIndicator::default_ma(), vec![SecondaryIndicator::default_kdj()].into());

        let mut live = source.clone();
        engine.recompute_all(&mut live);

        // tick the last bar twice
        for close in [120.0, 95.5] {
            let last = live.len() - 1;
            live[last].close = close;
            engine.recompute_incremental(&mut live);
            source[last].close = close;
        }

        engine.recompute_all(&mut source);
        assert_eq!(source.last().unwrap().values, live.last().unwrap().values);
    }

    #[test]
    fn test_secondary_set_toggle() {
        let mut set = SecondarySet::new();
        assert!(set.toggle(SecondaryIndicator::Rsi(14)));
        assert!(set.insert(SecondaryIndicator::Rsi(6)));
        assert!(!set.insert(SecondaryIndicator::Rsi(14)));
        assert_eq!(set.len(), 2);

        assert!(!set.toggle(SecondaryIndicator::Rsi(14)));
        assert!(!set.contains(&SecondaryIndicator::Rsi(14)));
        assert_eq!(set.iter().next(), Some(&SecondaryIndicator::Rsi(6)));
    }

    #[test]
    fn test_secondary_set_dedups_on_deserialize() {
        let json = r#"[{"Rsi":14},{"Rsi":14},{"Volume":[5,10]}]"#;
        let set: SecondarySet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_zero_period_is_skipped() {
        let mut bars = wavy_series(5);
        let engine = IndicatorEngine::new(MainIndicator::Ma([0, 2, 0]), SecondarySet::new());
        engine.recompute_all(&mut bars);
        assert!(!bars[4].values.ma.contains_key(&0));
        assert!(bars[4].values.ma(2).is_some());
    }
}
