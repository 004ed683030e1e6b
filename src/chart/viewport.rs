//! Viewport: scale, scroll, selection and auto-follow.
//!
//! Content space is the unscaled horizontal axis where bar `i` sits at
//! `i * point_width + point_width / 2`. The scroll offset is the content
//! coordinate of the left edge: `0` shows the oldest bar, `max_scroll` shows
//! the latest bar with the right margin reserved for the live price tag.

use egui::Pos2;
use serde::{Deserialize, Serialize};

use super::indicator::{MainIndicator, SecondaryIndicator};
use super::object::{drawable, Bar};
use super::style::GeometryStyle;

/// Share of `max_scroll` within which a new bar re-enables auto-follow
const FOLLOW_RESTORE_RATIO: f32 = 0.1;

/// Inclusive index window of the bars on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub start: usize,
    pub stop: usize,
}

impl VisibleRange {
    pub fn count(&self) -> usize {
        self.stop - self.start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.stop).contains(&index)
    }

    pub fn clamp(&self, index: usize) -> usize {
        index.clamp(self.start, self.stop)
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.stop
    }
}

/// Value extent of the price pane over the visible window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MainRange {
    pub max: f64,
    pub min: f64,
    /// Highest high and its index, for the max annotation
    pub high: f64,
    pub high_index: usize,
    /// Lowest low and its index, for the min annotation
    pub low: f64,
    pub low_index: usize,
}

/// Value extent of a secondary pane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub max: f64,
    pub min: f64,
}

impl ValueRange {
    fn fold(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.max = self.max.max(v);
            self.min = self.min.min(v);
        }
    }

    fn empty() -> Self {
        Self {
            max: f64::MIN,
            min: f64::MAX,
        }
    }

    fn is_set(&self) -> bool {
        self.max >= self.min
    }
}

/// Persisted part of the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub scale: f32,
    pub scroll_offset: f32,
    pub auto_follow: bool,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            scroll_offset: 0.0,
            auto_follow: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Viewport {
    scale: f32,
    scroll_offset: f32,
    selection: Option<Pos2>,
    auto_follow: bool,
    user_scrolling: bool,
    /// Offset at the start of the current user scroll
    gesture_origin: f32,
    bar_count: usize,
    draw_width: f32,
    point_width: f32,
    right_margin_ratio: f32,
    min_scale: f32,
    max_scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(&GeometryStyle::default())
    }
}

impl Viewport {
    pub fn new(geometry: &GeometryStyle) -> Self {
        Self {
            scale: 1.0_f32.clamp(geometry.min_scale, geometry.max_scale),
            scroll_offset: 0.0,
            selection: None,
            auto_follow: true,
            user_scrolling: false,
            gesture_origin: 0.0,
            bar_count: 0,
            draw_width: 0.0,
            point_width: geometry.point_width,
            right_margin_ratio: geometry.right_margin_ratio,
            min_scale: geometry.min_scale,
            max_scale: geometry.max_scale,
        }
    }

    /// Pick up geometry changes from a new style
    pub fn apply_geometry(&mut self, geometry: &GeometryStyle) {
        self.point_width = geometry.point_width;
        self.right_margin_ratio = geometry.right_margin_ratio;
        self.min_scale = geometry.min_scale;
        self.max_scale = geometry.max_scale;
        self.scale = self.scale.clamp(self.min_scale, self.max_scale);
        self.clamp_scroll();
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn selection(&self) -> Option<Pos2> {
        self.selection
    }

    pub fn auto_follow(&self) -> bool {
        self.auto_follow
    }

    pub fn is_user_scrolling(&self) -> bool {
        self.user_scrolling
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    pub fn draw_width(&self) -> f32 {
        self.draw_width
    }

    pub fn point_width(&self) -> f32 {
        self.point_width
    }

    pub fn x_to_content(&self, device_x: f32) -> f32 {
        device_x / self.scale + self.scroll_offset
    }

    pub fn content_to_x(&self, content: f32) -> f32 {
        (content - self.scroll_offset) * self.scale
    }

    pub fn content_at_index(&self, index: usize) -> f32 {
        index as f32 * self.point_width + self.point_width / 2.0
    }

    /// Device x of the center of bar `index`
    pub fn index_to_x(&self, index: usize) -> f32 {
        self.content_to_x(self.content_at_index(index))
    }

    /// Nearest bar to a content coordinate. Exact ties go to the later bar.
    pub fn index_at_content(&self, content: f32) -> Option<usize> {
        let last = self.bar_count.checked_sub(1)?;
        let (mut start, mut end) = (0, last);
        loop {
            if start == end {
                return Some(start);
            }
            if end - start == 1 {
                let to_start = (content - self.content_at_index(start)).abs();
                let to_end = (content - self.content_at_index(end)).abs();
                return Some(if to_start < to_end { start } else { end });
            }
            let mid = start + (end - start) / 2;
            let mid_value = self.content_at_index(mid);
            if content < mid_value {
                end = mid;
            } else if content > mid_value {
                start = mid;
            } else {
                return Some(mid);
            }
        }
    }

    pub fn visible_range(&self) -> Option<VisibleRange> {
        let start = self.index_at_content(self.x_to_content(0.0))?;
        let stop = self.index_at_content(self.x_to_content(self.draw_width))?;
        Some(VisibleRange {
            start: start.min(stop),
            stop: stop.max(start),
        })
    }

    pub fn right_margin(&self) -> f32 {
        self.draw_width * self.right_margin_ratio
    }

    pub fn max_scroll(&self) -> f32 {
        Self::max_scroll_for(
            self.bar_count,
            self.draw_width,
            self.point_width,
            self.right_margin_ratio,
            self.scale,
        )
    }

    fn max_scroll_for(
        bar_count: usize,
        draw_width: f32,
        point_width: f32,
        right_margin_ratio: f32,
        scale: f32,
    ) -> f32 {
        let data_len = bar_count as f32 * point_width;
        let margin = draw_width * right_margin_ratio;
        (data_len + margin / scale - draw_width / scale).max(0.0)
    }

    fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.clamp(0.0, self.max_scroll());
    }

    /// Per-frame pass: adopt the surface width and bar count, then clamp or
    /// snap the scroll offset.
    pub fn layout_pass(&mut self, bar_count: usize, draw_width: f32) {
        self.bar_count = bar_count;
        self.draw_width = draw_width.max(0.0);
        if self.auto_follow && !self.user_scrolling {
            self.scroll_offset = self.max_scroll();
        } else {
            self.clamp_scroll();
        }
    }

    /// The series grew to `bar_count` bars. Re-enables auto-follow when the
    /// offset was parked near the previous latest position.
    pub fn on_series_grew(&mut self, bar_count: usize) {
        let previous_max = self.max_scroll();
        if !self.auto_follow && !self.user_scrolling {
            let distance = (previous_max - self.scroll_offset).abs();
            if distance <= previous_max * FOLLOW_RESTORE_RATIO {
                tracing::debug!(offset = self.scroll_offset, "auto-follow restored");
                self.auto_follow = true;
            }
        }

        self.bar_count = bar_count;
        if self.auto_follow && !self.user_scrolling {
            self.scroll_offset = self.max_scroll();
        } else {
            self.clamp_scroll();
        }
    }

    pub fn begin_user_scroll(&mut self) {
        self.user_scrolling = true;
        self.gesture_origin = self.scroll_offset;
    }

    pub fn end_user_scroll(&mut self) {
        self.user_scrolling = false;
    }

    /// Apply a finger drag of `dx` device pixels. Dragging right reveals
    /// older bars.
    pub fn scroll_by_user(&mut self, dx: f32) {
        self.scroll_offset = (self.scroll_offset - dx / self.scale).clamp(0.0, self.max_scroll());
        if (self.scroll_offset - self.gesture_origin).abs() > self.point_width / 2.0 {
            self.auto_follow = false;
        }
    }

    /// Move by `delta` content units. Returns `false` when the offset
    /// saturated at either bound. Auto-follow is cleared only when the
    /// offset ends up short of the latest bar.
    pub fn scroll_by_content(&mut self, delta: f32) -> bool {
        let max = self.max_scroll();
        let target = self.scroll_offset - delta;
        self.scroll_offset = target.clamp(0.0, max);
        if delta != 0.0 && self.scroll_offset < max {
            self.auto_follow = false;
        }
        self.scroll_offset == target
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = if scale.is_finite() {
            scale.clamp(self.min_scale, self.max_scale)
        } else {
            self.scale
        };
    }

    pub fn set_selection(&mut self, selection: Option<Pos2>) {
        self.selection = selection;
    }

    /// Auto-follow on and scroll to the latest bar
    pub fn jump_to_latest(&mut self) {
        self.auto_follow = true;
        self.user_scrolling = false;
        self.selection = None;
        self.scroll_offset = self.max_scroll();
    }

    /// Index under the selection, clamped to the visible window
    pub fn selected_index(&self) -> Option<usize> {
        let selection = self.selection?;
        let range = self.visible_range()?;
        let index = self.index_at_content(self.x_to_content(selection.x))?;
        Some(range.clamp(index))
    }

    pub fn state(&self) -> ViewportState {
        ViewportState {
            scale: self.scale,
            scroll_offset: self.scroll_offset,
            auto_follow: self.auto_follow,
        }
    }

    pub fn restore(&mut self, state: ViewportState) {
        self.set_scale(state.scale);
        self.scroll_offset = state.scroll_offset.max(0.0);
        self.auto_follow = state.auto_follow;
        self.user_scrolling = false;
        self.selection = None;
        self.clamp_scroll();
    }
}

/// Price pane extent over `range`, folding overlay values of `main`.
/// In line mode only closes count.
pub fn min_max_in_range(
    bars: &[Bar],
    range: VisibleRange,
    main: &MainIndicator,
    is_line: bool,
) -> Option<MainRange> {
    let window = bars.get(range.start..=range.stop.min(bars.len().checked_sub(1)?))?;
    let mut extent = ValueRange::empty();
    let mut result = MainRange {
        max: f64::MIN,
        min: f64::MAX,
        high: f64::MIN,
        high_index: range.start,
        low: f64::MAX,
        low_index: range.start,
    };

    for (offset, bar) in window.iter().enumerate() {
        let index = range.start + offset;
        if is_line {
            extent.fold(Some(bar.close));
            continue;
        }

        extent.fold(Some(bar.high));
        extent.fold(Some(bar.low));
        match main {
            MainIndicator::Ma(_) => {
                for period in main.periods() {
                    extent.fold(drawable(bar.values.ma(period)));
                }
            }
            MainIndicator::Ema(_) => {
                for period in main.periods() {
                    extent.fold(drawable(bar.values.ema(period)));
                }
            }
            MainIndicator::Bollinger { .. } => {
                if let Some(boll) = &bar.values.boll {
                    extent.fold(drawable(boll.upper));
                    extent.fold(drawable(boll.lower));
                }
            }
            MainIndicator::None => {}
        }

        if bar.high > result.high {
            result.high = bar.high;
            result.high_index = index;
        }
        if bar.low < result.low {
            result.low = bar.low;
            result.low_index = index;
        }
    }

    if !extent.is_set() {
        return None;
    }
    result.max = extent.max;
    result.min = extent.min;
    if is_line {
        result.high = extent.max;
        result.low = extent.min;
    }
    Some(result)
}

/// Value extent of one secondary pane over `range`. Volume panes are
/// anchored at zero.
pub fn secondary_min_max(
    bars: &[Bar],
    range: VisibleRange,
    indicator: &SecondaryIndicator,
) -> Option<ValueRange> {
    let window = bars.get(range.start..=range.stop.min(bars.len().checked_sub(1)?))?;
    let mut extent = ValueRange::empty();

    for bar in window {
        let values = &bar.values;
        match indicator {
            SecondaryIndicator::Macd(params) => {
                if let Some(macd) = values.macd(*params) {
                    extent.fold(macd.dif);
                    extent.fold(macd.dea);
                    extent.fold(macd.histogram);
                }
            }
            SecondaryIndicator::Kdj(params) => {
                if let Some(kdj) = values.kdj(*params) {
                    extent.fold(kdj.k);
                    extent.fold(kdj.d);
                    extent.fold(kdj.j);
                }
            }
            SecondaryIndicator::Rsi(period) => extent.fold(values.rsi(*period)),
            SecondaryIndicator::WilliamsR(period) => extent.fold(values.wr(*period)),
            SecondaryIndicator::Volume(first, second) => {
                extent.fold(Some(bar.volume));
                extent.fold(values.volume_ma(*first));
                extent.fold(values.volume_ma(*second));
            }
        }
    }

    if let SecondaryIndicator::Volume(..) = indicator {
        extent.fold(Some(0.0));
    }
    extent.is_set().then_some(extent)
}
