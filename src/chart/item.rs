//! Chart items: per-pane renderers for candles, overlays, volume and the
//! oscillator panes.

use egui::{Align2, Color32, Pos2, Rect, Stroke};

use super::frame::{DrawCommand, Frame, Layer, TextMeasure};
use super::indicator::{MainIndicator, SecondaryIndicator};
use super::object::{drawable, Bar};
use super::style::{ChartStyle, NumberFormat};
use super::viewport::{min_max_in_range, secondary_min_max, MainRange, Viewport, VisibleRange};

/// Samples per smoothed line segment
const CURVE_STEPS: usize = 8;
/// Horizontal inset of legend text
const LEGEND_INSET: f32 = 5.0;
const LEGEND_GAP: &str = "    ";

/// Everything a renderer reads for one frame
pub struct DrawContext<'a> {
    pub bars: &'a [Bar],
    pub viewport: &'a Viewport,
    pub range: VisibleRange,
    pub style: &'a ChartStyle,
    pub format: &'a NumberFormat,
    pub measure: &'a dyn TextMeasure,
    /// Left edge of the surface in device coordinates
    pub origin_x: f32,
    pub width: f32,
}

impl DrawContext<'_> {
    /// Device x of bar `index`
    pub fn x(&self, index: usize) -> f32 {
        self.origin_x + self.viewport.index_to_x(index)
    }

    pub fn text_size(&self) -> f32 {
        self.style.geometry.text_size
    }

    /// (previous, current) index pairs ending inside the visible window
    fn segments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let len = self.bars.len();
        self.range
            .indices()
            .filter(move |i| *i > 0 && *i < len)
            .map(|i| (i - 1, i))
    }
}

/// Maps values to device y inside a chart rect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueAxis {
    pub rect: Rect,
    pub max: f64,
    pub min: f64,
    scale_y: f64,
}

impl ValueAxis {
    pub fn new(rect: Rect, max: f64, min: f64) -> Self {
        let (max, min) = if max == min { (max + 0.5, min - 0.5) } else { (max, min) };
        let scale_y = rect.height() as f64 / (max - min);
        Self {
            rect,
            max,
            min,
            scale_y,
        }
    }

    /// Widen the range so `padding` pixels are split above and below the
    /// data.
    pub fn with_content_padding(rect: Rect, max: f64, min: f64, padding: f32) -> Self {
        let mut axis = Self::new(rect, max, min);
        let diff = axis.max - axis.min;
        let usable = rect.height() as f64 - padding as f64;
        if usable <= 0.0 {
            return axis;
        }
        let padded_scale = usable / diff;
        let padded_diff = rect.height() as f64 / padded_scale;
        if padded_diff > diff {
            let extra = (padded_diff - diff) / 2.0;
            axis.max += extra;
            axis.min -= extra;
            axis.scale_y = padded_scale;
        }
        axis
    }

    pub fn get_y(&self, value: f64) -> f32 {
        ((self.max - value) * self.scale_y) as f32 + self.rect.top()
    }

    /// Value at device `y`
    pub fn value_at(&self, y: f32) -> f64 {
        if self.scale_y == 0.0 {
            return self.min;
        }
        self.max - (y - self.rect.top()) as f64 / self.scale_y
    }

    fn clamp_y(&self, y: f32) -> f32 {
        y.clamp(self.rect.top(), self.rect.bottom().max(self.rect.top()))
    }
}

/// Pane rect minus the legend strip at its top
pub fn chart_rect(pane: Rect, style: &ChartStyle) -> Rect {
    let strip = style.geometry.text_size + 4.0;
    Rect::from_min_max(
        Pos2::new(pane.left(), (pane.top() + strip).min(pane.bottom())),
        pane.max,
    )
}

/// Trait for chart items that can be drawn
pub trait ChartItem {
    /// Value axis over the visible window, `None` when nothing is drawable
    fn axis(&self, ctx: &DrawContext<'_>, pane: Rect) -> Option<ValueAxis>;

    fn draw(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame);

    /// Legend entries for `bar`
    fn legend(&self, ctx: &DrawContext<'_>, bar: &Bar) -> Vec<(String, Color32)>;

    fn draw_grid(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame) {
        let style = &ctx.style.background;
        let stroke = Stroke::new(style.grid_line_width, style.grid);
        let rect = axis.rect;
        frame.segment(Layer::Grid, rect.left_top(), rect.right_top(), stroke);
        frame.segment(Layer::Grid, rect.left_bottom(), rect.right_bottom(), stroke);
        draw_grid_columns(ctx, rect, frame);
    }

    fn draw_right_text(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame) {
        let color = ctx.style.text.price_text;
        let size = ctx.text_size();
        let rect = axis.rect;
        frame.text(
            Layer::Labels,
            Pos2::new(rect.right(), rect.top() + 2.0),
            Align2::RIGHT_TOP,
            self.axis_label(ctx, axis.max),
            size,
            color,
        );
        frame.text(
            Layer::Labels,
            Pos2::new(rect.right(), rect.bottom() - 2.0),
            Align2::RIGHT_BOTTOM,
            self.axis_label(ctx, axis.min),
            size,
            color,
        );
    }

    fn axis_label(&self, ctx: &DrawContext<'_>, value: f64) -> String {
        ctx.format.price(value)
    }
}

fn draw_grid_columns(ctx: &DrawContext<'_>, rect: Rect, frame: &mut Frame) {
    let style = &ctx.style.background;
    let stroke = Stroke::new(style.grid_line_width, style.grid);
    let columns = ctx.style.geometry.grid_columns.max(1);
    let space = ctx.width / columns as f32;
    for i in 1..columns {
        let x = ctx.origin_x + space * i as f32;
        frame.segment(
            Layer::Grid,
            Pos2::new(x, rect.top()),
            Pos2::new(x, rect.bottom()),
            stroke,
        );
    }
}

/// Lay legend entries out left to right in the strip above `chart`
pub fn draw_legend(
    ctx: &DrawContext<'_>,
    chart: Rect,
    entries: Vec<(String, Color32)>,
    frame: &mut Frame,
) {
    let size = ctx.text_size();
    let gap = ctx.measure.text_width(LEGEND_GAP, size);
    let y = chart.top() - size - 4.0 + 2.0;
    let mut x = chart.left() + LEGEND_INSET;
    for (text, color) in entries {
        let width = ctx.measure.text_width(&text, size);
        frame.text(Layer::Labels, Pos2::new(x, y), Align2::LEFT_TOP, text, size, color);
        x += width + gap;
    }
}

/// Segment between two optional values, skipped unless both are drawable
#[allow(clippy::too_many_arguments)]
fn value_segment(
    ctx: &DrawContext<'_>,
    axis: &ValueAxis,
    (prev, cur): (usize, usize),
    values: (Option<f64>, Option<f64>),
    color: Color32,
    layer: Layer,
    clamp: bool,
    frame: &mut Frame,
) {
    let (Some(a), Some(b)) = (drawable(values.0), drawable(values.1)) else {
        return;
    };
    let (mut ya, mut yb) = (axis.get_y(a), axis.get_y(b));
    if clamp {
        ya = axis.clamp_y(ya);
        yb = axis.clamp_y(yb);
    }
    frame.segment(
        layer,
        Pos2::new(ctx.x(prev), ya),
        Pos2::new(ctx.x(cur), yb),
        Stroke::new(ctx.style.geometry.line_width, color),
    );
}

/// Price pane: candles or the close line plus the active overlay
pub struct MainItem {
    pub main: MainIndicator,
    pub is_line: bool,
}

impl MainItem {
    pub fn new(main: MainIndicator, is_line: bool) -> Self {
        Self { main, is_line }
    }

    pub fn range(&self, ctx: &DrawContext<'_>) -> Option<MainRange> {
        min_max_in_range(ctx.bars, ctx.range, &self.main, self.is_line)
    }

    fn draw_candles(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame) {
        let geometry = &ctx.style.geometry;
        let half = geometry.candle_width * ctx.viewport.scale() / 2.0;
        for i in ctx.range.indices() {
            let Some(bar) = ctx.bars.get(i) else { break };
            let x = ctx.x(i);
            let color = if bar.close > bar.open {
                ctx.style.candle.up_color
            } else {
                ctx.style.candle.down_color
            };
            let stroke = Stroke::new(geometry.candle_line_width, color);

            let high = axis.get_y(bar.high);
            let low = axis.get_y(bar.low);
            let open = axis.get_y(bar.open);
            let close = axis.get_y(bar.close);
            let body_top = open.min(close);
            let body_bottom = open.max(close);

            if high < body_top {
                frame.segment(Layer::MainBars, Pos2::new(x, high), Pos2::new(x, body_top), stroke);
            }
            if low > body_bottom {
                frame.segment(Layer::MainBars, Pos2::new(x, body_bottom), Pos2::new(x, low), stroke);
            }

            if bar.open != bar.close {
                let body = Rect::from_min_max(
                    Pos2::new(x - half, body_top),
                    Pos2::new(x + half, body_bottom),
                );
                let fill = if ctx.style.candle.solid {
                    color
                } else {
                    Color32::TRANSPARENT
                };
                frame.push(
                    Layer::MainBars,
                    DrawCommand::Rect {
                        rect: body,
                        fill,
                        stroke,
                        corner_radius: 0.0,
                    },
                );
            } else {
                frame.segment(
                    Layer::MainBars,
                    Pos2::new(x - half, open),
                    Pos2::new(x + half, open),
                    stroke,
                );
            }
        }
    }

    fn draw_close_line(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame) {
        let mut anchors: Vec<Pos2> = ctx
            .range
            .indices()
            .filter_map(|i| ctx.bars.get(i).map(|bar| Pos2::new(ctx.x(i), axis.get_y(bar.close))))
            .collect();
        let Some(first) = anchors.first().copied() else {
            return;
        };
        if ctx.range.start == 0 {
            anchors.insert(0, Pos2::new(ctx.origin_x, first.y));
        }

        let points = smooth(&anchors);
        let style = &ctx.style.line_chart;
        frame.push(
            Layer::MainBars,
            DrawCommand::GradientArea {
                points: points.clone(),
                baseline: axis.rect.bottom(),
                top: style.shadow_top,
                bottom: style.shadow_bottom,
            },
        );
        frame.push(
            Layer::MainBars,
            DrawCommand::Polyline {
                points,
                stroke: Stroke::new(style.width, style.line),
            },
        );
    }

    fn draw_overlay(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame) {
        for pair in ctx.segments() {
            let (prev, cur) = (&ctx.bars[pair.0].values, &ctx.bars[pair.1].values);
            match &self.main {
                MainIndicator::Ma(_) => {
                    for (slot, period) in self.main.periods().into_iter().enumerate() {
                        let color = ctx.style.ma.color_for(period, slot);
                        let values = (prev.ma(period), cur.ma(period));
                        value_segment(ctx, axis, pair, values, color, Layer::MainOverlay, true, frame);
                    }
                }
                MainIndicator::Ema(_) => {
                    for (slot, period) in self.main.periods().into_iter().enumerate() {
                        let color = ctx.style.ema.color_for(period, slot);
                        let values = (prev.ema(period), cur.ema(period));
                        value_segment(ctx, axis, pair, values, color, Layer::MainOverlay, true, frame);
                    }
                }
                MainIndicator::Bollinger { .. } => {
                    let (Some(a), Some(b)) = (prev.boll, cur.boll) else {
                        continue;
                    };
                    let boll = &ctx.style.boll;
                    for (values, color) in [
                        ((a.upper, b.upper), boll.upper),
                        ((a.mid, b.mid), boll.middle),
                        ((a.lower, b.lower), boll.lower),
                    ] {
                        value_segment(ctx, axis, pair, values, color, Layer::MainOverlay, true, frame);
                    }
                }
                MainIndicator::None => return,
            }
        }
    }

    /// Highest high and lowest low markers, pointing inward
    pub fn draw_max_min(
        &self,
        ctx: &DrawContext<'_>,
        axis: &ValueAxis,
        range: &MainRange,
        frame: &mut Frame,
    ) {
        if self.is_line {
            return;
        }
        let color = ctx.style.text.max_min_text;
        let size = ctx.text_size();
        let middle = ctx.origin_x + ctx.width / 2.0;
        for (index, value) in [(range.low_index, range.low), (range.high_index, range.high)] {
            let x = ctx.x(index);
            let y = axis.get_y(value);
            let label = ctx.format.price(value);
            let (text, anchor) = if x < middle {
                (format!("── {}", label), Align2::LEFT_CENTER)
            } else {
                (format!("{} ──", label), Align2::RIGHT_CENTER)
            };
            frame.text(Layer::MainOverlay, Pos2::new(x, y), anchor, text, size, color);
        }
    }

    /// Axis from an already computed range
    pub fn axis_for(&self, ctx: &DrawContext<'_>, pane: Rect, range: &MainRange) -> ValueAxis {
        ValueAxis::with_content_padding(
            chart_rect(pane, ctx.style),
            range.max,
            range.min,
            ctx.style.geometry.content_padding,
        )
    }
}

impl ChartItem for MainItem {
    fn axis(&self, ctx: &DrawContext<'_>, pane: Rect) -> Option<ValueAxis> {
        self.range(ctx).map(|range| self.axis_for(ctx, pane, &range))
    }

    fn draw(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame) {
        if self.is_line {
            self.draw_close_line(ctx, axis, frame);
        } else {
            self.draw_candles(ctx, axis, frame);
            self.draw_overlay(ctx, axis, frame);
        }
    }

    fn legend(&self, ctx: &DrawContext<'_>, bar: &Bar) -> Vec<(String, Color32)> {
        let values = &bar.values;
        let fmt = ctx.format;
        match &self.main {
            MainIndicator::Ma(_) => self
                .main
                .periods()
                .into_iter()
                .enumerate()
                .filter_map(|(slot, p)| {
                    drawable(values.ma(p))
                        .map(|v| (format!("MA({}):{}", p, fmt.price(v)), ctx.style.ma.color_for(p, slot)))
                })
                .collect(),
            MainIndicator::Ema(_) => self
                .main
                .periods()
                .into_iter()
                .enumerate()
                .filter_map(|(slot, p)| {
                    drawable(values.ema(p))
                        .map(|v| (format!("EMA({}):{}", p, fmt.price(v)), ctx.style.ema.color_for(p, slot)))
                })
                .collect(),
            MainIndicator::Bollinger { .. } => {
                let Some(boll) = values.boll else {
                    return Vec::new();
                };
                let style = &ctx.style.boll;
                [
                    ("BOLL", boll.mid, style.middle),
                    ("UP", boll.upper, style.upper),
                    ("LB", boll.lower, style.lower),
                ]
                .into_iter()
                .filter_map(|(name, v, color)| {
                    drawable(v).map(|v| (format!("{}:{}", name, fmt.price(v)), color))
                })
                .collect()
            }
            MainIndicator::None => Vec::new(),
        }
    }

    fn draw_grid(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame) {
        let style = &ctx.style.background;
        let stroke = Stroke::new(style.grid_line_width, style.grid);
        let rows = ctx.style.geometry.grid_rows.max(1);
        let rect = axis.rect;
        let row_space = rect.height() / rows as f32;
        for i in 0..=rows {
            let y = rect.top() + row_space * i as f32;
            frame.segment(Layer::Grid, Pos2::new(rect.left(), y), Pos2::new(rect.right(), y), stroke);
        }
        draw_grid_columns(ctx, rect, frame);
    }

    /// `grid_rows + 1` labels; the outermost ones sit half a content
    /// padding inside the edges.
    fn draw_right_text(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame) {
        let rows = ctx.style.geometry.grid_rows.max(1);
        let padding = ctx.style.geometry.content_padding;
        let rect = axis.rect;
        let row_space = rect.height() / rows as f32;
        for i in 0..=rows {
            let mut y = rect.top() + row_space * i as f32;
            if i == 0 {
                y += padding / 2.0;
            } else if i == rows {
                y -= padding / 2.0;
            }
            let value = axis.value_at(y);
            let anchor = if i == 0 || i == rows {
                Align2::RIGHT_CENTER
            } else {
                Align2::RIGHT_BOTTOM
            };
            frame.text(
                Layer::Labels,
                Pos2::new(rect.right(), axis.get_y(value)),
                anchor,
                ctx.format.price(value),
                ctx.text_size(),
                ctx.style.text.price_text,
            );
        }
    }
}

/// Volume bars with two volume moving averages
pub struct VolumeItem {
    pub ma: (usize, usize),
}

impl ChartItem for VolumeItem {
    fn axis(&self, ctx: &DrawContext<'_>, pane: Rect) -> Option<ValueAxis> {
        let indicator = SecondaryIndicator::Volume(self.ma.0, self.ma.1);
        let range = secondary_min_max(ctx.bars, ctx.range, &indicator)?;
        Some(ValueAxis::new(chart_rect(pane, ctx.style), range.max, range.min))
    }

    fn draw(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame) {
        let style = &ctx.style.volume;
        let half = ctx.style.geometry.volume_bar_width * ctx.viewport.scale() / 2.0;
        let base = axis.rect.bottom();
        for i in ctx.range.indices() {
            let Some(bar) = ctx.bars.get(i) else { break };
            let x = ctx.x(i);
            let top = axis.get_y(bar.volume).min(base);
            let color = if bar.is_up() { style.up_color } else { style.down_color };
            frame.filled_rect(
                Layer::Secondary,
                Rect::from_min_max(Pos2::new(x - half, top), Pos2::new(x + half, base)),
                color,
            );
        }

        for pair in ctx.segments() {
            let (prev, cur) = (&ctx.bars[pair.0].values, &ctx.bars[pair.1].values);
            for (slot, period) in [self.ma.0, self.ma.1].into_iter().enumerate() {
                if period == 0 {
                    continue;
                }
                let color = style.ma.color_for(period, slot);
                let values = (prev.volume_ma(period), cur.volume_ma(period));
                value_segment(ctx, axis, pair, values, color, Layer::Secondary, false, frame);
            }
        }
    }

    fn legend(&self, ctx: &DrawContext<'_>, bar: &Bar) -> Vec<(String, Color32)> {
        let style = &ctx.style.volume;
        let mut entries = vec![(format!("VOL:{}", ctx.format.volume(bar.volume)), style.text_color)];
        for (slot, period) in [self.ma.0, self.ma.1].into_iter().enumerate() {
            if period == 0 {
                continue;
            }
            if let Some(v) = drawable(bar.values.volume_ma(period)) {
                entries.push((
                    format!("MA({}):{}", period, ctx.format.volume(v)),
                    style.ma.color_for(period, slot),
                ));
            }
        }
        entries
    }

    fn axis_label(&self, ctx: &DrawContext<'_>, value: f64) -> String {
        ctx.format.volume(value)
    }
}

/// MACD, KDJ, RSI and Williams %R panes
pub struct SecondaryItem {
    pub indicator: SecondaryIndicator,
}

impl SecondaryItem {
    fn draw_macd_bars(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame) {
        let SecondaryIndicator::Macd(params) = self.indicator else {
            return;
        };
        let style = &ctx.style.macd;
        let half = ctx.style.geometry.macd_bar_width * ctx.viewport.scale() / 2.0;
        let zero = axis.get_y(0.0);
        for i in ctx.range.indices() {
            let Some(bar) = ctx.bars.get(i) else { break };
            let Some(value) = bar.values.macd(params).and_then(|m| m.histogram) else {
                continue;
            };
            let previous = i
                .checked_sub(1)
                .and_then(|p| ctx.bars[p].values.macd(params))
                .and_then(|m| m.histogram)
                .unwrap_or(0.0);
            let positive = value >= 0.0;
            let increasing = value > previous;
            let hollow = if positive { !increasing } else { increasing };
            let color = if positive { style.positive } else { style.negative };

            let x = ctx.x(i);
            let y = axis.get_y(value);
            let rect = Rect::from_min_max(
                Pos2::new(x - half, y.min(zero)),
                Pos2::new(x + half, y.max(zero)),
            );
            let command = if hollow {
                DrawCommand::Rect {
                    rect,
                    fill: Color32::TRANSPARENT,
                    stroke: Stroke::new(1.0, color),
                    corner_radius: 0.0,
                }
            } else {
                DrawCommand::Rect {
                    rect,
                    fill: color,
                    stroke: Stroke::NONE,
                    corner_radius: 0.0,
                }
            };
            frame.push(Layer::Secondary, command);
        }
    }

    /// Named series of this pane as (label, value, color)
    fn series(&self, ctx: &DrawContext<'_>, bar: &Bar) -> Vec<(String, Option<f64>, Color32)> {
        let values = &bar.values;
        let style = ctx.style;
        match self.indicator {
            SecondaryIndicator::Macd(params) => {
                let macd = values.macd(params).copied().unwrap_or_default();
                vec![
                    ("DIF".to_string(), macd.dif, style.macd.dif),
                    ("DEA".to_string(), macd.dea, style.macd.dea),
                ]
            }
            SecondaryIndicator::Kdj(params) => {
                let kdj = values.kdj(params).copied().unwrap_or_default();
                vec![
                    ("K".to_string(), kdj.k, style.kdj.k),
                    ("D".to_string(), kdj.d, style.kdj.d),
                    ("J".to_string(), kdj.j, style.kdj.j),
                ]
            }
            SecondaryIndicator::Rsi(period) => vec![(
                format!("RSI({})", period),
                values.rsi(period),
                style.rsi.color_for(period, 0),
            )],
            SecondaryIndicator::WilliamsR(period) => {
                vec![(format!("WR({})", period), values.wr(period), style.wr)]
            }
            SecondaryIndicator::Volume(..) => Vec::new(),
        }
    }
}

impl ChartItem for SecondaryItem {
    fn axis(&self, ctx: &DrawContext<'_>, pane: Rect) -> Option<ValueAxis> {
        let range = secondary_min_max(ctx.bars, ctx.range, &self.indicator)?;
        Some(ValueAxis::new(chart_rect(pane, ctx.style), range.max, range.min))
    }

    fn draw(&self, ctx: &DrawContext<'_>, axis: &ValueAxis, frame: &mut Frame) {
        self.draw_macd_bars(ctx, axis, frame);
        for pair in ctx.segments() {
            let prev = self.series(ctx, &ctx.bars[pair.0]);
            let cur = self.series(ctx, &ctx.bars[pair.1]);
            for ((_, a, color), (_, b, _)) in prev.into_iter().zip(cur) {
                value_segment(ctx, axis, pair, (a, b), color, Layer::Secondary, false, frame);
            }
        }
    }

    fn legend(&self, ctx: &DrawContext<'_>, bar: &Bar) -> Vec<(String, Color32)> {
        let mut entries: Vec<(String, Color32)> = self
            .series(ctx, bar)
            .into_iter()
            .filter_map(|(name, v, color)| {
                drawable(v).map(|v| (format!("{}:{}", name, ctx.format.price(v)), color))
            })
            .collect();
        if let SecondaryIndicator::Macd(params) = self.indicator {
            let histogram = bar.values.macd(params).and_then(|m| m.histogram);
            if let Some(v) = drawable(histogram) {
                let color = if v >= 0.0 {
                    ctx.style.macd.positive
                } else {
                    ctx.style.macd.negative
                };
                entries.push((format!("MACD:{}", ctx.format.price(v)), color));
            }
        }
        entries
    }
}

/// Renderer for a secondary pane
pub fn secondary_item(indicator: SecondaryIndicator) -> Box<dyn ChartItem> {
    match indicator {
        SecondaryIndicator::Volume(first, second) => Box::new(VolumeItem {
            ma: (first, second),
        }),
        indicator => Box::new(SecondaryItem { indicator }),
    }
}

/// Cubic smoothing with horizontal tangents at every anchor
fn smooth(anchors: &[Pos2]) -> Vec<Pos2> {
    let mut points = Vec::with_capacity(anchors.len() * CURVE_STEPS + 1);
    let Some(first) = anchors.first() else {
        return points;
    };
    points.push(*first);
    for pair in anchors.windows(2) {
        let (p0, p3) = (pair[0], pair[1]);
        let mid_x = (p0.x + p3.x) / 2.0;
        let (p1, p2) = (Pos2::new(mid_x, p0.y), Pos2::new(mid_x, p3.y));
        for step in 1..=CURVE_STEPS {
            let t = step as f32 / CURVE_STEPS as f32;
            let u = 1.0 - t;
            let x = u * u * u * p0.x + 3.0 * u * u * t * p1.x + 3.0 * u * t * t * p2.x + t * t * t * p3.x;
            let y = u * u * u * p0.y + 3.0 * u * u * t * p1.y + 3.0 * u * t * t * p2.y + t * t * t * p3.y;
            points.push(Pos2::new(x, y));
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::frame::FixedAdvance;
    use crate::chart::indicator::{IndicatorEngine, MacdParams, SecondarySet};

    fn create_test_bars(count: usize) -> Vec<Bar> {
        (0..count)
            .map(|i| {
                let close = 100.0 + (i % 9) as f64 - 4.0;
                Bar::new(i as i64 * 60, close - 0.5, close + 2.0, close - 2.0, close, 10.0 + i as f64)
            })
            .collect()
    }

    fn with_context<R>(bars: &[Bar], f: impl FnOnce(&DrawContext<'_>) -> R) -> R {
        let style = ChartStyle::default();
        let format = NumberFormat::default();
        let measure = FixedAdvance::default();
        let mut viewport = Viewport::new(&style.geometry);
        viewport.layout_pass(bars.len(), 400.0);
        let range = viewport.visible_range().unwrap();
        let ctx = DrawContext {
            bars,
            viewport: &viewport,
            range,
            style: &style,
            format: &format,
            measure: &measure,
            origin_x: 0.0,
            width: 400.0,
        };
        f(&ctx)
    }

    #[test]
    fn test_value_axis_mapping() {
        let rect = Rect::from_min_max(Pos2::new(0.0, 10.0), Pos2::new(100.0, 110.0));
        let axis = ValueAxis::new(rect, 200.0, 100.0);
        assert_eq!(axis.get_y(200.0), 10.0);
        assert_eq!(axis.get_y(100.0), 110.0);
        assert!((axis.value_at(60.0) - 150.0).abs() < 1e-9);

        let flat = ValueAxis::new(rect, 5.0, 5.0);
        assert_eq!(flat.max, 5.5);
        assert_eq!(flat.min, 4.5);
    }

    #[test]
    fn test_content_padding_widens_range() {
        let rect = Rect::from_min_max(Pos2::ZERO, Pos2::new(100.0, 112.0));
        let axis = ValueAxis::with_content_padding(rect, 200.0, 100.0, 12.0);
        assert!(axis.max > 200.0 && axis.min < 100.0);
        assert!((axis.get_y(200.0) - 6.0).abs() < 1e-3);
        assert!((axis.get_y(100.0) - 106.0).abs() < 1e-3);
    }

    #[test]
    fn test_candles_and_ma_segments() {
        let mut bars = create_test_bars(60);
        let engine = IndicatorEngine::new(MainIndicator::default_ma(), SecondarySet::new());
        engine.recompute_all(&mut bars);

        with_context(&bars, |ctx| {
            let item = MainItem::new(MainIndicator::default_ma(), false);
            let pane = Rect::from_min_max(Pos2::new(0.0, 15.0), Pos2::new(400.0, 300.0));
            let axis = item.axis(ctx, pane).unwrap();
            let mut frame = Frame::new();
            item.draw(ctx, &axis, &mut frame);

            assert!(frame.layer(Layer::MainBars).count() >= ctx.range.count());
            assert!(frame.layer(Layer::MainOverlay).count() > 0);
            for command in frame.layer(Layer::MainOverlay) {
                if let DrawCommand::Segment { points, .. } = command {
                    assert!(points.iter().all(|p| p.y >= axis.rect.top() && p.y <= axis.rect.bottom()));
                }
            }
        });
    }

    #[test]
    fn test_line_mode_skips_max_min() {
        let bars = create_test_bars(60);
        with_context(&bars, |ctx| {
            let item = MainItem::new(MainIndicator::None, true);
            let range = item.range(ctx).unwrap();
            let pane = Rect::from_min_max(Pos2::new(0.0, 15.0), Pos2::new(400.0, 300.0));
            let axis = item.axis_for(ctx, pane, &range);
            let mut frame = Frame::new();
            item.draw(ctx, &axis, &mut frame);
            item.draw_max_min(ctx, &axis, &range, &mut frame);

            assert!(frame
                .commands()
                .iter()
                .any(|(_, c)| matches!(c, DrawCommand::GradientArea { .. })));
            assert!(frame.layer(Layer::MainOverlay).next().is_none());
        });
    }

    #[test]
    fn test_max_min_annotation_direction() {
        let bars = create_test_bars(60);
        with_context(&bars, |ctx| {
            let item = MainItem::new(MainIndicator::None, false);
            let range = item.range(ctx).unwrap();
            let pane = Rect::from_min_max(Pos2::new(0.0, 15.0), Pos2::new(400.0, 300.0));
            let axis = item.axis_for(ctx, pane, &range);
            let mut frame = Frame::new();
            item.draw_max_min(ctx, &axis, &range, &mut frame);

            let texts: Vec<(String, Align2)> = frame
                .layer(Layer::MainOverlay)
                .filter_map(|c| match c {
                    DrawCommand::Text { text, anchor, .. } => Some((text.clone(), *anchor)),
                    _ => None,
                })
                .collect();
            assert_eq!(texts.len(), 2);
            for (text, anchor) in texts {
                if anchor == Align2::LEFT_CENTER {
                    assert!(text.starts_with("── "));
                } else {
                    assert!(text.ends_with(" ──"));
                }
            }
        });
    }

    #[test]
    fn test_macd_hollow_rules() {
        let mut bars = create_test_bars(40);
        let macd = SecondaryIndicator::Macd(MacdParams::default());
        let engine = IndicatorEngine::new(MainIndicator::None, SecondarySet::from(vec![macd]));
        engine.recompute_all(&mut bars);

        with_context(&bars, |ctx| {
            let item = SecondaryItem { indicator: macd };
            let pane = Rect::from_min_max(Pos2::new(0.0, 300.0), Pos2::new(400.0, 360.0));
            let axis = item.axis(ctx, pane).unwrap();
            let mut frame = Frame::new();
            item.draw(ctx, &axis, &mut frame);

            let params = MacdParams::default();
            let rects: Vec<&DrawCommand> = frame
                .layer(Layer::Secondary)
                .filter(|c| matches!(c, DrawCommand::Rect { .. }))
                .collect();
            assert_eq!(rects.len(), ctx.range.count());
            for (offset, command) in rects.into_iter().enumerate() {
                let i = ctx.range.start + offset;
                let value = bars[i].values.macd(params).and_then(|m| m.histogram).unwrap();
                let previous = if i == 0 {
                    0.0
                } else {
                    bars[i - 1].values.macd(params).and_then(|m| m.histogram).unwrap()
                };
                let hollow = if value >= 0.0 { value <= previous } else { value > previous };
                if let DrawCommand::Rect { fill, .. } = command {
                    assert_eq!(*fill == Color32::TRANSPARENT, hollow, "bar {i}");
                }
            }
        });
    }

    #[test]
    fn test_volume_legend_and_labels() {
        let mut bars = create_test_bars(30);
        let volume = SecondaryIndicator::default_volume();
        let engine = IndicatorEngine::new(MainIndicator::None, SecondarySet::from(vec![volume]));
        engine.recompute_all(&mut bars);

        with_context(&bars, |ctx| {
            let item = secondary_item(volume);
            let legend = item.legend(ctx, &bars[29]);
            assert_eq!(legend.len(), 3);
            assert!(legend[0].0.starts_with("VOL:"));
            assert!(legend[1].0.starts_with("MA(5):"));

            let early = item.legend(ctx, &bars[0]);
            assert_eq!(early.len(), 1);

            let pane = Rect::from_min_max(Pos2::new(0.0, 300.0), Pos2::new(400.0, 360.0));
            let axis = item.axis(ctx, pane).unwrap();
            assert_eq!(axis.min, 0.0);
            let mut frame = Frame::new();
            item.draw_right_text(ctx, &axis, &mut frame);
            assert_eq!(frame.layer(Layer::Labels).count(), 2);
        });
    }

    #[test]
    fn test_smooth_keeps_endpoints() {
        let anchors = [Pos2::new(0.0, 0.0), Pos2::new(8.0, 10.0), Pos2::new(16.0, 5.0)];
        let points = smooth(&anchors);
        assert_eq!(points.len(), 1 + 2 * CURVE_STEPS);
        assert_eq!(points[0], anchors[0]);
        assert_eq!(*points.last().unwrap(), anchors[2]);
        assert!(smooth(&[]).is_empty());
    }
}
