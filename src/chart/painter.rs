//! Frame composition.
//!
//! [`ChartPainter::paint`] is pure: the same bars, viewport, layout and
//! style always produce the same [`Frame`].

use egui::{Align2, Color32, Pos2, Rect, Stroke};

use super::base::{date_format_for_interval, format_timestamp};
use super::frame::{DrawCommand, Frame, Layer, TextMeasure};
use super::indicator::MainIndicator;
use super::item::{chart_rect, draw_legend, secondary_item, ChartItem, DrawContext, MainItem, ValueAxis};
use super::layout::PaneLayout;
use super::object::Bar;
use super::style::{ChartStyle, NumberFormat};
use super::viewport::{MainRange, Viewport};

/// Horizontal padding inside price tags
const TAG_PADDING: f32 = 5.0;
/// Arrow depth of the crosshair price tag
const TAG_ARROW: f32 = 3.0;
const LIVE_PADDING: f32 = 3.0;
const TRIANGLE_WIDTH: f32 = 5.0;
const TRIANGLE_HEIGHT: f32 = 8.0;
const INFO_MARGIN: f32 = 6.0;
const INFO_PADDING: f32 = 6.0;
const INFO_ROW_GAP: f32 = 3.0;
const INFO_COLUMN_GAP: f32 = 12.0;
const CROSS_POINT_RADIUS: f32 = 2.0;
const INFO_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Inputs of one frame
pub struct ChartPainter<'a> {
    pub bars: &'a [Bar],
    pub viewport: &'a Viewport,
    pub layout: &'a PaneLayout,
    pub main: MainIndicator,
    pub is_line: bool,
    pub style: &'a ChartStyle,
    pub format: &'a NumberFormat,
    pub measure: &'a dyn TextMeasure,
}

impl ChartPainter<'_> {
    pub fn paint(&self) -> Frame {
        let mut frame = Frame::new();
        let surface = self.layout.surface();
        frame.filled_rect(Layer::Background, surface, self.style.background.background);

        let Some(range) = self.viewport.visible_range() else {
            return frame;
        };
        let ctx = DrawContext {
            bars: self.bars,
            viewport: self.viewport,
            range,
            style: self.style,
            format: self.format,
            measure: self.measure,
            origin_x: surface.left(),
            width: surface.width(),
        };

        let legend_bar = self
            .viewport
            .selected_index()
            .and_then(|i| self.bars.get(i))
            .or_else(|| self.bars.last());

        let main_item = MainItem::new(self.main, self.is_line);
        let main_pane = self.layout.main_rect();
        let main = main_item
            .range(&ctx)
            .map(|range| (main_item.axis_for(&ctx, main_pane, &range), range));

        if let Some((axis, main_range)) = &main {
            main_item.draw_grid(&ctx, axis, &mut frame);
            main_item.draw(&ctx, axis, &mut frame);
            main_item.draw_max_min(&ctx, axis, main_range, &mut frame);
            main_item.draw_right_text(&ctx, axis, &mut frame);
            if let Some(bar) = legend_bar {
                draw_legend(&ctx, axis.rect, main_item.legend(&ctx, bar), &mut frame);
            }
        }

        for (indicator, pane) in self.layout.secondary_panes() {
            let item = secondary_item(indicator);
            let Some(axis) = item.axis(&ctx, pane) else {
                continue;
            };
            item.draw_grid(&ctx, &axis, &mut frame);
            item.draw(&ctx, &axis, &mut frame);
            item.draw_right_text(&ctx, &axis, &mut frame);
            if let Some(bar) = legend_bar {
                draw_legend(&ctx, chart_rect(pane, self.style), item.legend(&ctx, bar), &mut frame);
            }
        }

        self.draw_dates(&ctx, &mut frame);

        if let Some((axis, main_range)) = &main {
            frame.live_price_rect = self.draw_live_price(&ctx, axis, main_range, &mut frame);
            self.draw_crosshair(&ctx, axis, frame.live_price_rect, &mut frame);
        }

        frame.sort_layers();
        tracing::trace!(commands = frame.len(), "frame composed");
        frame
    }

    fn date_pattern(&self) -> &'static str {
        match (self.bars.first(), self.bars.get(1)) {
            (Some(a), Some(b)) => date_format_for_interval(a.timestamp, b.timestamp),
            _ => "%m-%d %H:%M",
        }
    }

    /// One label per grid column that lands on data, skipping repeats
    fn draw_dates(&self, ctx: &DrawContext<'_>, frame: &mut Frame) {
        let viewport = self.viewport;
        let columns = self.style.geometry.grid_columns.max(1);
        let space = ctx.width / columns as f32;
        let half_point = viewport.point_width() / 2.0;
        let first = viewport.content_at_index(ctx.range.start) - half_point;
        let last = viewport.content_at_index(ctx.range.stop) + half_point;
        let size = ctx.text_size();
        let y = self.layout.date_rect().center().y;
        let pattern = self.date_pattern();

        let mut previous = None;
        for i in 0..=columns {
            let x = space * i as f32;
            let content = viewport.x_to_content(x);
            if content < first || content > last {
                continue;
            }
            let Some(index) = viewport.index_at_content(content) else {
                continue;
            };
            if previous == Some(index) {
                continue;
            }
            previous = Some(index);

            let Some(bar) = self.bars.get(index) else {
                continue;
            };
            let text = format_timestamp(bar.timestamp, pattern, self.style.utc_offset_minutes);
            let half = ctx.measure.text_width(&text, size) / 2.0;
            let center = (ctx.origin_x + x).clamp(
                ctx.origin_x + half,
                (ctx.origin_x + ctx.width - half).max(ctx.origin_x + half),
            );
            frame.text(
                Layer::Dates,
                Pos2::new(center, y),
                Align2::CENTER_CENTER,
                text,
                size,
                self.style.text.time_text,
            );
        }
    }

    /// Last close marker. Returns its hit rect.
    fn draw_live_price(
        &self,
        ctx: &DrawContext<'_>,
        axis: &ValueAxis,
        main_range: &MainRange,
        frame: &mut Frame,
    ) -> Option<Rect> {
        let last_index = self.bars.len().checked_sub(1)?;
        let bar = &self.bars[last_index];
        let style = &self.style.real_time;
        let geometry = &self.style.geometry;
        let size = ctx.text_size();
        let text = self.format.price(bar.close);
        let text_width = ctx.measure.text_width(&text, size);
        let text_height = ctx.measure.text_height(size);

        let right = ctx.origin_x + ctx.width;
        let last_x = ctx.x(last_index);
        let available = right - last_x;

        if text_width + 2.0 * TAG_PADDING < available {
            let y = axis.get_y(bar.close);
            let pill = Rect::from_min_max(
                Pos2::new(right - text_width - 2.0 * TAG_PADDING, y - text_height / 2.0),
                Pos2::new(right, y + text_height / 2.0),
            );
            if geometry.show_dash_line {
                frame.push(
                    Layer::LivePrice,
                    DrawCommand::Dashed {
                        from: Pos2::new(last_x, y),
                        to: Pos2::new(pill.left(), y),
                        dash: geometry.dash_width,
                        gap: geometry.dash_space,
                        stroke: Stroke::new(1.0, style.line),
                    },
                );
            }
            frame.push(
                Layer::LivePrice,
                DrawCommand::Rect {
                    rect: pill,
                    fill: style.box_background,
                    stroke: Stroke::NONE,
                    corner_radius: 2.0,
                },
            );
            frame.text(
                Layer::LivePrice,
                Pos2::new(right - TAG_PADDING, y),
                Align2::RIGHT_CENTER,
                text,
                size,
                style.text,
            );
            return Some(pill);
        }

        let price = bar.close.clamp(main_range.min, main_range.max.max(main_range.min));
        let y = axis.get_y(price);
        if geometry.show_dash_line {
            frame.push(
                Layer::LivePrice,
                DrawCommand::Dashed {
                    from: Pos2::new(ctx.origin_x, y),
                    to: Pos2::new(right, y),
                    dash: geometry.dash_width,
                    gap: geometry.dash_space,
                    stroke: Stroke::new(1.0, style.long_line),
                },
            );
        }

        let left = right - text_width * 2.5;
        let top = y - text_height / 2.0 - LIVE_PADDING;
        let pill = Rect::from_min_max(
            Pos2::new(left, top),
            Pos2::new(
                left + text_width + LIVE_PADDING * 3.0 + TRIANGLE_WIDTH,
                top + text_height + LIVE_PADDING * 2.0,
            ),
        );
        frame.push(
            Layer::LivePrice,
            DrawCommand::Rect {
                rect: pill,
                fill: style.box_background,
                stroke: Stroke::new(1.0, style.box_border),
                corner_radius: pill.height() / 2.0,
            },
        );
        frame.text(
            Layer::LivePrice,
            Pos2::new(left + LIVE_PADDING, y),
            Align2::LEFT_CENTER,
            text,
            size,
            style.text,
        );

        let dx = left + text_width + LIVE_PADDING * 2.0;
        let dy = top + (pill.height() - TRIANGLE_HEIGHT) / 2.0;
        frame.push(
            Layer::LivePrice,
            DrawCommand::Polygon {
                points: vec![
                    Pos2::new(dx, dy),
                    Pos2::new(dx + TRIANGLE_WIDTH, dy + TRIANGLE_HEIGHT / 2.0),
                    Pos2::new(dx, dy + TRIANGLE_HEIGHT),
                ],
                fill: style.triangle,
                stroke: Stroke::NONE,
            },
        );
        Some(pill)
    }

    fn draw_crosshair(
        &self,
        ctx: &DrawContext<'_>,
        axis: &ValueAxis,
        live_rect: Option<Rect>,
        frame: &mut Frame,
    ) {
        let Some(selection) = self.viewport.selection() else {
            return;
        };
        let Some(index) = self.viewport.selected_index() else {
            return;
        };
        let Some(bar) = self.bars.get(index) else {
            return;
        };

        let style = &self.style.crosshair;
        let size = ctx.text_size();
        let text_height = ctx.measure.text_height(size);
        let top = self.layout.main_rect().top();
        let bottom = self.layout.content_bottom();
        let left = ctx.origin_x;
        let right = ctx.origin_x + ctx.width;
        let x = ctx.x(index);
        let y = selection.y.clamp(top, bottom.max(top));

        frame.segment(
            Layer::Crosshair,
            Pos2::new(x, top),
            Pos2::new(x, bottom),
            Stroke::new(style.vertical_width, style.line),
        );
        frame.segment(
            Layer::Crosshair,
            Pos2::new(left, y),
            Pos2::new(right, y),
            Stroke::new(style.horizontal_width, style.line),
        );
        frame.push(
            Layer::Crosshair,
            DrawCommand::Circle {
                center: Pos2::new(x, y),
                radius: CROSS_POINT_RADIUS,
                fill: style.point,
                stroke: Stroke::NONE,
            },
        );

        // price tag on the side away from the cursor
        let cursor_left = x < left + ctx.width / 2.0;
        let text = self.format.price(axis.value_at(y));
        let text_width = ctx.measure.text_width(&text, size);
        let tag_width = text_width + 2.0 * TAG_PADDING + TAG_ARROW;
        let r = text_height / 2.0 + LIVE_PADDING;
        let (points, text_x) = if cursor_left {
            let x0 = right - tag_width - 1.0;
            (
                vec![
                    Pos2::new(x0, y),
                    Pos2::new(x0 + TAG_ARROW, y + r),
                    Pos2::new(x0 + tag_width, y + r),
                    Pos2::new(x0 + tag_width, y - r),
                    Pos2::new(x0 + TAG_ARROW, y - r),
                ],
                x0 + TAG_ARROW + TAG_PADDING,
            )
        } else {
            let x0 = left + 1.0;
            (
                vec![
                    Pos2::new(x0, y - r),
                    Pos2::new(x0, y + r),
                    Pos2::new(x0 + tag_width - TAG_ARROW, y + r),
                    Pos2::new(x0 + tag_width, y),
                    Pos2::new(x0 + tag_width - TAG_ARROW, y - r),
                ],
                x0 + TAG_PADDING,
            )
        };
        frame.push(
            Layer::Crosshair,
            DrawCommand::Polygon {
                points,
                fill: style.marker_background,
                stroke: Stroke::new(0.5, style.marker_border),
            },
        );
        frame.text(
            Layer::Crosshair,
            Pos2::new(text_x, y),
            Align2::LEFT_CENTER,
            text,
            size,
            style.marker_text,
        );

        // date tag clamped to the edges
        let date = format_timestamp(bar.timestamp, self.date_pattern(), self.style.utc_offset_minutes);
        let date_width = ctx.measure.text_width(&date, size);
        let min_center = left + 1.0 + date_width / 2.0 + TAG_PADDING;
        let max_center = (right - 1.0 - date_width / 2.0 - TAG_PADDING).max(min_center);
        let date_x = x.clamp(min_center, max_center);
        let date_rect = Rect::from_center_size(
            Pos2::new(date_x, self.layout.date_rect().center().y),
            egui::vec2(date_width + 2.0 * TAG_PADDING, self.layout.date_rect().height()),
        );
        frame.push(
            Layer::Crosshair,
            DrawCommand::Rect {
                rect: date_rect,
                fill: style.marker_background,
                stroke: Stroke::new(0.5, style.marker_border),
                corner_radius: 0.0,
            },
        );
        frame.text(
            Layer::Crosshair,
            date_rect.center(),
            Align2::CENTER_CENTER,
            date,
            size,
            style.marker_text,
        );

        self.draw_info_panel(ctx, index, cursor_left, live_rect, frame);
    }

    /// Rows of the info panel as (label, value, value color)
    fn info_rows(&self, index: usize) -> Vec<(String, String, Color32)> {
        let Some(bar) = self.bars.get(index) else {
            return Vec::new();
        };
        let texts = &self.style.info_texts;
        let color = self.style.info_panel.text;
        let base = index
            .checked_sub(1)
            .and_then(|i| self.bars.get(i))
            .map_or(bar.open, |prev| prev.close);
        let (change, amplitude) = if base != 0.0 {
            ((bar.close - base) / base * 100.0, (bar.high - bar.low) / base * 100.0)
        } else {
            (0.0, 0.0)
        };
        let change_color = if change >= 0.0 {
            self.style.candle.up_color
        } else {
            self.style.candle.down_color
        };
        let sign = if change > 0.0 { "+" } else { "" };

        vec![
            (
                texts.time.clone(),
                format_timestamp(bar.timestamp, INFO_TIME_FORMAT, self.style.utc_offset_minutes),
                color,
            ),
            (texts.open.clone(), self.format.price(bar.open), color),
            (texts.high.clone(), self.format.price(bar.high), color),
            (texts.low.clone(), self.format.price(bar.low), color),
            (texts.close.clone(), self.format.price(bar.close), color),
            (texts.change.clone(), format!("{}{:.2}%", sign, change), change_color),
            (texts.amplitude.clone(), format!("{:.2}%", amplitude), color),
            (texts.volume.clone(), self.format.volume(bar.volume), color),
            (texts.amount.clone(), self.format.volume(bar.amount), color),
        ]
    }

    fn draw_info_panel(
        &self,
        ctx: &DrawContext<'_>,
        index: usize,
        cursor_left: bool,
        live_rect: Option<Rect>,
        frame: &mut Frame,
    ) {
        let rows = self.info_rows(index);
        if rows.is_empty() {
            return;
        }
        let style = &self.style.info_panel;
        let size = ctx.text_size();
        let row_height = ctx.measure.text_height(size) + INFO_ROW_GAP;
        let label_width = rows
            .iter()
            .map(|(label, _, _)| ctx.measure.text_width(label, size))
            .fold(0.0, f32::max);
        let value_width = rows
            .iter()
            .map(|(_, value, _)| ctx.measure.text_width(value, size))
            .fold(0.0, f32::max);
        let width = label_width + INFO_COLUMN_GAP + value_width + 2.0 * INFO_PADDING;
        let height = rows.len() as f32 * row_height + 2.0 * INFO_PADDING - INFO_ROW_GAP;

        let main = self.layout.main_rect();
        let x = if cursor_left {
            ctx.origin_x + ctx.width - width - INFO_MARGIN
        } else {
            ctx.origin_x + INFO_MARGIN
        };
        let panel = Rect::from_min_size(Pos2::new(x, main.top() + INFO_MARGIN), egui::vec2(width, height));
        let panel = avoid_live_price(panel, live_rect, main.top(), self.layout.content_bottom());

        frame.push(
            Layer::Crosshair,
            DrawCommand::Rect {
                rect: panel,
                fill: style.background,
                stroke: Stroke::new(0.5, style.border),
                corner_radius: style.corner_radius,
            },
        );
        for (row, (label, value, color)) in rows.into_iter().enumerate() {
            let y = panel.top() + INFO_PADDING + row as f32 * row_height;
            frame.text(
                Layer::Crosshair,
                Pos2::new(panel.left() + INFO_PADDING, y),
                Align2::LEFT_TOP,
                label,
                size,
                style.text,
            );
            frame.text(
                Layer::Crosshair,
                Pos2::new(panel.right() - INFO_PADDING, y),
                Align2::RIGHT_TOP,
                value,
                size,
                color,
            );
        }
    }
}

/// Move the info panel off the live price tag: below it when the panel
/// fits above `bottom`, otherwise above it but never past `top`.
fn avoid_live_price(panel: Rect, live: Option<Rect>, top: f32, bottom: f32) -> Rect {
    let Some(live) = live.filter(|live| live.intersects(panel)) else {
        return panel;
    };
    let below = live.bottom() + INFO_MARGIN;
    let shifted = if below + panel.height() <= bottom {
        below
    } else {
        (live.top() - INFO_MARGIN - panel.height()).max(top)
    };
    panel.translate(egui::vec2(0.0, shifted - panel.top()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::frame::FixedAdvance;
    use crate::chart::indicator::{IndicatorEngine, SecondaryIndicator, SecondarySet};
    use crate::chart::layout::PaneLayout;

    fn create_test_bars(count: usize) -> Vec<Bar> {
        (0..count)
            .map(|i| {
                let close = 100.0 + (i % 11) as f64;
                let mut bar = Bar::new(i as i64 * 60, close - 1.0, close + 2.0, close - 3.0, close, 50.0);
                bar.amount = 5000.0;
                bar
            })
            .collect()
    }

    struct Scene {
        bars: Vec<Bar>,
        viewport: Viewport,
        layout: PaneLayout,
        style: ChartStyle,
        format: NumberFormat,
        secondary: SecondarySet,
    }

    impl Scene {
        fn new(count: usize) -> Self {
            Self::with_size(count, egui::vec2(400.0, 500.0))
        }

        fn with_size(count: usize, size: egui::Vec2) -> Self {
            let style = ChartStyle::default();
            let secondary = SecondarySet::from(vec![
                SecondaryIndicator::default_volume(),
                SecondaryIndicator::default_macd(),
            ]);
            let mut bars = create_test_bars(count);
            IndicatorEngine::new(MainIndicator::default_ma(), secondary.clone()).recompute_all(&mut bars);
            let surface = Rect::from_min_size(Pos2::ZERO, size);
            let layout = PaneLayout::compute(surface, &secondary, &style.geometry);
            let mut viewport = Viewport::new(&style.geometry);
            viewport.layout_pass(bars.len(), surface.width());
            Self {
                bars,
                viewport,
                layout,
                style,
                format: NumberFormat::default(),
                secondary,
            }
        }

        fn paint(&self) -> Frame {
            let measure = FixedAdvance::default();
            ChartPainter {
                bars: &self.bars,
                viewport: &self.viewport,
                layout: &self.layout,
                main: MainIndicator::default_ma(),
                is_line: false,
                style: &self.style,
                format: &self.format,
                measure: &measure,
            }
            .paint()
        }
    }

    fn texts(frame: &Frame, layer: Layer) -> Vec<(Pos2, String)> {
        frame
            .layer(layer)
            .filter_map(|c| match c {
                DrawCommand::Text { pos, text, .. } => Some((*pos, text.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_layers_non_decreasing() {
        let mut scene = Scene::new(120);
        scene.viewport.set_selection(Some(Pos2::new(120.0, 100.0)));
        let frame = scene.paint();

        let layers: Vec<Layer> = frame.commands().iter().map(|(l, _)| *l).collect();
        assert!(layers.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(layers.first(), Some(&Layer::Background));
        assert!(layers.contains(&Layer::Secondary));
        assert!(layers.contains(&Layer::Crosshair));
        assert_eq!(scene.secondary.len(), 2);
    }

    #[test]
    fn test_empty_series_draws_background_only() {
        let scene = Scene::new(0);
        let frame = scene.paint();
        assert_eq!(frame.len(), 1);
        assert!(frame.live_price_rect.is_none());
    }

    #[test]
    fn test_live_price_inline_when_margin_fits() {
        let scene = Scene::new(120);
        let frame = scene.paint();
        let live = frame.live_price_rect.unwrap();
        assert_eq!(live.right(), 400.0);
        let dashes = frame
            .layer(Layer::LivePrice)
            .filter(|c| matches!(c, DrawCommand::Dashed { .. }))
            .count();
        assert_eq!(dashes, 1);
        assert!(!frame
            .layer(Layer::LivePrice)
            .any(|c| matches!(c, DrawCommand::Polygon { .. })));
    }

    #[test]
    fn test_live_price_pointer_when_scrolled_back() {
        let mut scene = Scene::new(120);
        scene.viewport.begin_user_scroll();
        scene.viewport.scroll_by_user(300.0);
        scene.viewport.end_user_scroll();
        let frame = scene.paint();

        let live = frame.live_price_rect.unwrap();
        let text_width = FixedAdvance::default().text_width(&scene.format.price(scene.bars[119].close), 8.0);
        assert!((live.left() - (400.0 - 2.5 * text_width)).abs() < 1e-3);
        assert!(frame
            .layer(Layer::LivePrice)
            .any(|c| matches!(c, DrawCommand::Polygon { .. })));
    }

    #[test]
    fn test_crosshair_price_tag_opposite_cursor() {
        let mut scene = Scene::new(120);
        scene.viewport.set_selection(Some(Pos2::new(50.0, 120.0)));
        let frame = scene.paint();

        let tag = frame
            .layer(Layer::Crosshair)
            .find_map(|c| match c {
                DrawCommand::Polygon { points, .. } => Some(points.clone()),
                _ => None,
            })
            .unwrap();
        assert!(tag.iter().all(|p| p.x > 200.0));

        scene.viewport.set_selection(Some(Pos2::new(350.0, 120.0)));
        let frame = scene.paint();
        let tag = frame
            .layer(Layer::Crosshair)
            .find_map(|c| match c {
                DrawCommand::Polygon { points, .. } => Some(points.clone()),
                _ => None,
            })
            .unwrap();
        assert!(tag.iter().all(|p| p.x < 200.0));
    }

    #[test]
    fn test_info_panel_avoids_live_price() {
        let mut scene = Scene::new(120);
        let live = scene.paint().live_price_rect.unwrap();
        // park the cursor at the live price height on the left half
        scene.viewport.set_selection(Some(Pos2::new(30.0, live.center().y)));
        let frame = scene.paint();

        let panel = frame
            .layer(Layer::Crosshair)
            .find_map(|c| match c {
                DrawCommand::Rect { rect, corner_radius, .. } if *corner_radius == 8.0 => Some(*rect),
                _ => None,
            })
            .unwrap();
        assert!(!panel.intersects(frame.live_price_rect.unwrap()));
        assert!(panel.right() <= 400.0);
    }

    #[test]
    fn test_info_panel_kept_inside_short_surface() {
        let mut scene = Scene::with_size(120, egui::vec2(400.0, 160.0));
        let live = scene.paint().live_price_rect.unwrap();
        scene.viewport.set_selection(Some(Pos2::new(30.0, live.center().y)));
        let frame = scene.paint();

        let panel = frame
            .layer(Layer::Crosshair)
            .find_map(|c| match c {
                DrawCommand::Rect { rect, corner_radius, .. } if *corner_radius == 8.0 => Some(*rect),
                _ => None,
            })
            .unwrap();
        assert_eq!(panel.top(), scene.layout.main_rect().top());
    }

    #[test]
    fn test_avoid_live_price_placement() {
        let panel = Rect::from_min_size(Pos2::new(200.0, 21.0), egui::vec2(150.0, 120.0));
        let live = Rect::from_min_max(Pos2::new(340.0, 40.0), Pos2::new(400.0, 52.0));

        // untouched without an overlap
        assert_eq!(avoid_live_price(panel, None, 15.0, 480.0), panel);
        let far = Rect::from_min_max(Pos2::new(340.0, 300.0), Pos2::new(400.0, 312.0));
        assert_eq!(avoid_live_price(panel, Some(far), 15.0, 480.0), panel);

        // room below the tag
        assert_eq!(avoid_live_price(panel, Some(live), 15.0, 480.0).top(), 58.0);

        // no room below, above is clamped to the pane top
        let moved = avoid_live_price(panel, Some(live), 15.0, 150.0);
        assert_eq!(moved.top(), 15.0);
        assert_eq!(moved.height(), 120.0);
    }

    #[test]
    fn test_info_rows_change_against_previous_close() {
        let scene = Scene::new(3);
        let measure = FixedAdvance::default();
        let painter = ChartPainter {
            bars: &scene.bars,
            viewport: &scene.viewport,
            layout: &scene.layout,
            main: MainIndicator::None,
            is_line: false,
            style: &scene.style,
            format: &scene.format,
            measure: &measure,
        };

        let rows = painter.info_rows(1);
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[0].0, "时间");
        // close 101 vs previous close 100
        assert_eq!(rows[5].1, "+1.00%");
        assert_eq!(rows[6].1, "5.00%");

        let first = painter.info_rows(0);
        // close 100 vs open 99
        assert_eq!(first[5].1, "+1.01%");
    }

    #[test]
    fn test_date_labels_deduplicated() {
        let scene = Scene::new(3);
        let frame = scene.paint();
        let dates = texts(&frame, Layer::Dates);
        let mut labels: Vec<&String> = dates.iter().map(|(_, t)| t).collect();
        let before = labels.len();
        labels.dedup();
        assert_eq!(before, labels.len());
        assert!(!dates.is_empty());
    }
}
