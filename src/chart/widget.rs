//! egui adapter: turns pointer, touch and keyboard input into gestures on
//! a [`ChartView`] and paints its frames.

use std::time::Duration;

use egui::{FontData, FontDefinitions, FontFamily, FontId, Key, Painter, Pos2, Response, Sense, Ui, Vec2};

use super::frame::TextMeasure;
use super::interaction::{GestureEvent, GestureOutcome, InteractionState};
use super::view::ChartView;

/// Mouse wheel and arrow-key zoom step
const ZOOM_STEP: f32 = 1.1;
/// Repaint period while a feed is attached
const FEED_POLL: Duration = Duration::from_millis(100);

/// Measures with the fonts egui will paint with
pub struct EguiMeasure<'a> {
    painter: &'a Painter,
}

impl<'a> EguiMeasure<'a> {
    pub fn new(painter: &'a Painter) -> Self {
        Self { painter }
    }
}

impl TextMeasure for EguiMeasure<'_> {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        self.painter
            .layout_no_wrap(text.to_owned(), FontId::proportional(size), egui::Color32::WHITE)
            .size()
            .x
    }
}

pub struct ChartWidget {
    view: ChartView,
    /// Crosshair follows the mouse without a press
    pub hover_crosshair: bool,
    panning: bool,
    pinching: bool,
    pinch_scale: f32,
    hovering: bool,
}

impl ChartWidget {
    pub fn new(view: ChartView) -> Self {
        Self {
            view,
            hover_crosshair: true,
            panning: false,
            pinching: false,
            pinch_scale: 1.0,
            hovering: false,
        }
    }

    pub fn view(&self) -> &ChartView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ChartView {
        &mut self.view
    }

    pub fn show(&mut self, ui: &mut Ui) -> Response {
        self.view.pump_feed();

        let size = ui.available_size();
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        let origin = response.rect.min;

        if response.clicked() {
            response.request_focus();
        }
        if response.has_focus() {
            self.handle_keyboard(ui);
        }
        if response.hovered() {
            self.handle_scroll(ui);
        }
        self.handle_pinch(ui, origin);
        self.handle_drag(ui, &response, origin);
        self.handle_press(&response, origin);

        let dt = ui.input(|i| i.stable_dt);
        if self.view.is_animating() {
            self.view.advance(Duration::from_secs_f32(dt.max(0.0)));
            ui.ctx().request_repaint();
        }

        let frame = self.view.render(response.rect.size(), &EguiMeasure::new(&painter));
        frame.paint(&painter, origin.to_vec2());

        if self.view.has_feed() {
            ui.ctx().request_repaint_after(FEED_POLL);
        }
        response
    }

    fn handle_keyboard(&mut self, ui: &Ui) {
        let (zoom_in, zoom_out, latest) = ui.input(|i| {
            (
                i.key_pressed(Key::ArrowUp),
                i.key_pressed(Key::ArrowDown),
                i.key_pressed(Key::End),
            )
        });
        if zoom_in {
            self.view.zoom_by(ZOOM_STEP);
        }
        if zoom_out {
            self.view.zoom_by(1.0 / ZOOM_STEP);
        }
        if latest {
            self.view.jump_to_latest();
        }
    }

    /// Wheel up zooms out, wheel down zooms in
    fn handle_scroll(&mut self, ui: &Ui) {
        let scroll = ui.input(|i| i.raw_scroll_delta);
        if scroll.y > 0.0 {
            self.view.zoom_by(1.0 / ZOOM_STEP);
        } else if scroll.y < 0.0 {
            self.view.zoom_by(ZOOM_STEP);
        }
    }

    fn handle_pinch(&mut self, ui: &Ui, origin: Pos2) {
        match ui.input(|i| i.multi_touch()) {
            Some(touch) => {
                if !self.pinching {
                    self.pinching = true;
                    self.pinch_scale = 1.0;
                    self.view.handle_gesture(GestureEvent::PinchStart {
                        center: to_local(touch.center_pos, origin),
                    });
                }
                self.pinch_scale *= touch.zoom_delta;
                self.view.handle_gesture(GestureEvent::PinchUpdate {
                    scale: self.pinch_scale,
                });
            }
            None if self.pinching => {
                self.pinching = false;
                self.view.handle_gesture(GestureEvent::PinchEnd);
            }
            None => {}
        }
    }

    fn handle_drag(&mut self, ui: &Ui, response: &Response, origin: Pos2) {
        if self.pinching {
            return;
        }
        let velocity = ui.input(|i| i.pointer.velocity());
        let pos = response.interact_pointer_pos().map(|p| to_local(p, origin));

        if response.drag_started() {
            // the first drag frame often reports no velocity yet
            let direction = if velocity == Vec2::ZERO {
                response.drag_delta()
            } else {
                velocity
            };
            let event = GestureEvent::PanStart {
                pos: pos.unwrap_or_default(),
                velocity: direction,
            };
            self.panning = self.view.handle_gesture(event) == GestureOutcome::Redraw;
        }

        if self.panning && response.dragged() {
            let delta = response.drag_delta();
            if delta != Vec2::ZERO {
                self.view.handle_gesture(GestureEvent::PanMove {
                    pos: pos.unwrap_or_default(),
                    delta,
                    velocity,
                });
            }
        }

        if self.panning && response.drag_stopped() {
            self.panning = false;
            self.view.handle_gesture(GestureEvent::PanEnd {
                pos: pos.unwrap_or_default(),
                velocity,
            });
        }
    }

    /// Taps, touch long presses and the hover crosshair
    fn handle_press(&mut self, response: &Response, origin: Pos2) {
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.view.handle_gesture(GestureEvent::Tap {
                    pos: to_local(pos, origin),
                });
            }
            return;
        }

        if response.long_touched() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.view.handle_gesture(GestureEvent::LongPressStart {
                    pos: to_local(pos, origin),
                });
            }
        }

        self.track_pointer(
            response.hover_pos().map(|pos| to_local(pos, origin)),
            response.interact_pointer_pos().map(|pos| to_local(pos, origin)),
            response.is_pointer_button_down_on(),
        );
    }

    /// Move, start or end the crosshair from surface-local pointer
    /// positions. Hover does not start a selection during inertial scroll.
    fn track_pointer(&mut self, hover: Option<Pos2>, press: Option<Pos2>, pressed: bool) {
        let selecting = self.view.interaction_state() == InteractionState::LongPressSelecting;
        let pointer = if selecting && pressed {
            press
        } else if self.hover_crosshair && !self.panning && !self.pinching {
            hover
        } else {
            None
        };
        match pointer {
            Some(pos) if selecting => {
                self.view.handle_gesture(GestureEvent::LongPressMove { pos });
            }
            Some(pos)
                if self.view.interaction_state() == InteractionState::Idle
                    && !self.hovering
                    && !self.view.is_animating() =>
            {
                self.hovering = true;
                self.view.handle_gesture(GestureEvent::LongPressStart { pos });
            }
            Some(_) => {}
            None => {
                if selecting && !pressed {
                    self.view.handle_gesture(GestureEvent::LongPressEnd);
                }
                self.hovering = false;
            }
        }
    }
}

fn to_local(pos: Pos2, origin: Pos2) -> Pos2 {
    (pos - origin).to_pos2()
}

/// Register a system CJK font so the localized info panel renders.
/// Returns false when none of the known fonts is installed.
pub fn install_cjk_fonts(ctx: &egui::Context) -> bool {
    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &["C:\\Windows\\Fonts\\msyh.ttc", "C:\\Windows\\Fonts\\simsun.ttc"]
    } else if cfg!(target_os = "macos") {
        &["/System/Library/Fonts/PingFang.ttc"]
    } else {
        &[
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
            "/usr/share/fonts/wenquanyi/wqy-microhei/wqy-microhei.ttc",
        ]
    };

    let Some((path, data)) = candidates
        .iter()
        .find_map(|path| std::fs::read(path).ok().map(|data| (*path, data)))
    else {
        tracing::warn!("no CJK font found, localized labels may not render");
        return false;
    };

    let mut fonts = FontDefinitions::default();
    fonts
        .font_data
        .insert("cjk".to_owned(), FontData::from_owned(data).into());
    fonts
        .families
        .entry(FontFamily::Proportional)
        .or_default()
        .insert(0, "cjk".to_owned());
    fonts
        .families
        .entry(FontFamily::Monospace)
        .or_default()
        .push("cjk".to_owned());
    ctx.set_fonts(fonts);
    tracing::info!(path, "CJK font installed");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::frame::FixedAdvance;
    use crate::chart::object::Bar;

    fn create_test_bar(index: i64) -> Bar {
        let close = 100.0 + (index % 7) as f64;
        Bar::new(index * 60_000, close - 0.5, close + 1.0, close - 1.0, close, 80.0)
    }

    fn create_widget() -> ChartWidget {
        let mut view = ChartView::default();
        view.set_history((0..200).map(create_test_bar).collect());
        view.render(egui::vec2(400.0, 500.0), &FixedAdvance::default());
        ChartWidget::new(view)
    }

    fn fling(widget: &mut ChartWidget) {
        let velocity = Vec2::new(800.0, 0.0);
        let view = widget.view_mut();
        view.handle_gesture(GestureEvent::PanStart {
            pos: Pos2::new(100.0, 200.0),
            velocity,
        });
        view.handle_gesture(GestureEvent::PanMove {
            pos: Pos2::new(300.0, 200.0),
            delta: Vec2::new(200.0, 0.0),
            velocity,
        });
        view.handle_gesture(GestureEvent::PanEnd {
            pos: Pos2::new(300.0, 200.0),
            velocity,
        });
    }

    #[test]
    fn test_to_local() {
        assert_eq!(
            to_local(Pos2::new(130.0, 250.0), Pos2::new(100.0, 200.0)),
            Pos2::new(30.0, 50.0)
        );
    }

    #[test]
    fn test_widget_defaults() {
        let widget = ChartWidget::new(ChartView::default());
        assert!(widget.hover_crosshair);
        assert_eq!(widget.view().interaction_state(), InteractionState::Idle);
    }

    #[test]
    fn test_hover_after_drag_release_keeps_inertia() {
        let mut widget = create_widget();
        fling(&mut widget);
        assert!(widget.view().is_animating());

        // pointer still over the chart on the release frame
        widget.track_pointer(Some(Pos2::new(300.0, 200.0)), None, false);
        assert!(widget.view().is_animating());
        assert_eq!(widget.view().interaction_state(), InteractionState::Idle);
        assert!(widget.view().viewport().selection().is_none());

        let mut frames = 0;
        while widget.view().is_animating() && frames < 1000 {
            widget.view_mut().advance(Duration::from_millis(16));
            widget.track_pointer(Some(Pos2::new(300.0, 200.0)), None, false);
            frames += 1;
        }
        assert!(frames > 1);
        assert!(!widget.view().is_animating());
        assert_eq!(
            widget.view().interaction_state(),
            InteractionState::LongPressSelecting
        );
        assert_eq!(
            widget.view().viewport().selection(),
            Some(Pos2::new(300.0, 200.0))
        );
    }

    #[test]
    fn test_hover_crosshair_follows_and_leaves() {
        let mut widget = create_widget();
        widget.track_pointer(Some(Pos2::new(50.0, 100.0)), None, false);
        assert_eq!(widget.view().interaction_state(), InteractionState::LongPressSelecting);
        widget.track_pointer(Some(Pos2::new(80.0, 120.0)), None, false);
        assert_eq!(widget.view().viewport().selection(), Some(Pos2::new(80.0, 120.0)));

        widget.track_pointer(None, None, false);
        assert_eq!(widget.view().interaction_state(), InteractionState::Idle);
        assert!(widget.view().viewport().selection().is_none());

        widget.hover_crosshair = false;
        widget.track_pointer(Some(Pos2::new(50.0, 100.0)), None, false);
        assert_eq!(widget.view().interaction_state(), InteractionState::Idle);
    }
}
