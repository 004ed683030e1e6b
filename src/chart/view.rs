//! Owner of one chart: series, indicator selections, viewport, gestures.
//!
//! Everything here runs on the owning (UI) thread. Producers reach it
//! only through a [`BarFeed`] drained by [`ChartView::pump_feed`].

use std::future::Future;
use std::time::Duration;

use egui::{Pos2, Rect, Vec2};
use tokio::sync::mpsc::error::TryRecvError;

use super::feed::{self, BarFeed, FeedEvent, FeedReceiver, RecomputedBars};
use super::frame::{Frame, TextMeasure};
use super::indicator::{IndicatorEngine, MainIndicator, SecondaryIndicator, SecondarySet};
use super::interaction::{GestureEvent, GestureOutcome, InertiaConfig, InteractionController, InteractionState};
use super::layout::PaneLayout;
use super::manager::{BarManager, BarUpdate};
use super::object::Bar;
use super::painter::ChartPainter;
use super::style::{ChartStyle, NumberFormat};
use super::viewport::{Viewport, ViewportState};
use crate::error::Result;
use crate::setting::ChartSettings;

pub struct ChartView {
    manager: BarManager,
    engine: IndicatorEngine,
    viewport: Viewport,
    controller: InteractionController,
    style: ChartStyle,
    format: NumberFormat,
    is_line: bool,
    feed: Option<FeedReceiver>,
    /// Restored state waiting for bars and a surface width to clamp against
    pending_viewport: Option<ViewportState>,
}

impl Default for ChartView {
    fn default() -> Self {
        Self::new(ChartStyle::default())
    }
}

impl ChartView {
    pub fn new(style: ChartStyle) -> Self {
        let format = NumberFormat::new(style.fraction_digits);
        Self {
            manager: BarManager::new(),
            engine: IndicatorEngine::new(
                MainIndicator::default_ma(),
                SecondarySet::from(vec![SecondaryIndicator::default_volume()]),
            ),
            viewport: Viewport::new(&style.geometry),
            controller: InteractionController::new(InertiaConfig::default()),
            style,
            format,
            is_line: false,
            feed: None,
            pending_viewport: None,
        }
    }

    pub fn from_settings(settings: &ChartSettings) -> Self {
        let mut view = Self::new(settings.style.clone());
        view.engine = IndicatorEngine::new(
            settings.main_indicator,
            SecondarySet::from(settings.secondary_indicators.clone()),
        );
        view.controller = InteractionController::new(settings.inertia);
        view.is_line = settings.line_mode;
        if let Some(state) = settings.viewport {
            view.restore_viewport_state(state);
        }
        view
    }

    pub fn bars(&self) -> &[Bar] {
        self.manager.get_all_bars()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn engine(&self) -> &IndicatorEngine {
        &self.engine
    }

    pub fn style(&self) -> &ChartStyle {
        &self.style
    }

    pub fn is_line(&self) -> bool {
        self.is_line
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.controller.state()
    }

    pub fn is_animating(&self) -> bool {
        self.controller.is_animating()
    }

    /// Replace the series and scroll to the latest bar, or to a restored
    /// position still waiting to be applied
    pub fn set_history(&mut self, bars: Vec<Bar>) {
        self.manager.update_history(bars);
        self.engine.recompute_all(self.manager.bars_mut());
        self.controller.cancel_inertia();
        self.viewport
            .layout_pass(self.manager.get_count(), self.viewport.draw_width());
        if self.pending_viewport.is_none() {
            self.viewport.jump_to_latest();
        }
    }

    /// Feed one live bar
    pub fn push_bar(&mut self, bar: Bar) -> BarUpdate {
        let update = self.manager.update_bar(bar);
        match update {
            BarUpdate::Appended => {
                self.engine.recompute_incremental(self.manager.bars_mut());
                self.viewport.on_series_grew(self.manager.get_count());
            }
            BarUpdate::ReplacedLast => {
                self.engine.recompute_incremental(self.manager.bars_mut());
            }
            BarUpdate::Ignored => {}
        }
        update
    }

    pub fn set_main_indicator(&mut self, main: MainIndicator) {
        if *self.engine.main() == main {
            return;
        }
        self.engine.set_main(main);
        self.engine.recompute_all(self.manager.bars_mut());
    }

    /// Returns whether the pane is now shown
    pub fn toggle_secondary(&mut self, indicator: SecondaryIndicator) -> bool {
        let shown = self.engine.toggle_secondary(indicator);
        self.engine.recompute_all(self.manager.bars_mut());
        shown
    }

    pub fn set_line_mode(&mut self, is_line: bool) {
        self.is_line = is_line;
    }

    pub fn set_style(&mut self, style: ChartStyle) {
        self.viewport.apply_geometry(&style.geometry);
        self.style = style;
    }

    pub fn set_number_format(&mut self, format: NumberFormat) {
        self.format = format;
    }

    pub fn handle_gesture(&mut self, event: GestureEvent) -> GestureOutcome {
        let outcome = self.controller.handle(&mut self.viewport, event);
        if outcome == GestureOutcome::Redraw {
            self.pending_viewport = None;
        }
        outcome
    }

    /// Multiply the zoom scale, clamped to the configured range
    pub fn zoom_by(&mut self, factor: f32) {
        self.controller.cancel_inertia();
        self.pending_viewport = None;
        self.viewport.set_scale(self.viewport.scale() * factor);
    }

    pub fn jump_to_latest(&mut self) {
        self.controller.cancel_inertia();
        self.pending_viewport = None;
        self.viewport.jump_to_latest();
    }

    /// Step the inertial scroll. Returns whether a redraw is needed.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        self.controller.advance(&mut self.viewport, elapsed)
    }

    /// Compose a frame for a surface of `size`, in surface-local
    /// coordinates. Gesture positions use the same space.
    pub fn render(&mut self, size: Vec2, measure: &dyn TextMeasure) -> Frame {
        let surface = Rect::from_min_size(Pos2::ZERO, size);
        let layout = PaneLayout::compute(surface, self.engine.secondary(), &self.style.geometry);
        self.viewport.layout_pass(self.manager.get_count(), surface.width());
        if self.manager.get_count() > 0 {
            if let Some(state) = self.pending_viewport.take() {
                tracing::debug!(?state, "restoring viewport");
                self.viewport.restore(state);
            }
        }

        let frame = ChartPainter {
            bars: self.manager.get_all_bars(),
            viewport: &self.viewport,
            layout: &layout,
            main: *self.engine.main(),
            is_line: self.is_line,
            style: &self.style,
            format: &self.format,
            measure,
        }
        .paint();
        self.controller.set_live_price_rect(frame.live_price_rect);
        frame
    }

    pub fn viewport_state(&self) -> ViewportState {
        self.viewport.state()
    }

    /// Apply a saved viewport. Before the first bars are drawn the offset
    /// cannot be clamped yet, so the state is applied again on the first
    /// render that has bars.
    pub fn restore_viewport_state(&mut self, state: ViewportState) {
        self.controller.cancel_inertia();
        self.viewport.restore(state);
        self.pending_viewport = (self.manager.get_count() == 0 || self.viewport.draw_width() == 0.0)
            .then_some(state);
    }

    /// Open a feed for producers on other threads. Replaces any earlier feed.
    pub fn attach_feed(&mut self) -> BarFeed {
        let (feed, receiver) = BarFeed::channel();
        self.feed = Some(receiver);
        feed
    }

    pub fn has_feed(&self) -> bool {
        self.feed.is_some()
    }

    /// Apply every pending feed event. Returns how many were applied.
    pub fn pump_feed(&mut self) -> usize {
        let mut events = Vec::new();
        if let Some(receiver) = self.feed.as_mut() {
            loop {
                match receiver.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        tracing::debug!("bar feed disconnected");
                        self.feed = None;
                        break;
                    }
                }
            }
        }

        let applied = events.len();
        for event in events {
            match event {
                FeedEvent::Bar(bar) => {
                    self.push_bar(bar);
                }
                FeedEvent::History(bars) => self.set_history(bars),
            }
        }
        applied
    }

    /// Full recompute of a snapshot on the blocking pool. Hand the result
    /// to [`ChartView::install_snapshot`].
    pub fn recompute_in_background(
        &self,
    ) -> impl Future<Output = Result<RecomputedBars>> + Send + 'static {
        feed::recompute(self.engine.clone(), self.manager.snapshot())
    }

    /// Swap in a background result. Bars that arrived while it was computed
    /// are replayed incrementally. Returns false for a stale result.
    pub fn install_snapshot(&mut self, recomputed: RecomputedBars) -> bool {
        if recomputed.engine != self.engine {
            tracing::warn!("discarding recompute for outdated indicator selection");
            return false;
        }

        let RecomputedBars { mut bars, .. } = recomputed;
        let current = self.manager.get_all_bars();
        let same_series = current.len() >= bars.len()
            && current.first().map(|bar| bar.timestamp) == bars.first().map(|bar| bar.timestamp);
        if !same_series {
            tracing::warn!(
                snapshot = bars.len(),
                current = current.len(),
                "discarding recompute for replaced series"
            );
            return false;
        }

        // the last snapshot bar may have been updated in place since
        let resume = bars.len().saturating_sub(1);
        bars.truncate(resume);
        for bar in &current[resume..] {
            let mut bar = bar.clone();
            bar.values.clear();
            bars.push(bar);
            self.engine.recompute_incremental(&mut bars);
        }

        tracing::debug!(count = bars.len(), "recomputed bars installed");
        self.manager.replace_bars(bars);
        true
    }
}
