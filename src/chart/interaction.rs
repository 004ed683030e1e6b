//! Gesture state machine driving the viewport, with damped inertial pan.

use std::time::Duration;

use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

use super::viewport::Viewport;

/// Normalized gesture stream fed by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    PanStart { pos: Pos2, velocity: Vec2 },
    PanMove { pos: Pos2, delta: Vec2, velocity: Vec2 },
    PanEnd { pos: Pos2, velocity: Vec2 },
    PinchStart { center: Pos2 },
    /// Scale relative to the start of the pinch
    PinchUpdate { scale: f32 },
    PinchEnd,
    LongPressStart { pos: Pos2 },
    LongPressMove { pos: Pos2 },
    LongPressEnd,
    Tap { pos: Pos2 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// The viewport changed
    Redraw,
    /// Nothing to do
    Ignored,
    /// Not claimed; the host may route the gesture elsewhere
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Panning,
    PinchZooming,
    LongPressSelecting,
}

/// Inertial scroll constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InertiaConfig {
    /// Release speed in px/s above which a fling starts
    pub velocity_threshold: f32,
    /// Release velocity is divided by `scale * velocity_divisor`
    pub velocity_divisor: f32,
    pub damping: f32,
    /// Speed in content units per tick below which the fling stops
    pub stop_below: f32,
    pub tick_hz: f32,
}

impl Default for InertiaConfig {
    fn default() -> Self {
        Self {
            velocity_threshold: 50.0,
            velocity_divisor: 20.0,
            damping: 0.95,
            stop_below: 0.5,
            tick_hz: 60.0,
        }
    }
}

impl InertiaConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.tick_hz.max(1.0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    state: InteractionState,
    config: InertiaConfig,
    /// Fling speed in content units per tick
    velocity: Option<f32>,
    pending: Duration,
    pinch_base: f32,
    live_price_rect: Option<Rect>,
}

impl InteractionController {
    pub fn new(config: InertiaConfig) -> Self {
        Self {
            config,
            pinch_base: 1.0,
            ..Default::default()
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn config(&self) -> &InertiaConfig {
        &self.config
    }

    pub fn is_animating(&self) -> bool {
        self.velocity.is_some()
    }

    /// Hit area of the live price tag from the last frame
    pub fn set_live_price_rect(&mut self, rect: Option<Rect>) {
        self.live_price_rect = rect;
    }

    pub fn cancel_inertia(&mut self) {
        self.velocity = None;
        self.pending = Duration::ZERO;
    }

    pub fn handle(&mut self, viewport: &mut Viewport, event: GestureEvent) -> GestureOutcome {
        match event {
            GestureEvent::PanStart { velocity, .. } => {
                if velocity.x.abs() <= velocity.y.abs() {
                    return GestureOutcome::Declined;
                }
                self.cancel_inertia();
                self.state = InteractionState::Panning;
                viewport.set_selection(None);
                viewport.begin_user_scroll();
                GestureOutcome::Redraw
            }
            GestureEvent::PanMove { delta, .. } => {
                if self.state != InteractionState::Panning {
                    return GestureOutcome::Ignored;
                }
                viewport.scroll_by_user(delta.x);
                GestureOutcome::Redraw
            }
            GestureEvent::PanEnd { velocity, .. } => {
                if self.state != InteractionState::Panning {
                    return GestureOutcome::Ignored;
                }
                self.state = InteractionState::Idle;
                viewport.end_user_scroll();
                if velocity.x.abs() > self.config.velocity_threshold {
                    let speed = velocity.x / viewport.scale() / self.config.velocity_divisor;
                    tracing::debug!(speed, "inertial scroll started");
                    self.velocity = Some(speed);
                }
                GestureOutcome::Redraw
            }
            GestureEvent::PinchStart { .. } => {
                self.cancel_inertia();
                self.state = InteractionState::PinchZooming;
                self.pinch_base = viewport.scale();
                viewport.set_selection(None);
                GestureOutcome::Redraw
            }
            GestureEvent::PinchUpdate { scale } => {
                if self.state != InteractionState::PinchZooming {
                    return GestureOutcome::Ignored;
                }
                viewport.set_scale(self.pinch_base * scale);
                GestureOutcome::Redraw
            }
            GestureEvent::PinchEnd => {
                if self.state != InteractionState::PinchZooming {
                    return GestureOutcome::Ignored;
                }
                self.state = InteractionState::Idle;
                GestureOutcome::Redraw
            }
            GestureEvent::LongPressStart { pos } => {
                self.cancel_inertia();
                self.state = InteractionState::LongPressSelecting;
                viewport.set_selection(Some(pos));
                GestureOutcome::Redraw
            }
            GestureEvent::LongPressMove { pos } => {
                if self.state != InteractionState::LongPressSelecting {
                    return GestureOutcome::Ignored;
                }
                viewport.set_selection(Some(pos));
                GestureOutcome::Redraw
            }
            GestureEvent::LongPressEnd => {
                if self.state != InteractionState::LongPressSelecting {
                    return GestureOutcome::Ignored;
                }
                self.state = InteractionState::Idle;
                viewport.set_selection(None);
                GestureOutcome::Redraw
            }
            GestureEvent::Tap { pos } => {
                self.cancel_inertia();
                self.state = InteractionState::Idle;
                if self.live_price_rect.is_some_and(|rect| rect.contains(pos)) {
                    tracing::debug!("jump to latest");
                    viewport.jump_to_latest();
                } else {
                    viewport.set_selection(Some(pos));
                }
                GestureOutcome::Redraw
            }
        }
    }

    /// One inertia tick. Returns whether the viewport moved.
    pub fn tick(&mut self, viewport: &mut Viewport) -> bool {
        let Some(velocity) = self.velocity else {
            return false;
        };
        let velocity = velocity * self.config.damping;
        let moved = viewport.scroll_by_content(velocity);
        if !moved || velocity.abs() < self.config.stop_below {
            self.cancel_inertia();
        } else {
            self.velocity = Some(velocity);
        }
        true
    }

    /// Run the whole ticks contained in `elapsed`, carrying the remainder.
    /// Returns whether a redraw is needed.
    pub fn advance(&mut self, viewport: &mut Viewport, elapsed: Duration) -> bool {
        if self.velocity.is_none() {
            return false;
        }
        let interval = self.config.tick_interval();
        self.pending += elapsed;
        let mut redraw = false;
        while self.pending >= interval && self.velocity.is_some() {
            self.pending -= interval;
            redraw |= self.tick(viewport);
        }
        redraw
    }
}
