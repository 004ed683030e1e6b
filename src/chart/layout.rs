//! Vertical partition of the drawing surface into the price pane and the
//! stacked secondary panes.

use egui::{Pos2, Rect};

use super::indicator::{SecondaryIndicator, SecondarySet};
use super::style::GeometryStyle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaneKind {
    Main,
    Secondary(SecondaryIndicator),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pane {
    pub kind: PaneKind,
    pub rect: Rect,
}

/// Split `total` into a main height followed by `secondary_count` equal
/// secondary heights. The main pane keeps at least `main_floor_ratio`.
pub fn layout_heights(
    total: f32,
    secondary_count: usize,
    per_pane_ratio: f32,
    main_floor_ratio: f32,
) -> (f32, Vec<f32>) {
    let total = total.max(0.0);
    if secondary_count == 0 {
        return (total, Vec::new());
    }

    let cap = (1.0 - main_floor_ratio).clamp(0.0, 1.0);
    let share = (per_pane_ratio.max(0.0) * secondary_count as f32).min(cap);
    let secondary_total = share * total;
    let each = secondary_total / secondary_count as f32;
    let main = total - each * secondary_count as f32;
    (main, vec![each; secondary_count])
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaneLayout {
    panes: Vec<Pane>,
    /// Strip under the panes holding the date labels
    date_rect: Rect,
    surface: Rect,
}

impl PaneLayout {
    /// Lay out panes inside `surface` after the top padding and the bottom
    /// date strip are removed. Main comes first, secondaries follow in
    /// selection order.
    pub fn compute(surface: Rect, secondaries: &SecondarySet, geometry: &GeometryStyle) -> Self {
        let top = surface.top() + geometry.top_padding;
        let bottom = (surface.bottom() - geometry.bottom_date_height).max(top);
        let (main_height, secondary_heights) = layout_heights(
            bottom - top,
            secondaries.len(),
            geometry.secondary_pane_ratio,
            geometry.main_floor_ratio,
        );

        let mut panes = Vec::with_capacity(secondaries.len() + 1);
        let mut y = top;
        panes.push(Pane {
            kind: PaneKind::Main,
            rect: Rect::from_min_max(
                Pos2::new(surface.left(), y),
                Pos2::new(surface.right(), y + main_height),
            ),
        });
        y += main_height;

        for (indicator, height) in secondaries.iter().zip(secondary_heights) {
            panes.push(Pane {
                kind: PaneKind::Secondary(*indicator),
                rect: Rect::from_min_max(
                    Pos2::new(surface.left(), y),
                    Pos2::new(surface.right(), y + height),
                ),
            });
            y += height;
        }

        tracing::debug!(
            panes = panes.len(),
            main_height,
            width = surface.width(),
            "pane layout computed"
        );

        Self {
            panes,
            date_rect: Rect::from_min_max(
                Pos2::new(surface.left(), bottom),
                Pos2::new(surface.right(), surface.bottom().max(bottom)),
            ),
            surface,
        }
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn main_rect(&self) -> Rect {
        self.panes.first().map(|pane| pane.rect).unwrap_or(Rect::NOTHING)
    }

    pub fn secondary_panes(&self) -> impl Iterator<Item = (SecondaryIndicator, Rect)> + '_ {
        self.panes.iter().filter_map(|pane| match pane.kind {
            PaneKind::Secondary(indicator) => Some((indicator, pane.rect)),
            PaneKind::Main => None,
        })
    }

    pub fn date_rect(&self) -> Rect {
        self.date_rect
    }

    pub fn surface(&self) -> Rect {
        self.surface
    }

    /// Bottom of the lowest pane
    pub fn content_bottom(&self) -> f32 {
        self.panes
            .last()
            .map(|pane| pane.rect.bottom())
            .unwrap_or(self.surface.bottom())
    }
}
