//! Display list produced by the painter.

use egui::epaint::{CircleShape, Mesh};
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, StrokeKind, Vec2};

/// Draw layer. Commands are painted in ascending layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Background,
    Grid,
    MainBars,
    MainOverlay,
    Secondary,
    Labels,
    Dates,
    Crosshair,
    LivePrice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Rect {
        rect: Rect,
        fill: Color32,
        stroke: Stroke,
        corner_radius: f32,
    },
    Segment {
        points: [Pos2; 2],
        stroke: Stroke,
    },
    Polyline {
        points: Vec<Pos2>,
        stroke: Stroke,
    },
    Dashed {
        from: Pos2,
        to: Pos2,
        dash: f32,
        gap: f32,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Pos2>,
        fill: Color32,
        stroke: Stroke,
    },
    /// Area between a polyline and a horizontal baseline, fading from
    /// `top` at the line to `bottom` at the baseline
    GradientArea {
        points: Vec<Pos2>,
        baseline: f32,
        top: Color32,
        bottom: Color32,
    },
    Circle {
        center: Pos2,
        radius: f32,
        fill: Color32,
        stroke: Stroke,
    },
    Text {
        pos: Pos2,
        anchor: Align2,
        text: String,
        size: f32,
        color: Color32,
    },
}

/// Width of rendered text. The painter only needs advances, never glyphs.
pub trait TextMeasure {
    fn text_width(&self, text: &str, size: f32) -> f32;

    fn text_height(&self, size: f32) -> f32 {
        size * 1.2
    }
}

/// Every character advances by `ratio * size`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvance {
    pub ratio: f32,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        Self { ratio: 0.6 }
    }
}

impl TextMeasure for FixedAdvance {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size * self.ratio
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    commands: Vec<(Layer, DrawCommand)>,
    /// Hit area of the live price tag, for tap-to-latest
    pub live_price_rect: Option<Rect>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: Layer, command: DrawCommand) {
        self.commands.push((layer, command));
    }

    pub fn text(
        &mut self,
        layer: Layer,
        pos: Pos2,
        anchor: Align2,
        text: impl Into<String>,
        size: f32,
        color: Color32,
    ) {
        self.push(
            layer,
            DrawCommand::Text {
                pos,
                anchor,
                text: text.into(),
                size,
                color,
            },
        );
    }

    pub fn segment(&mut self, layer: Layer, from: Pos2, to: Pos2, stroke: Stroke) {
        self.push(
            layer,
            DrawCommand::Segment {
                points: [from, to],
                stroke,
            },
        );
    }

    pub fn filled_rect(&mut self, layer: Layer, rect: Rect, fill: Color32) {
        self.push(
            layer,
            DrawCommand::Rect {
                rect,
                fill,
                stroke: Stroke::NONE,
                corner_radius: 0.0,
            },
        );
    }

    /// Stable sort by layer; commands within a layer keep emission order
    pub fn sort_layers(&mut self) {
        self.commands.sort_by_key(|(layer, _)| *layer);
    }

    pub fn commands(&self) -> &[(Layer, DrawCommand)] {
        &self.commands
    }

    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &DrawCommand> + '_ {
        self.commands
            .iter()
            .filter(move |(l, _)| *l == layer)
            .map(|(_, command)| command)
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Replay the display list onto an egui painter, shifted by `offset`
    /// from surface-local to screen coordinates
    pub fn paint(&self, painter: &Painter, offset: Vec2) {
        let mut shapes = Vec::with_capacity(self.commands.len());
        for (_, command) in &self.commands {
            match command {
                DrawCommand::Rect {
                    rect,
                    fill,
                    stroke,
                    corner_radius,
                } => {
                    if *fill != Color32::TRANSPARENT {
                        shapes.push(Shape::rect_filled(*rect, *corner_radius, *fill));
                    }
                    if stroke.width > 0.0 {
                        shapes.push(Shape::rect_stroke(
                            *rect,
                            *corner_radius,
                            *stroke,
                            StrokeKind::Inside,
                        ));
                    }
                }
                DrawCommand::Segment { points, stroke } => {
                    shapes.push(Shape::line_segment(*points, *stroke));
                }
                DrawCommand::Polyline { points, stroke } => {
                    shapes.push(Shape::line(points.clone(), *stroke));
                }
                DrawCommand::Dashed {
                    from,
                    to,
                    dash,
                    gap,
                    stroke,
                } => {
                    shapes.extend(Shape::dashed_line(&[*from, *to], *stroke, *dash, *gap));
                }
                DrawCommand::Polygon {
                    points,
                    fill,
                    stroke,
                } => {
                    shapes.push(Shape::convex_polygon(points.clone(), *fill, *stroke));
                }
                DrawCommand::GradientArea {
                    points,
                    baseline,
                    top,
                    bottom,
                } => {
                    shapes.push(Shape::mesh(gradient_mesh(points, *baseline, *top, *bottom)));
                }
                DrawCommand::Circle {
                    center,
                    radius,
                    fill,
                    stroke,
                } => {
                    shapes.push(Shape::Circle(CircleShape {
                        center: *center,
                        radius: *radius,
                        fill: *fill,
                        stroke: *stroke,
                    }));
                }
                DrawCommand::Text {
                    pos,
                    anchor,
                    text,
                    size,
                    color,
                } => {
                    // text is laid out by the painter, flush pending shapes to keep order
                    for mut shape in shapes.drain(..) {
                        shape.translate(offset);
                        painter.add(shape);
                    }
                    painter.text(*pos + offset, *anchor, text, FontId::proportional(*size), *color);
                }
            }
        }
        for mut shape in shapes {
            shape.translate(offset);
            painter.add(shape);
        }
    }
}

fn gradient_mesh(points: &[Pos2], baseline: f32, top: Color32, bottom: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    for pair in points.windows(2) {
        let base = mesh.vertices.len() as u32;
        mesh.colored_vertex(pair[0], top);
        mesh.colored_vertex(pair[1], top);
        mesh.colored_vertex(Pos2::new(pair[1].x, baseline), bottom);
        mesh.colored_vertex(Pos2::new(pair[0].x, baseline), bottom);
        mesh.add_triangle(base, base + 1, base + 2);
        mesh.add_triangle(base, base + 2, base + 3);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_order() {
        assert!(Layer::Background < Layer::Grid);
        assert!(Layer::Secondary < Layer::Labels);
        assert!(Layer::Crosshair < Layer::LivePrice);
    }

    #[test]
    fn test_sort_is_stable_within_layer() {
        let mut frame = Frame::new();
        frame.text(Layer::Labels, Pos2::ZERO, Align2::LEFT_TOP, "b", 8.0, Color32::BLACK);
        frame.filled_rect(Layer::Background, Rect::NOTHING, Color32::WHITE);
        frame.text(Layer::Labels, Pos2::ZERO, Align2::LEFT_TOP, "c", 8.0, Color32::BLACK);
        frame.sort_layers();

        let layers: Vec<Layer> = frame.commands().iter().map(|(l, _)| *l).collect();
        assert_eq!(layers, vec![Layer::Background, Layer::Labels, Layer::Labels]);
        let texts: Vec<&str> = frame
            .layer(Layer::Labels)
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn test_fixed_advance() {
        let measure = FixedAdvance::default();
        assert!((measure.text_width("1,234.50", 10.0) - 48.0).abs() < 1e-4);
        assert_eq!(measure.text_width("", 10.0), 0.0);
    }

    #[test]
    fn test_gradient_mesh_quads() {
        let points = [Pos2::new(0.0, 5.0), Pos2::new(10.0, 2.0), Pos2::new(20.0, 8.0)];
        let mesh = gradient_mesh(&points, 20.0, Color32::RED, Color32::TRANSPARENT);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.indices.len(), 12);
    }
}
