use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// The dot to draw this frame, in absolute pixels.
#[derive(Debug, Clone, Copy)]
pub struct DotStimulus {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Cue dots render green (smile prompt); ordinary dots red.
    pub cue: bool,
}

/// Minimal stimulus renderer: black background, one bordered dot.
pub struct DotRenderer;

impl DotRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render_frame(&self, pixmap: &mut Pixmap, dot: Option<DotStimulus>) {
        pixmap.fill(Color::BLACK);

        let Some(dot) = dot else { return };

        // White border ring around the dot.
        let mut ring_paint = Paint::default();
        ring_paint.set_color(Color::WHITE);
        ring_paint.anti_alias = true;

        let mut ring = PathBuilder::new();
        ring.push_circle(dot.x, dot.y, dot.radius + 2.0);
        if let Some(path) = ring.finish() {
            let stroke = Stroke { width: 3.0, ..Stroke::default() };
            pixmap.stroke_path(&path, &ring_paint, &stroke, Transform::identity(), None);
        }

        let mut dot_paint = Paint::default();
        let color = if dot.cue {
            Color::from_rgba8(0, 255, 0, 255)
        } else {
            Color::from_rgba8(255, 0, 0, 255)
        };
        dot_paint.set_color(color);
        dot_paint.anti_alias = true;

        let mut circle = PathBuilder::new();
        circle.push_circle(dot.x, dot.y, dot.radius);
        if let Some(path) = circle.finish() {
            pixmap.fill_path(&path, &dot_paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

impl Default for DotRenderer {
    fn default() -> Self {
        Self::new()
    }
}
