//! Software rendering of the card into an RGBA frame (as used by `pixels`).

use std::f64::consts::{PI, TAU};

use rusttype::{point, Font, PositionedGlyph, Scale as FontScale};

use crate::config::{DEFAULT_LABEL_FONT_SIZE, DEFAULT_TITLE_FONT_SIZE, DEFAULT_VALUE_FONT_SIZE};
use crate::layout::{DiagnosticView, GaugeView, Ring, View};
use crate::stacking::Degrees;
use crate::surface::RenderSurface;

// ============================================================================
// COLOR CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses the color forms a card config uses: `var(--name[, fallback])`
    /// for theme colors, `#rgb`/`#rrggbb`, and bare theme names like `red`.
    pub fn from_css(value: &str) -> Option<Color> {
        let value = value.trim();
        if let Some(inner) = value
            .strip_prefix("var(--")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let (name, fallback) = match inner.split_once(',') {
                Some((name, fallback)) => (name, Some(fallback)),
                None => (inner, None),
            };
            return theme_color(name.trim()).or_else(|| fallback.and_then(Color::from_css));
        }
        if let Some(hex) = value.strip_prefix('#') {
            return from_hex(hex);
        }
        theme_color(&format!("{value}-color"))
    }
}

fn from_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Color::new(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(Color::new(short(0)?, short(1)?, short(2)?))
        }
        _ => None,
    }
}

/// RGB values of the dashboard theme variables the card refers to.
fn theme_color(name: &str) -> Option<Color> {
    let color = match name {
        "green-color" => Color::new(0x4c, 0xaf, 0x50),
        "yellow-color" => Color::new(0xff, 0xeb, 0x3b),
        "orange-color" => Color::new(0xff, 0x98, 0x00),
        "red-color" => Color::new(0xf4, 0x43, 0x36),
        "blue-color" => Color::new(0x21, 0x96, 0xf3),
        "light-blue-color" => Color::new(0x03, 0xa9, 0xf4),
        "pink-color" => Color::new(0xe9, 0x1e, 0x63),
        "purple-color" => Color::new(0x92, 0x6b, 0xc7),
        "secondary-background-color" => Color::new(0xe5, 0xe5, 0xe5),
        "primary-text-color" => Color::new(0x21, 0x21, 0x21),
        _ => return None,
    };
    Some(color)
}

const CARD_BACKGROUND: Color = Color::new(0xff, 0xff, 0xff);
const TEXT_COLOR: Color = Color::new(0x21, 0x21, 0x21);
const UNKNOWN_COLOR: Color = Color::new(0x9e, 0x9e, 0x9e);
const DIAGNOSTIC_BACKGROUND: Color = Color::new(0xff, 0x00, 0x00);
const DIAGNOSTIC_TEXT: Color = Color::new(0xff, 0xff, 0xff);

fn resolve_color(css: &str) -> Color {
    Color::from_css(css).unwrap_or(UNKNOWN_COLOR)
}

/// `"18px"` or `"18"` to pixels.
fn css_px(value: &str) -> Option<f32> {
    let value = value.trim();
    value
        .strip_suffix("px")
        .unwrap_or(value)
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|px| px.is_finite() && *px > 0.0)
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Card padding in CSS pixels.
const PADDING: f64 = 16.0;
/// Inner ring radius relative to the outer ring.
const INNER_RING_FACTOR: f64 = 0.8;

struct Dial {
    cx: f64,
    cy: f64,
    radius: f64,
    gauge_width: f64,
    label_radius: f64,
    /// Frame pixels per CSS pixel of the configured card width.
    scale: f64,
}

impl Dial {
    fn new(width: usize, height: usize, card_width: f64) -> Self {
        let (w, h) = (width as f64, height as f64);
        let diameter = (w - 2.0 * PADDING).min(2.0 * (h - 2.0 * PADDING)).max(0.0);
        let content_width = (card_width - 2.0 * PADDING).max(1.0);
        Self {
            cx: w / 2.0,
            cy: PADDING + diameter / 2.0,
            radius: diameter / 2.0,
            gauge_width: diameter / 10.5,
            label_radius: diameter / 5.5,
            scale: diameter / content_width,
        }
    }

    fn ring_radius(&self, ring: Ring) -> f64 {
        match ring {
            Ring::Outer => self.radius,
            Ring::Inner => self.radius * INNER_RING_FACTOR,
        }
    }

    /// Label positions are measured from the left end of the dial, clockwise.
    fn label_center(&self, position: Degrees) -> (f64, f64) {
        let a = position.radians();
        (
            self.cx - self.label_radius * a.cos(),
            self.cy - self.label_radius * a.sin(),
        )
    }

    fn font_px(&self, css: &str, default: &str) -> f32 {
        let px = css_px(css).or_else(|| css_px(default)).unwrap_or(12.0);
        (px as f64 * self.scale) as f32
    }
}

// ============================================================================
// CANVAS & DRAWING PRIMITIVES
// ============================================================================

struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    fn clear(&mut self, color: Color) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }

    fn blend(&mut self, x: usize, y: usize, color: Color, alpha: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y * self.width + x) * 4;
        let Some(dst) = self.frame.get_mut(idx..idx + 4) else {
            return;
        };
        let a = alpha.clamp(0.0, 1.0);
        let mix = |src: u8, dst: u8| (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8;
        let out = [
            mix(color.r, dst[0]),
            mix(color.g, dst[1]),
            mix(color.b, dst[2]),
            0xff,
        ];
        dst.copy_from_slice(&out);
    }

    fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, color: Color) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                self.blend(x, y, color, 1.0);
            }
        }
    }

    /// Band between `radius - thickness` and `radius`, from `start` sweeping
    /// `span` radians clockwise on screen (y grows downwards).
    fn ring_arc(
        &mut self,
        cx: f64,
        cy: f64,
        radius: f64,
        thickness: f64,
        start: f64,
        span: f64,
        color: Color,
    ) {
        if radius <= 0.0 || thickness <= 0.0 || span <= 0.0 {
            return;
        }
        let inner = (radius - thickness).max(0.0);
        let x0 = (cx - radius - 1.0).floor().max(0.0) as usize;
        let y0 = (cy - radius - 1.0).floor().max(0.0) as usize;
        let x1 = ((cx + radius + 1.0).ceil().max(0.0) as usize).min(self.width);
        let y1 = ((cy + radius + 1.0).ceil().max(0.0) as usize).min(self.height);

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist > radius + 1.0 || dist < inner - 1.0 {
                    continue;
                }
                let angle = dy.atan2(dx).rem_euclid(TAU);
                if (angle - start).rem_euclid(TAU) > span {
                    continue;
                }
                let aa = if dist > radius {
                    1.0 - (dist - radius)
                } else if dist < inner {
                    1.0 - (inner - dist)
                } else {
                    1.0
                };
                if aa > 0.0 {
                    self.blend(x, y, color, aa as f32);
                }
            }
        }
    }

    /// Draws `text` centred on (`x`, `y`).
    fn text(&mut self, font: &Font, x: f64, y: f64, text: &str, size: f32, color: Color) {
        if text.is_empty() || size <= 0.0 {
            return;
        }
        let scale = FontScale::uniform(size);
        let v_metrics = font.v_metrics(scale);
        let glyphs: Vec<PositionedGlyph> = font
            .layout(text, scale, point(0.0, v_metrics.ascent))
            .collect();
        let (min_x, max_x, min_y, max_y) = glyphs.iter().filter_map(|g| g.pixel_bounding_box()).fold(
            (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
            |(min_x, max_x, min_y, max_y), bb| {
                (
                    min_x.min(bb.min.x),
                    max_x.max(bb.max.x),
                    min_y.min(bb.min.y),
                    max_y.max(bb.max.y),
                )
            },
        );
        if min_x > max_x {
            return;
        }
        let offset_x = x.round() as i32 - (max_x - min_x) / 2;
        let offset_y = y.round() as i32 - (max_y - min_y) / 2;
        for glyph in &glyphs {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| {
                    let px = offset_x + gx as i32 + bb.min.x - min_x;
                    let py = offset_y + gy as i32 + bb.min.y - min_y;
                    if px >= 0 && py >= 0 {
                        self.blend(px as usize, py as usize, color, v);
                    }
                });
            }
        }
    }
}

// ============================================================================
// RASTER SURFACE
// ============================================================================

/// Paints the card into an RGBA frame of any size. Text needs a font; without
/// one only the rings (or the red diagnostic block) are drawn.
#[derive(Default)]
pub struct RasterSurface {
    card: Option<View>,
    font: Option<Font<'static>>,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(mut self, font: Font<'static>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn draw(&self, frame: &mut [u8], width: usize, height: usize) {
        let mut canvas = Canvas::new(frame, width, height);
        canvas.clear(CARD_BACKGROUND);
        match &self.card {
            Some(View::Gauge(view)) => self.draw_gauge(&mut canvas, view),
            Some(View::Diagnostic(view)) => self.draw_diagnostic(&mut canvas, view),
            None => {}
        }
    }

    fn draw_gauge(&self, canvas: &mut Canvas, view: &GaugeView) {
        let dial = Dial::new(canvas.width, canvas.height, view.style.width);

        canvas.ring_arc(
            dial.cx,
            dial.cy,
            dial.radius,
            dial.gauge_width * 2.0 - 2.0 * dial.scale,
            PI,
            PI,
            resolve_color(&view.style.background_color),
        );

        for node in &view.segments {
            let sweep = (node.angle.0 - Degrees::CLOSED.0).clamp(0.0, 180.0);
            canvas.ring_arc(
                dial.cx,
                dial.cy,
                dial.ring_radius(node.ring),
                dial.gauge_width,
                PI,
                sweep.to_radians(),
                resolve_color(&node.color),
            );
        }

        let Some(font) = self.font.as_ref() else {
            return;
        };
        let value_px = dial.font_px(&view.style.value_font_size, DEFAULT_VALUE_FONT_SIZE);
        let label_px = dial.font_px(&view.style.label_font_size, DEFAULT_LABEL_FONT_SIZE);
        let title_px = dial.font_px(&view.style.title_font_size, DEFAULT_TITLE_FONT_SIZE);

        for label in &view.labels {
            let (x, y) = dial.label_center(label.position);
            let color = resolve_color(&label.color);
            canvas.text(font, x, y - label_px as f64 * 0.5, &label.value, value_px, color);
            canvas.text(font, x, y + value_px as f64 * 0.5, &label.label, label_px, color);
        }
        canvas.text(
            font,
            dial.cx,
            dial.cy - title_px as f64 * 0.6,
            &view.title,
            title_px,
            TEXT_COLOR,
        );
    }

    fn draw_diagnostic(&self, canvas: &mut Canvas, view: &DiagnosticView) {
        let inset = 8;
        canvas.fill_rect(
            inset,
            inset,
            canvas.width.saturating_sub(inset),
            canvas.height.saturating_sub(inset),
            DIAGNOSTIC_BACKGROUND,
        );
        let Some(font) = self.font.as_ref() else {
            return;
        };
        let size = 14.0;
        let line_height = size as f64 * 1.4;
        for (i, line) in view.lines().iter().enumerate() {
            let y = 2.0 * inset as f64 + line_height * (i as f64 + 0.5);
            canvas.text(font, canvas.width as f64 / 2.0, y, line, size, DIAGNOSTIC_TEXT);
        }
    }

    /// Container class of the label slot under (`x`, `y`), topmost first.
    pub fn label_at(&self, x: f64, y: f64, width: usize, height: usize) -> Option<String> {
        let Some(View::Gauge(view)) = &self.card else {
            return None;
        };
        let dial = Dial::new(width, height, view.style.width);
        let value_px = dial.font_px(&view.style.value_font_size, DEFAULT_VALUE_FONT_SIZE) as f64;
        let label_px = dial.font_px(&view.style.label_font_size, DEFAULT_LABEL_FONT_SIZE) as f64;
        let (half_w, half_h) = (value_px.max(label_px) * 1.5, (value_px + label_px) * 0.6);

        view.labels
            .iter()
            .rev()
            .find(|label| {
                let (lx, ly) = dial.label_center(label.position);
                (x - lx).abs() <= half_w && (y - ly).abs() <= half_h
            })
            .map(|label| label.container_class.clone())
    }
}

impl RenderSurface for RasterSurface {
    fn build_gauge(&mut self, view: &GaugeView) {
        self.card = Some(View::Gauge(view.clone()));
    }

    fn build_diagnostic(&mut self, view: &DiagnosticView) {
        self.card = Some(View::Diagnostic(view.clone()));
    }

    fn set_rotation(&mut self, variable: &str, angle: Degrees) {
        if let Some(View::Gauge(view)) = self.card.as_mut() {
            if let Some(node) = view.segment_by_variable_mut(variable) {
                node.angle = angle;
            }
        }
    }

    fn set_value_text(&mut self, slot: &str, text: &str) {
        if let Some(View::Gauge(view)) = self.card.as_mut() {
            if let Some(label) = view.label_by_value_class_mut(slot) {
                label.value = text.to_string();
            }
        }
    }

    fn teardown(&mut self) {
        self.card = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GaugeConfig;
    use crate::layout::build_view;
    use serde_json::json;

    const WIDTH: usize = 300;
    const HEIGHT: usize = 166;

    fn pixel(frame: &[u8], x: usize, y: usize) -> Color {
        let idx = (y * WIDTH + x) * 4;
        Color::new(frame[idx], frame[idx + 1], frame[idx + 2])
    }

    fn surface() -> RasterSurface {
        let config = GaugeConfig::from_json(&json!({
            "outer": [{ "entity": "sensor.a" }],
            "inner": [{ "entity": "sensor.b", "color": "#0000ff" }],
        }))
        .unwrap();
        let mut surface = RasterSurface::new();
        surface.build_gauge(&build_view(&config));
        surface
    }

    #[test]
    fn parses_css_colors() {
        assert_eq!(Color::from_css("var(--green-color)"), Some(Color::new(0x4c, 0xaf, 0x50)));
        assert_eq!(Color::from_css("#ff8000"), Some(Color::new(0xff, 0x80, 0x00)));
        assert_eq!(Color::from_css("#f80"), Some(Color::new(0xff, 0x88, 0x00)));
        assert_eq!(Color::from_css("var(--nope, #010203)"), Some(Color::new(1, 2, 3)));
        assert_eq!(Color::from_css("red"), Some(Color::new(0xf4, 0x43, 0x36)));
        assert_eq!(Color::from_css("var(--nope)"), None);
        assert_eq!(Color::from_css("#12"), None);
        assert_eq!(Color::from_css("#aé"), None);
        assert_eq!(Color::from_css("#ééé"), None);
    }

    #[test]
    fn non_ascii_segment_color_paints_fallback() {
        let config = GaugeConfig::from_json(&json!({
            "outer": [{ "entity": "sensor.a", "color": "#aé" }],
            "inner": [{ "entity": "sensor.b" }],
        }))
        .unwrap();
        let mut surface = RasterSurface::new();
        surface.build_gauge(&build_view(&config));
        surface.set_rotation("outer-angle-0", Degrees(360.0));
        let mut frame = vec![0u8; WIDTH * HEIGHT * 4];
        surface.draw(&mut frame, WIDTH, HEIGHT);
        assert_eq!(pixel(&frame, 150, 26), UNKNOWN_COLOR);
    }

    #[test]
    fn reads_css_pixel_sizes() {
        assert_eq!(css_px("18px"), Some(18.0));
        assert_eq!(css_px(" 12 "), Some(12.0));
        assert_eq!(css_px("1.5em"), None);
    }

    #[test]
    fn closed_segment_leaves_background_ring() {
        let mut frame = vec![0u8; WIDTH * HEIGHT * 4];
        surface().draw(&mut frame, WIDTH, HEIGHT);
        // top of the outer ring
        assert_eq!(pixel(&frame, 150, 26), Color::new(0xe5, 0xe5, 0xe5));
        assert_eq!(pixel(&frame, 0, 0), CARD_BACKGROUND);
    }

    #[test]
    fn open_segments_paint_their_rings() {
        let mut surface = surface();
        surface.set_rotation("outer-angle-0", Degrees(360.0));
        surface.set_rotation("inner-angle-0", Degrees(360.0));
        let mut frame = vec![0u8; WIDTH * HEIGHT * 4];
        surface.draw(&mut frame, WIDTH, HEIGHT);
        assert_eq!(pixel(&frame, 150, 26), Color::new(0x4c, 0xaf, 0x50));
        // inner band spans radii 81.7..107.2 around (150, 150)
        assert_eq!(pixel(&frame, 150, 55), Color::new(0x00, 0x00, 0xff));
    }

    #[test]
    fn half_open_segment_covers_left_quarter_only() {
        let mut surface = surface();
        surface.set_rotation("outer-angle-0", Degrees(270.0));
        let mut frame = vec![0u8; WIDTH * HEIGHT * 4];
        surface.draw(&mut frame, WIDTH, HEIGHT);
        let green = Color::new(0x4c, 0xaf, 0x50);
        // left end of the ring
        assert_eq!(pixel(&frame, 26, 140), green);
        // right end stays background
        assert_eq!(pixel(&frame, 273, 140), Color::new(0xe5, 0xe5, 0xe5));
    }

    #[test]
    fn diagnostic_paints_red_block() {
        let mut surface = surface();
        surface.build_diagnostic(&DiagnosticView {
            header: None,
            title: None,
            sources: vec!["sensor.x".into()],
        });
        let mut frame = vec![0u8; WIDTH * HEIGHT * 4];
        surface.draw(&mut frame, WIDTH, HEIGHT);
        assert_eq!(pixel(&frame, 20, 20), DIAGNOSTIC_BACKGROUND);
        assert_eq!(pixel(&frame, 2, 2), CARD_BACKGROUND);
    }

    #[test]
    fn hit_tests_label_slots() {
        let surface = surface();
        // two labels: outer at 47.5°, inner at 132.5°, radius 268 / 5.5
        let dial = Dial::new(WIDTH, HEIGHT, 300.0);
        let (x, y) = dial.label_center(Degrees(47.5));
        assert_eq!(
            surface.label_at(x, y, WIDTH, HEIGHT).as_deref(),
            Some("outer-label-container-0")
        );
        let (x, y) = dial.label_center(Degrees(132.5));
        assert_eq!(
            surface.label_at(x, y, WIDTH, HEIGHT).as_deref(),
            Some("inner-label-container-0")
        );
        assert_eq!(surface.label_at(1.0, 1.0, WIDTH, HEIGHT), None);
    }
}
