//! HTML/CSS rendering of the card for web hosts.
//!
//! Segments are half-circle containers rotated about the dial centre through
//! CSS variables (`--outer-angle-0: 225deg`); labels are placed with a per-slot
//! `--angle`. Updates only rewrite those variables and the value texts.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::layout::{DiagnosticView, GaugeView, Ring};
use crate::stacking::Degrees;
use crate::surface::RenderSurface;

const BASE_STYLES: &str = r#"
.stacked-dual-gauge-card div {
  box-sizing: border-box;
}
.stacked-dual-gauge {
  overflow: hidden;
  width: 100%;
  height: 0;
  padding-bottom: 50%;
}
.gauge-frame {
  width: 100%;
  height: 0;
  padding-bottom: 100%;
  position: relative;
}
.circle {
  position: absolute;
  top: 0;
  left: 0;
  width: 100%;
  height: 200%;
  border-radius: 100%;
  border: var(--gauge-width) solid;
  transition: border-color .5s linear;
}
.circle-container {
  position: absolute;
  transform-origin: 50% 100%;
  top: 0;
  left: 0;
  height: 50%;
  width: 100%;
  overflow: hidden;
  transition: transform .5s linear;
}
.small-circle .circle {
  top: 20%;
  left: 10%;
  width: 80%;
  height: 160%;
}
.gauge-background .circle {
  border: calc(var(--gauge-width) * 2 - 2px) solid var(--gauge-background-color);
}
.gauge-title {
  position: absolute;
  left: 50%;
  bottom: 50%;
  margin-bottom: 0.1em;
  transform: translateX(-50%);
  font-size: var(--title-font-size);
}
.label-on-circle {
  position: absolute;
  left: 50%;
  bottom: 50%;
  text-align: center;
  transform:
    translate(-50%, 50%)
    translate(calc(-1*var(--label-radius)*cos(var(--angle))), calc(-1*var(--label-radius)*sin(var(--angle))));
}
.gauge-value, .gauge-label {
  line-height: 85%;
  color: var(--label-color);
}
.gauge-value {
  font-size: var(--value-font-size);
  font-weight: bold;
}
.gauge-label {
  font-size: var(--label-font-size);
}
"#;

#[derive(Debug, Clone)]
enum Card {
    Gauge(GaugeView),
    Diagnostic(DiagnosticView),
}

/// Keeps the card as markup; [`MarkupSurface::document`] renders it on demand.
#[derive(Debug, Clone, Default)]
pub struct MarkupSurface {
    card: Option<Card>,
}

impl MarkupSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.card.is_none()
    }

    /// Rotation variables currently set on the card content.
    pub fn variables(&self) -> BTreeMap<String, String> {
        match &self.card {
            Some(Card::Gauge(view)) => view
                .segments
                .iter()
                .map(|node| (node.variable.clone(), node.angle.to_string()))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// The whole card, or `None` before anything was built.
    pub fn document(&self) -> Option<String> {
        let card = self.card.as_ref()?;
        let mut out = String::new();
        match card {
            Card::Gauge(view) => {
                open_card(&mut out, view.header.as_deref());
                write_gauge(&mut out, view, &self.variables());
                let _ = write!(out, "<style>{}</style>", stylesheet(view));
            }
            Card::Diagnostic(view) => {
                open_card(&mut out, view.header.as_deref());
                let lines: Vec<String> = view.lines().iter().map(|line| escape(line)).collect();
                let _ = write!(
                    out,
                    r#"<p style="background: red; padding: 8px;">{}</p>"#,
                    lines.join("<br>")
                );
            }
        }
        out.push_str("</ha-card>");
        Some(out)
    }
}

fn open_card(out: &mut String, header: Option<&str>) {
    match header {
        Some(header) => {
            let _ = write!(out, r#"<ha-card header="{}">"#, escape(header));
        }
        None => out.push_str("<ha-card>"),
    }
}

fn write_gauge(out: &mut String, view: &GaugeView, variables: &BTreeMap<String, String>) {
    let inline: Vec<String> = variables
        .iter()
        .map(|(name, value)| format!("--{name}: {value}"))
        .collect();
    let _ = write!(
        out,
        r#"<div class="stacked-dual-gauge-card" style="{}"><div class="stacked-dual-gauge"><div class="gauge-frame">"#,
        inline.join("; ")
    );
    out.push_str(
        r#"<div class="gauge-background circle-container"><div class="circle"></div></div>"#,
    );
    for node in &view.segments {
        let small = if node.ring == Ring::Inner { " small-circle" } else { "" };
        let _ = write!(
            out,
            r#"<div class="{} circle-container{small}"><div class="circle"></div></div>"#,
            node.class
        );
    }
    for label in &view.labels {
        let _ = write!(
            out,
            r#"<div class="label-on-circle {}"><div class="gauge-value {}">{}</div><div class="gauge-label {}">{}</div></div>"#,
            label.container_class,
            label.value_class,
            escape(&label.value),
            label.label_class,
            escape(&label.label)
        );
    }
    let _ = write!(
        out,
        r#"<div class="gauge-title">{}</div></div></div></div>"#,
        escape(&view.title)
    );
}

/// Card-level variables, shared rules, then one block per segment.
pub fn stylesheet(view: &GaugeView) -> String {
    let style = &view.style;
    let mut css = String::new();
    let _ = write!(
        css,
        r#"
.stacked-dual-gauge-card {{
  --gauge-card-width: {}px;
  --gauge-background-color: {};
  --gauge-width: calc(var(--gauge-card-width) / 10.5);
  --label-radius: calc(var(--gauge-card-width) / 5.5);
  --title-font-size: {};
  --value-font-size: {};
  --label-font-size: {};
  width: var(--gauge-card-width);
  padding: 16px;
  box-sizing: border-box;
  margin: 6px auto;
}}"#,
        style.width,
        style.background_color,
        style.title_font_size,
        style.value_font_size,
        style.label_font_size
    );
    css.push_str(BASE_STYLES);

    // Rules are emitted in forward index order, outer ring first.
    for ring in Ring::ALL {
        let mut labels: Vec<_> = view.labels.iter().filter(|l| l.ring == ring).collect();
        labels.sort_by_key(|l| l.index);
        for label in labels {
            let _ = write!(
                css,
                r#"
.{gauge} {{
  transform: rotate(var(--{variable}));
}}
.{gauge} .circle {{
  border-color: {color};
}}
.{container} {{
  --angle: {angle};
  --label-color: {color};
}}
"#,
                gauge = ring.gauge_class(label.index),
                variable = ring.angle_variable(label.index),
                color = label.color,
                container = label.container_class,
                angle = label.position,
            );
        }
    }
    css
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl RenderSurface for MarkupSurface {
    fn build_gauge(&mut self, view: &GaugeView) {
        self.card = Some(Card::Gauge(view.clone()));
    }

    fn build_diagnostic(&mut self, view: &DiagnosticView) {
        self.card = Some(Card::Diagnostic(view.clone()));
    }

    fn set_rotation(&mut self, variable: &str, angle: Degrees) {
        if let Some(Card::Gauge(view)) = self.card.as_mut() {
            if let Some(node) = view.segment_by_variable_mut(variable) {
                node.angle = angle;
            }
        }
    }

    fn set_value_text(&mut self, slot: &str, text: &str) {
        if let Some(Card::Gauge(view)) = self.card.as_mut() {
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

    fn view() -> GaugeView {
        build_view(
            &GaugeConfig::from_json(&json!({
                "title": "Power <W>",
                "header": "House",
                "cardwidth": 400,
                "outer": [{ "entity": "sensor.a", "label": "Solar" }],
                "inner": [{ "entity": "sensor.b", "color": "#123456" }],
            }))
            .unwrap(),
        )
    }

    #[test]
    fn document_uses_class_scheme() {
        let mut surface = MarkupSurface::new();
        assert!(surface.document().is_none());
        surface.build_gauge(&view());
        let html = surface.document().unwrap();
        assert!(html.starts_with(r#"<ha-card header="House">"#));
        assert!(html.contains(r#"<div class="outer-gauge-0 circle-container">"#));
        assert!(html.contains(r#"<div class="inner-gauge-0 circle-container small-circle">"#));
        assert!(html.contains(r#"class="label-on-circle outer-label-container-0""#));
        assert!(html.contains(r#"<div class="gauge-label outer-label-0">Solar</div>"#));
        assert!(html.contains(r#"<div class="gauge-title">Power &lt;W&gt;</div>"#));
    }

    #[test]
    fn updates_rewrite_variables_and_values() {
        let mut surface = MarkupSurface::new();
        surface.build_gauge(&view());
        surface.set_rotation("outer-angle-0", Degrees(225.0));
        surface.set_value_text("outer-value-0", "25.0");

        assert_eq!(surface.variables().get("outer-angle-0").map(String::as_str), Some("225deg"));
        let html = surface.document().unwrap();
        assert!(html.contains("--outer-angle-0: 225deg"));
        assert!(html.contains(r#"<div class="gauge-value outer-value-0">25.0</div>"#));
    }

    #[test]
    fn stylesheet_places_labels_and_colors() {
        let css = stylesheet(&view());
        assert!(css.contains("--gauge-card-width: 400px;"));
        assert!(css.contains("transform: rotate(var(--inner-angle-0));"));
        assert!(css.contains("border-color: #123456;"));
        // two labels: 85° increments starting at 47.5°
        assert!(css.contains("--angle: 47.5deg;"));
        assert!(css.contains("--angle: 132.5deg;"));
    }

    #[test]
    fn diagnostic_lists_missing_sources() {
        let mut surface = MarkupSurface::new();
        surface.build_diagnostic(&DiagnosticView {
            header: None,
            title: None,
            sources: vec!["sensor.x".into(), "sensor.y".into()],
        });
        assert_eq!(
            surface.document().unwrap(),
            r#"<ha-card><p style="background: red; padding: 8px;">Error finding these entities:<br>- sensor.x<br>- sensor.y</p></ha-card>"#
        );
        surface.teardown();
        assert!(surface.is_empty());
    }
}
