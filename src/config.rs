use bon::Builder;
use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::layout::Ring;
use crate::stacking::{DisplayFormat, Scale};

// ============================================================================
// DEFAULTS
// ============================================================================

/// Theme color names used for segments without an explicit color, in cycle order.
pub const PALETTE: [&str; 8] = [
    "green",
    "yellow",
    "orange",
    "red",
    "blue",
    "light-blue",
    "pink",
    "purple",
];

pub const DEFAULT_MIN: f64 = 0.0;
pub const DEFAULT_MAX: f64 = 100.0;
pub const DEFAULT_PRECISION: f64 = 1.0;
pub const DEFAULT_SCALE_FACTOR: f64 = 1.0;
pub const DEFAULT_CARD_WIDTH: f64 = 300.0;
pub const DEFAULT_BACKGROUND_COLOR: &str = "var(--secondary-background-color)";
pub const DEFAULT_TITLE_FONT_SIZE: &str = "20px";
pub const DEFAULT_VALUE_FONT_SIZE: &str = "18px";
pub const DEFAULT_LABEL_FONT_SIZE: &str = "12px";

/// Upper bound for decimal places in displayed values.
pub const MAX_PRECISION: usize = 20;

/// Default color for the segment at `index`, e.g. `var(--green-color)`.
pub fn palette_color(index: usize) -> String {
    format!("var(--{}-color)", PALETTE[index % PALETTE.len()])
}

// ============================================================================
// RAW CONFIGURATION (AS SUPPLIED BY THE HOST)
// ============================================================================

/// One segment as written by the user, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Builder, Deserialize)]
pub struct SegmentSpec {
    #[builder(into)]
    #[serde(default, alias = "sourceId", alias = "source_id")]
    pub entity: Option<String>,
    #[builder(into)]
    #[serde(default)]
    pub attribute: Option<String>,
    #[builder(into)]
    #[serde(default, deserialize_with = "lenient_text")]
    pub color: Option<String>,
    #[builder(into)]
    #[serde(default, deserialize_with = "lenient_text")]
    pub label: Option<String>,
}

/// The gauge configuration as written by the user.
///
/// Numeric fields accept numbers or numeric strings; anything else is treated
/// as if the field were absent and picks up its default during [`normalize`].
#[derive(Debug, Clone, Default, Builder, Deserialize)]
pub struct RawGaugeConfig {
    #[serde(default, alias = "outerSegments", alias = "outer_segments")]
    pub outer: Option<Vec<SegmentSpec>>,
    #[serde(default, alias = "innerSegments", alias = "inner_segments")]
    pub inner: Option<Vec<SegmentSpec>>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub precision: Option<f64>,
    #[serde(default, alias = "scaleFactor", deserialize_with = "lenient_number")]
    pub scale_factor: Option<f64>,

    #[serde(
        default,
        alias = "cardWidth",
        alias = "card_width",
        deserialize_with = "lenient_number"
    )]
    pub cardwidth: Option<f64>,
    #[builder(into)]
    #[serde(default, alias = "backgroundColor", deserialize_with = "lenient_text")]
    pub background_color: Option<String>,
    #[builder(into)]
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[builder(into)]
    #[serde(default, alias = "titleFontSize", deserialize_with = "lenient_text")]
    pub title_font_size: Option<String>,
    #[builder(into)]
    #[serde(default, alias = "valueFontSize", deserialize_with = "lenient_text")]
    pub value_font_size: Option<String>,
    #[builder(into)]
    #[serde(default, alias = "labelFontSize", deserialize_with = "lenient_text")]
    pub label_font_size: Option<String>,
    #[builder(into)]
    #[serde(default, deserialize_with = "lenient_text")]
    pub header: Option<String>,
}

impl RawGaugeConfig {
    pub fn from_json(raw: &Value) -> Result<Self, ConfigError> {
        Ok(Self::deserialize(raw)?)
    }

    pub fn normalize(&self) -> Result<GaugeConfig, ConfigError> {
        normalize(self)
    }
}

/// Reads a number the way a loosely typed dashboard config would: numbers and
/// numeric strings count, everything else (including NaN and infinities) does not.
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(numeric))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ============================================================================
// NORMALIZED CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub color: String,
    pub label: String,
}

/// Fully defaulted gauge configuration. Serializes back to the raw shape, so a
/// normalized config can be fed through [`GaugeConfig::from_json`] again unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeConfig {
    pub outer: Vec<Segment>,
    pub inner: Vec<Segment>,
    pub min: f64,
    pub max: f64,
    pub precision: usize,
    pub scale_factor: f64,
    pub cardwidth: f64,
    pub background_color: String,
    pub title: String,
    pub title_font_size: String,
    pub value_font_size: String,
    pub label_font_size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl GaugeConfig {
    pub fn from_json(raw: &Value) -> Result<Self, ConfigError> {
        RawGaugeConfig::from_json(raw)?.normalize()
    }

    pub fn segments(&self, ring: Ring) -> &[Segment] {
        match ring {
            Ring::Outer => &self.outer,
            Ring::Inner => &self.inner,
        }
    }

    pub fn scale(&self) -> Scale {
        Scale::new(self.min, self.max)
    }

    pub fn display(&self) -> DisplayFormat {
        DisplayFormat::new(self.precision, self.scale_factor)
    }
}

/// Validates `raw` and fills in every default. The input is only read, never
/// modified; the result shares no data with it.
pub fn normalize(raw: &RawGaugeConfig) -> Result<GaugeConfig, ConfigError> {
    let outer = required_ring(Ring::Outer, raw.outer.as_deref())?;
    let inner = required_ring(Ring::Inner, raw.inner.as_deref())?;

    let min = number_or(raw.min, DEFAULT_MIN, "min value");
    let max = number_or(raw.max, DEFAULT_MAX, "max value");
    if min == max {
        return Err(ConfigError::DegenerateRange { min, max });
    }

    let precision = number_or(raw.precision, DEFAULT_PRECISION, "precision")
        .trunc()
        .clamp(0.0, MAX_PRECISION as f64) as usize;

    let config = GaugeConfig {
        outer: default_segments(Ring::Outer, outer, 0),
        inner: default_segments(Ring::Inner, inner, outer.len()),
        min,
        max,
        precision,
        scale_factor: number_or(raw.scale_factor, DEFAULT_SCALE_FACTOR, "scale factor"),
        cardwidth: number_or(raw.cardwidth, DEFAULT_CARD_WIDTH, "card width"),
        background_color: text_or(
            &raw.background_color,
            DEFAULT_BACKGROUND_COLOR,
            "background color",
        ),
        title: text_or(&raw.title, "", "title"),
        title_font_size: text_or(&raw.title_font_size, DEFAULT_TITLE_FONT_SIZE, "title font size"),
        value_font_size: text_or(&raw.value_font_size, DEFAULT_VALUE_FONT_SIZE, "value font size"),
        label_font_size: text_or(&raw.label_font_size, DEFAULT_LABEL_FONT_SIZE, "label font size"),
        header: raw.header.clone(),
    };
    debug!("Normalized gauge configuration: {config:?}");
    Ok(config)
}

fn required_ring(ring: Ring, segments: Option<&[SegmentSpec]>) -> Result<&[SegmentSpec], ConfigError> {
    let segments = match segments {
        Some(segments) if !segments.is_empty() => segments,
        _ => return Err(ConfigError::MissingSegments(ring)),
    };
    for (index, segment) in segments.iter().enumerate() {
        if segment.entity.as_deref().map_or(true, |id| id.trim().is_empty()) {
            return Err(ConfigError::MissingSourceId { ring, index });
        }
    }
    Ok(segments)
}

fn default_segments(ring: Ring, specs: &[SegmentSpec], color_offset: usize) -> Vec<Segment> {
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let color = spec.color.clone().unwrap_or_else(|| {
                let color = palette_color(i + color_offset);
                info!("Setting default color for {ring} value #{i} to {color}");
                color
            });
            let label = spec.label.clone().unwrap_or_else(|| {
                info!("No label for {ring} value #{i} defined");
                String::new()
            });
            Segment {
                entity: spec.entity.clone().unwrap_or_default(),
                attribute: spec.attribute.clone(),
                color,
                label,
            }
        })
        .collect()
}

fn number_or(value: Option<f64>, default: f64, what: &str) -> f64 {
    match value.filter(|v| v.is_finite()) {
        Some(value) => value,
        None => {
            info!("Setting default {what} to {default}");
            default
        }
    }
}

fn text_or(value: &Option<String>, default: &str, what: &str) -> String {
    match value {
        Some(value) => value.clone(),
        None => {
            info!("Setting default {what} to {default:?}");
            default.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "outer": [{ "entity": "sensor.a" }, { "entity": "sensor.b" }],
            "inner": [{ "entity": "sensor.c" }],
        })
    }

    #[test]
    fn fills_every_default() {
        let config = GaugeConfig::from_json(&minimal()).unwrap();
        assert_eq!(config.min, 0.0);
        assert_eq!(config.max, 100.0);
        assert_eq!(config.precision, 1);
        assert_eq!(config.scale_factor, 1.0);
        assert_eq!(config.cardwidth, 300.0);
        assert_eq!(config.background_color, "var(--secondary-background-color)");
        assert_eq!(config.title, "");
        assert_eq!(config.title_font_size, "20px");
        assert_eq!(config.value_font_size, "18px");
        assert_eq!(config.label_font_size, "12px");
        assert_eq!(config.outer[0].label, "");
        assert_eq!(config.outer[1].color, "var(--yellow-color)");
        assert_eq!(config.header, None);
    }

    #[test]
    fn inner_palette_continues_after_outer_ring() {
        let outer: Vec<Value> = (0..9).map(|i| json!({ "entity": format!("sensor.o{i}") })).collect();
        let raw = json!({ "outer": outer, "inner": [{ "entity": "sensor.i0" }, { "entity": "sensor.i1" }] });
        let config = GaugeConfig::from_json(&raw).unwrap();

        assert_eq!(config.outer[8].color, "var(--green-color)");
        // 9 outer segments: inner ring starts at palette index 9 mod 8 = 1
        assert_eq!(config.inner[0].color, "var(--yellow-color)");
        assert_eq!(config.inner[1].color, "var(--orange-color)");
    }

    #[test]
    fn explicit_colors_and_labels_are_kept() {
        let raw = json!({
            "outer": [{ "entity": "sensor.a", "color": "#ff0000", "label": "Solar" }],
            "inner": [{ "sourceId": "sensor.b", "attribute": "power", "label": 7 }],
        });
        let config = GaugeConfig::from_json(&raw).unwrap();
        assert_eq!(config.outer[0].color, "#ff0000");
        assert_eq!(config.outer[0].label, "Solar");
        assert_eq!(config.inner[0].entity, "sensor.b");
        assert_eq!(config.inner[0].attribute.as_deref(), Some("power"));
        assert_eq!(config.inner[0].label, "7");
        assert_eq!(config.inner[0].color, "var(--yellow-color)");
    }

    #[test]
    fn non_numeric_fields_fall_back_to_defaults() {
        let mut raw = minimal();
        raw["min"] = json!("not a number");
        raw["max"] = json!("250");
        raw["precision"] = json!(null);
        raw["scale_factor"] = json!([1, 2]);
        raw["cardwidth"] = json!(true);
        let config = GaugeConfig::from_json(&raw).unwrap();
        assert_eq!(config.min, 0.0);
        assert_eq!(config.max, 250.0);
        assert_eq!(config.precision, 1);
        assert_eq!(config.scale_factor, 1.0);
        assert_eq!(config.cardwidth, 300.0);
    }

    #[test]
    fn precision_is_truncated_and_bounded() {
        let mut raw = minimal();
        raw["precision"] = json!(2.7);
        assert_eq!(GaugeConfig::from_json(&raw).unwrap().precision, 2);
        raw["precision"] = json!(-3);
        assert_eq!(GaugeConfig::from_json(&raw).unwrap().precision, 0);
        raw["precision"] = json!(400);
        assert_eq!(GaugeConfig::from_json(&raw).unwrap().precision, MAX_PRECISION);
    }

    #[test]
    fn rejects_missing_or_empty_rings() {
        let err = GaugeConfig::from_json(&json!({ "inner": [{ "entity": "sensor.c" }] })).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSegments(Ring::Outer)));

        let err = GaugeConfig::from_json(&json!({ "outer": [{ "entity": "a" }], "inner": [] })).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSegments(Ring::Inner)));
    }

    #[test]
    fn rejects_segment_without_source() {
        let raw = json!({ "outer": [{ "label": "x" }], "inner": [{ "entity": "sensor.c" }] });
        let err = GaugeConfig::from_json(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSourceId { ring: Ring::Outer, index: 0 }));

        let raw = json!({ "outer": [{ "entity": "a" }], "inner": [{ "entity": "b" }, { "entity": "" }] });
        let err = GaugeConfig::from_json(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSourceId { ring: Ring::Inner, index: 1 }));
    }

    #[test]
    fn rejects_degenerate_range() {
        let mut raw = minimal();
        raw["min"] = json!(50);
        raw["max"] = json!(50);
        assert!(matches!(
            GaugeConfig::from_json(&raw),
            Err(ConfigError::DegenerateRange { .. })
        ));
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(matches!(GaugeConfig::from_json(&json!([1, 2])), Err(ConfigError::Malformed(_))));
        assert!(matches!(
            GaugeConfig::from_json(&json!({ "outer": "sensor.a" })),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn normalizing_twice_is_stable() {
        let mut raw = minimal();
        raw["title"] = json!("Power");
        raw["header"] = json!("House");
        let once = GaugeConfig::from_json(&raw).unwrap();
        let twice = GaugeConfig::from_json(&serde_json::to_value(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn builder_matches_json_input() {
        let raw = RawGaugeConfig::builder()
            .outer(vec![
                SegmentSpec::builder().entity("sensor.a").build(),
                SegmentSpec::builder().entity("sensor.b").build(),
            ])
            .inner(vec![SegmentSpec::builder().entity("sensor.c").build()])
            .build();
        assert_eq!(raw.normalize().unwrap(), GaugeConfig::from_json(&minimal()).unwrap());
    }

    #[test]
    fn caller_input_is_untouched() {
        let raw = minimal();
        let before = raw.clone();
        let _ = GaugeConfig::from_json(&raw).unwrap();
        assert_eq!(raw, before);
    }
}
