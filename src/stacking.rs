use std::fmt;

use crate::config::{GaugeConfig, Segment};
use crate::error::UnresolvedSourceError;
use crate::snapshot::{self, DataSnapshot, Reading};

/// Text shown in a value slot when the segment has no numeric reading.
pub const NO_DATA_TEXT: &str = "-";

/// Rotation in degrees, formatted as a CSS angle (`216deg`).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Degrees(pub f64);

impl Degrees {
    /// A segment rotated this far is fully hidden below the dial.
    pub const CLOSED: Degrees = Degrees(180.0);

    pub fn radians(self) -> f64 {
        self.0.to_radians()
    }
}

impl fmt::Display for Degrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}deg", self.0)
    }
}

/// Gauge scale shared by both rings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub min: f64,
    pub max: f64,
}

impl Scale {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Maps a stacked value onto the half circle: `min` is 180°, `max` is 360°.
    pub fn angle_for(&self, value: f64) -> Degrees {
        let span = self.max - self.min;
        if value.is_nan() || span == 0.0 {
            return Degrees::CLOSED;
        }
        let clamped = value.max(self.min).min(self.max);
        Degrees(180.0 + 180.0 * (clamped - self.min) / span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayFormat {
    pub precision: usize,
    pub scale_factor: f64,
}

impl DisplayFormat {
    pub fn new(precision: usize, scale_factor: f64) -> Self {
        Self {
            precision,
            scale_factor,
        }
    }

    pub fn format(&self, reading: Reading) -> String {
        match reading {
            Reading::Value(v) => format!("{:.*}", self.precision, v * self.scale_factor),
            Reading::NoData => NO_DATA_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackedSegment {
    pub reading: Reading,
    pub cumulative: f64,
    pub angle: Degrees,
    pub text: String,
}

/// Stacks one ring's readings in list order, starting from the scale minimum.
/// A segment without data carries the running total forward unchanged.
pub fn stack(readings: &[Reading], scale: Scale, display: DisplayFormat) -> Vec<StackedSegment> {
    let mut total = scale.min;
    readings
        .iter()
        .map(|&reading| {
            if let Reading::Value(v) = reading {
                total += v;
            }
            StackedSegment {
                reading,
                cumulative: total,
                angle: scale.angle_for(total),
                text: display.format(reading),
            }
        })
        .collect()
}

pub fn stack_ring(
    segments: &[Segment],
    snapshot: &DataSnapshot,
    config: &GaugeConfig,
) -> Result<Vec<StackedSegment>, UnresolvedSourceError> {
    let readings = snapshot::resolve_segments(segments, snapshot)?;
    Ok(stack(&readings, config.scale(), config.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PERCENT: Scale = Scale { min: 0.0, max: 100.0 };

    #[test]
    fn no_data_carries_total_forward() {
        let readings = [Reading::Value(10.0), Reading::Value(20.0), Reading::NoData];
        let stacked = stack(&readings, PERCENT, DisplayFormat::new(1, 1.0));
        let cumulative: Vec<f64> = stacked.iter().map(|s| s.cumulative).collect();
        assert_eq!(cumulative, vec![10.0, 30.0, 30.0]);
        assert_eq!(stacked[2].text, "-");
        assert_eq!(stacked[2].angle, stacked[1].angle);
    }

    #[test]
    fn stacking_starts_at_scale_minimum() {
        let stacked = stack(
            &[Reading::NoData, Reading::Value(5.0)],
            Scale::new(-10.0, 10.0),
            DisplayFormat::new(0, 1.0),
        );
        assert_eq!(stacked[0].cumulative, -10.0);
        assert_eq!(stacked[0].angle, Degrees(180.0));
        assert_eq!(stacked[1].cumulative, -5.0);
        assert_eq!(stacked[1].angle, Degrees(225.0));
    }

    #[test]
    fn angle_spans_half_circle_and_clamps() {
        assert_eq!(PERCENT.angle_for(0.0), Degrees(180.0));
        assert_eq!(PERCENT.angle_for(50.0), Degrees(270.0));
        assert_eq!(PERCENT.angle_for(100.0), Degrees(360.0));
        assert_eq!(PERCENT.angle_for(150.0), Degrees(360.0));
        assert_eq!(PERCENT.angle_for(-20.0), Degrees(180.0));
        assert_eq!(PERCENT.angle_for(f64::NAN), Degrees::CLOSED);
    }

    #[test]
    fn degenerate_scale_stays_closed() {
        assert_eq!(Scale::new(5.0, 5.0).angle_for(5.0), Degrees::CLOSED);
    }

    #[test]
    fn angles_format_as_css() {
        assert_eq!(Degrees(180.0).to_string(), "180deg");
        assert_eq!(Degrees(223.2).to_string(), "223.2deg");
    }

    #[test]
    fn value_text_applies_scale_and_precision() {
        let display = DisplayFormat::new(1, 2.0);
        assert_eq!(display.format(Reading::Value(12.345)), "24.7");
        assert_eq!(display.format(Reading::NoData), "-");
        assert_eq!(DisplayFormat::new(0, 1.0).format(Reading::Value(0.0)), "0");
        assert_eq!(DisplayFormat::new(3, 0.001).format(Reading::Value(1500.0)), "1.500");
    }

    #[test]
    fn ring_is_resolved_then_stacked() {
        let config = GaugeConfig::from_json(&serde_json::json!({
            "outer": [{ "entity": "sensor.a" }, { "entity": "sensor.b", "attribute": "load" }],
            "inner": [{ "entity": "sensor.c" }],
        }))
        .unwrap();
        let snapshot = DataSnapshot::new()
            .with_source("sensor.a", crate::SourceState::new(25))
            .with_source("sensor.b", crate::SourceState::new(0).with_attribute("load", 25));

        let outer = stack_ring(&config.outer, &snapshot, &config).unwrap();
        let angles: Vec<Degrees> = outer.iter().map(|s| s.angle).collect();
        assert_eq!(angles, vec![Degrees(225.0), Degrees(270.0)]);

        let err = stack_ring(&config.inner, &snapshot, &config).unwrap_err();
        assert_eq!(err.sources, vec!["sensor.c".to_string()]);
    }
}
