//! Static structure of the card: ring segments, label slots and the title,
//! plus the diagnostic block that replaces them when sources go missing.
//!
//! Everything here is computed once per configuration. Updates only touch the
//! segment angles and the value texts.

use std::fmt;

use crate::config::GaugeConfig;
use crate::stacking::Degrees;

/// Angular span shared by all labels. Kept below 180° so the first and last
/// labels don't sit on the horizon.
pub const LABEL_SPAN: f64 = 170.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ring {
    Outer,
    Inner,
}

impl Ring {
    /// Both rings in construction order.
    pub const ALL: [Ring; 2] = [Ring::Outer, Ring::Inner];

    pub fn name(self) -> &'static str {
        match self {
            Ring::Outer => "outer",
            Ring::Inner => "inner",
        }
    }

    pub fn gauge_class(self, index: usize) -> String {
        format!("{}-gauge-{index}", self.name())
    }

    pub fn value_class(self, index: usize) -> String {
        format!("{}-value-{index}", self.name())
    }

    pub fn label_class(self, index: usize) -> String {
        format!("{}-label-{index}", self.name())
    }

    pub fn label_container_class(self, index: usize) -> String {
        format!("{}-label-container-{index}", self.name())
    }

    /// Name of the rotation variable consumed by the segment's transform.
    pub fn angle_variable(self, index: usize) -> String {
        format!("{}-angle-{index}", self.name())
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// GAUGE VIEW
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentNode {
    pub ring: Ring,
    pub index: usize,
    pub class: String,
    pub variable: String,
    pub color: String,
    pub angle: Degrees,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelNode {
    pub ring: Ring,
    pub index: usize,
    pub container_class: String,
    pub value_class: String,
    pub label_class: String,
    /// Source whose details are requested when the slot is activated.
    pub source_id: String,
    pub label: String,
    pub value: String,
    pub color: String,
    /// Fixed slot position, measured from the left end of the dial.
    pub position: Degrees,
}

/// Cosmetic settings the surfaces need to size the card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardStyle {
    pub width: f64,
    pub background_color: String,
    pub title_font_size: String,
    pub value_font_size: String,
    pub label_font_size: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeView {
    pub header: Option<String>,
    pub title: String,
    pub style: CardStyle,
    /// Ring segments in paint order; later entries paint over earlier ones.
    pub segments: Vec<SegmentNode>,
    /// Label slots in paint order, all above the rings.
    pub labels: Vec<LabelNode>,
}

impl GaugeView {
    pub fn segment(&self, ring: Ring, index: usize) -> Option<&SegmentNode> {
        self.segments
            .iter()
            .find(|node| node.ring == ring && node.index == index)
    }

    pub fn segment_mut(&mut self, ring: Ring, index: usize) -> Option<&mut SegmentNode> {
        self.segments
            .iter_mut()
            .find(|node| node.ring == ring && node.index == index)
    }

    pub fn segment_by_variable_mut(&mut self, variable: &str) -> Option<&mut SegmentNode> {
        self.segments.iter_mut().find(|node| node.variable == variable)
    }

    pub fn label(&self, ring: Ring, index: usize) -> Option<&LabelNode> {
        self.labels
            .iter()
            .find(|node| node.ring == ring && node.index == index)
    }

    pub fn label_mut(&mut self, ring: Ring, index: usize) -> Option<&mut LabelNode> {
        self.labels
            .iter_mut()
            .find(|node| node.ring == ring && node.index == index)
    }

    pub fn label_by_value_class_mut(&mut self, class: &str) -> Option<&mut LabelNode> {
        self.labels.iter_mut().find(|node| node.value_class == class)
    }

    /// Finds the label slot that contains an element with the given class.
    pub fn label_for_target(&self, class: &str) -> Option<&LabelNode> {
        self.labels.iter().find(|node| {
            node.container_class == class || node.value_class == class || node.label_class == class
        })
    }
}

/// Evenly spaced label positions for `count` slots across [`LABEL_SPAN`],
/// centred on the top of the dial.
pub fn label_positions(count: usize) -> Vec<Degrees> {
    if count == 0 {
        return Vec::new();
    }
    let increment = LABEL_SPAN / count as f64;
    let first = (180.0 - LABEL_SPAN + increment) / 2.0;
    (0..count)
        .map(|i| Degrees(first + increment * i as f64))
        .collect()
}

/// Builds the gauge structure for `config`.
///
/// Segments and labels are emitted from the last index to the first, outer ring
/// before inner. With paint order following construction order the inner ring
/// covers the outer one, and each segment covers the longer arcs stacked after it.
pub fn build_view(config: &GaugeConfig) -> GaugeView {
    let positions = label_positions(config.outer.len() + config.inner.len());

    let mut segments = Vec::with_capacity(config.outer.len() + config.inner.len());
    let mut labels = Vec::with_capacity(positions.len());

    for ring in Ring::ALL {
        for (index, segment) in config.segments(ring).iter().enumerate().rev() {
            segments.push(SegmentNode {
                ring,
                index,
                class: ring.gauge_class(index),
                variable: ring.angle_variable(index),
                color: segment.color.clone(),
                angle: Degrees::CLOSED,
            });
        }
    }

    for ring in Ring::ALL {
        let offset = match ring {
            Ring::Outer => 0,
            Ring::Inner => config.outer.len(),
        };
        for (index, segment) in config.segments(ring).iter().enumerate().rev() {
            labels.push(LabelNode {
                ring,
                index,
                container_class: ring.label_container_class(index),
                value_class: ring.value_class(index),
                label_class: ring.label_class(index),
                source_id: segment.entity.clone(),
                label: segment.label.clone(),
                value: String::new(),
                color: segment.color.clone(),
                position: positions[offset + index],
            });
        }
    }

    GaugeView {
        header: config.header.clone(),
        title: config.title.clone(),
        style: CardStyle {
            width: config.cardwidth,
            background_color: config.background_color.clone(),
            title_font_size: config.title_font_size.clone(),
            value_font_size: config.value_font_size.clone(),
            label_font_size: config.label_font_size.clone(),
        },
        segments,
        labels,
    }
}

// ============================================================================
// DIAGNOSTIC VIEW
// ============================================================================

pub const DIAGNOSTIC_HEADLINE: &str = "Error finding these entities:";

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticView {
    pub header: Option<String>,
    pub title: Option<String>,
    pub sources: Vec<String>,
}

impl DiagnosticView {
    pub fn new(config: &GaugeConfig, sources: Vec<String>) -> Self {
        Self {
            header: config.header.clone(),
            title: Some(config.title.clone()).filter(|title| !title.is_empty()),
            sources,
        }
    }

    /// Text lines of the block: the title if any, the headline, then one
    /// `- <source>` line per missing source.
    pub fn lines(&self) -> Vec<String> {
        self.title
            .iter()
            .cloned()
            .chain(std::iter::once(DIAGNOSTIC_HEADLINE.to_string()))
            .chain(self.sources.iter().map(|source| format!("- {source}")))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Gauge,
    Diagnostic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Gauge(GaugeView),
    Diagnostic(DiagnosticView),
}

impl View {
    pub fn mode(&self) -> ViewMode {
        match self {
            View::Gauge(_) => ViewMode::Gauge,
            View::Diagnostic(_) => ViewMode::Diagnostic,
        }
    }
}
