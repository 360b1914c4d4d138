// ============================================================================
// CRATE CONFIGURATION & IMPORTS
// ============================================================================

//! Stacked dual gauge: two concentric half-circle rings made of stacked,
//! colored segments, each driven by a live data source, with value labels
//! placed around the dial.
//!
//! The host hands a raw configuration to [`StackedDualGauge::configure`] and a
//! [`DataSnapshot`] to [`StackedDualGauge::update`] on every tick. Drawing goes
//! through an injected [`RenderSurface`].

pub mod config;
pub mod error;
pub mod layout;
pub mod markup;
pub mod raster;
pub mod snapshot;
pub mod stacking;
pub mod surface;

use log::{debug, error, info};
use serde_json::Value;

pub use config::{normalize, GaugeConfig, RawGaugeConfig, Segment, SegmentSpec};
pub use error::{ConfigError, GaugeError, UnresolvedSourceError};
pub use layout::{build_view, DiagnosticView, GaugeView, Ring, View, ViewMode};
pub use markup::MarkupSurface;
pub use raster::{Color, RasterSurface};
pub use snapshot::{DataSnapshot, Reading, SourceState};
pub use stacking::{Degrees, DisplayFormat, Scale, StackedSegment};
pub use surface::{RecordingSurface, RenderSurface, SurfaceCall};

// ============================================================================
// PUBLIC API - MAIN INTERFACE
// ============================================================================

/// Lifecycle hooks a dashboard host drives a card through.
pub trait DashboardCard {
    fn configure(&mut self, raw: &Value) -> Result<(), ConfigError>;

    fn update(&mut self, snapshot: &DataSnapshot) -> Result<UpdateOutcome, GaugeError>;

    fn mount(&mut self);

    fn unmount(&mut self);

    fn on_show_details(&mut self, callback: Box<dyn FnMut(&str)>);
}

/// What an update did to the card.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Gauge shown with fresh values. `rebuilt` is set when the structure had
    /// to be built first (first data, new configuration, or leaving diagnostics).
    Rendered { rebuilt: bool },
    /// Some sources were missing; the diagnostic view is shown instead.
    Diagnostic(UnresolvedSourceError),
}

/// The card itself: owns its configuration, the built structure, and the surface.
pub struct StackedDualGauge<S: RenderSurface> {
    surface: S,
    config: Option<GaugeConfig>,
    state: Option<RenderState>,
    mounted: bool,
    show_details: Option<Box<dyn FnMut(&str)>>,
}

#[derive(Debug, Clone)]
struct RenderState {
    view: View,
}

impl<S: RenderSurface> StackedDualGauge<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            config: None,
            state: None,
            mounted: false,
            show_details: None,
        }
    }

    /// Normalizes and installs a configuration. On error the previous
    /// configuration stays in place. The structure is rebuilt on the next update.
    pub fn configure(&mut self, raw: &Value) -> Result<(), ConfigError> {
        let config = GaugeConfig::from_json(raw)?;
        self.install(config);
        Ok(())
    }

    pub fn configure_raw(&mut self, raw: &RawGaugeConfig) -> Result<(), ConfigError> {
        let config = raw.normalize()?;
        self.install(config);
        Ok(())
    }

    fn install(&mut self, config: GaugeConfig) {
        info!(
            "Configured gauge with {} outer and {} inner segments",
            config.outer.len(),
            config.inner.len()
        );
        self.config = Some(config);
        self.state = None;
    }

    pub fn config(&self) -> Option<&GaugeConfig> {
        self.config.as_ref()
    }

    pub fn view(&self) -> Option<&View> {
        self.state.as_ref().map(|state| &state.view)
    }

    pub fn mode(&self) -> Option<ViewMode> {
        self.view().map(View::mode)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn on_show_details(&mut self, callback: impl FnMut(&str) + 'static) {
        self.show_details = Some(Box::new(callback));
    }

    /// Attaches the card to its surface, replaying whatever is already built.
    pub fn mount(&mut self) {
        self.mounted = true;
        match self.state.as_ref().map(|state| &state.view) {
            Some(View::Gauge(view)) => self.surface.build_gauge(view),
            Some(View::Diagnostic(view)) => self.surface.build_diagnostic(view),
            None => {}
        }
    }

    /// Detaches from the surface and drops the built structure.
    pub fn unmount(&mut self) {
        if self.mounted {
            self.surface.teardown();
        }
        self.mounted = false;
        self.state = None;
    }

    // ========================================================================
    // UPDATE PATH
    // ========================================================================

    /// Applies one snapshot.
    ///
    /// Every configured source must be present. If any is missing the card
    /// switches to its diagnostic view listing all of them. Otherwise the gauge
    /// is (re)built if needed and each segment's angle and value text are pushed
    /// to the surface.
    pub fn update(&mut self, snapshot: &DataSnapshot) -> Result<UpdateOutcome, GaugeError> {
        let Self {
            surface,
            config,
            state,
            mounted,
            ..
        } = self;
        let config = config.as_ref().ok_or(GaugeError::NotConfigured)?;

        let mut rings = Vec::with_capacity(Ring::ALL.len());
        let mut missing = Vec::new();
        for ring in Ring::ALL {
            match stacking::stack_ring(config.segments(ring), snapshot, config) {
                Ok(stacked) => rings.push((ring, stacked)),
                Err(err) => missing.extend(err.sources),
            }
        }

        if !missing.is_empty() {
            let err = UnresolvedSourceError::new(missing);
            for source in &err.sources {
                error!("Undefined entity {source}");
            }
            let view = DiagnosticView::new(config, err.sources.clone());
            let unchanged = matches!(
                state,
                Some(RenderState { view: View::Diagnostic(current) }) if *current == view
            );
            if !unchanged {
                if *mounted {
                    surface.build_diagnostic(&view);
                }
                *state = Some(RenderState {
                    view: View::Diagnostic(view),
                });
            }
            return Ok(UpdateOutcome::Diagnostic(err));
        }

        let (mut view, rebuilt) = match state.take() {
            Some(RenderState {
                view: View::Gauge(view),
            }) => (view, false),
            _ => {
                debug!("Building gauge structure");
                let view = layout::build_view(config);
                if *mounted {
                    surface.build_gauge(&view);
                }
                (view, true)
            }
        };

        for (ring, stacked_ring) in rings {
            for (index, stacked) in stacked_ring.into_iter().enumerate() {
                if let Some(node) = view.segment_mut(ring, index) {
                    node.angle = stacked.angle;
                    if *mounted {
                        surface.set_rotation(&node.variable, stacked.angle);
                    }
                }
                if let Some(label) = view.label_mut(ring, index) {
                    if *mounted {
                        surface.set_value_text(&label.value_class, &stacked.text);
                    }
                    label.value = stacked.text;
                }
            }
        }

        *state = Some(RenderState {
            view: View::Gauge(view),
        });
        Ok(UpdateOutcome::Rendered { rebuilt })
    }

    /// Handles activation of a label slot (or anything inside it) by class
    /// name. Emits "show details" for the slot's source and returns its id.
    pub fn activate(&mut self, target: &str) -> Option<String> {
        let Some(View::Gauge(view)) = self.state.as_ref().map(|state| &state.view) else {
            return None;
        };
        let source_id = view.label_for_target(target)?.source_id.clone();
        info!("Show more info for entity {source_id}");
        if let Some(callback) = self.show_details.as_mut() {
            callback(&source_id);
        }
        Some(source_id)
    }
}

impl<S: RenderSurface> DashboardCard for StackedDualGauge<S> {
    fn configure(&mut self, raw: &Value) -> Result<(), ConfigError> {
        StackedDualGauge::configure(self, raw)
    }

    fn update(&mut self, snapshot: &DataSnapshot) -> Result<UpdateOutcome, GaugeError> {
        StackedDualGauge::update(self, snapshot)
    }

    fn mount(&mut self) {
        StackedDualGauge::mount(self)
    }

    fn unmount(&mut self) {
        StackedDualGauge::unmount(self)
    }

    fn on_show_details(&mut self, callback: Box<dyn FnMut(&str)>) {
        self.show_details = Some(callback);
    }
}
