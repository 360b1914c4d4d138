use crate::layout::{DiagnosticView, GaugeView};
use crate::stacking::Degrees;

/// Whatever actually shows the card: a DOM, a markup string, a pixel buffer.
///
/// `build_*` replaces the whole structure and must honour the current angles
/// and value texts carried by the view. The two setters are the only calls made
/// on a regular update.
pub trait RenderSurface {
    fn build_gauge(&mut self, view: &GaugeView);

    fn build_diagnostic(&mut self, view: &DiagnosticView);

    /// Sets a rotation variable such as `outer-angle-0`.
    fn set_rotation(&mut self, variable: &str, angle: Degrees);

    /// Replaces the text of a value slot such as `inner-value-1`.
    fn set_value_text(&mut self, slot: &str, text: &str);

    fn teardown(&mut self);
}

impl<S: RenderSurface + ?Sized> RenderSurface for Box<S> {
    fn build_gauge(&mut self, view: &GaugeView) {
        (**self).build_gauge(view)
    }

    fn build_diagnostic(&mut self, view: &DiagnosticView) {
        (**self).build_diagnostic(view)
    }

    fn set_rotation(&mut self, variable: &str, angle: Degrees) {
        (**self).set_rotation(variable, angle)
    }

    fn set_value_text(&mut self, slot: &str, text: &str) {
        (**self).set_value_text(slot, text)
    }

    fn teardown(&mut self) {
        (**self).teardown()
    }
}

/// One call received by a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    BuildGauge,
    BuildDiagnostic(Vec<String>),
    SetRotation(String, Degrees),
    SetValueText(String, String),
    Teardown,
}

/// Headless surface that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    calls: Vec<SurfaceCall>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn gauge_builds(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, SurfaceCall::BuildGauge))
            .count()
    }

    /// Latest angle pushed for `variable`.
    pub fn rotation(&self, variable: &str) -> Option<Degrees> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::SetRotation(name, angle) if name == variable => Some(*angle),
            _ => None,
        })
    }

    /// Latest text pushed into `slot`.
    pub fn value_text(&self, slot: &str) -> Option<&str> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::SetValueText(name, text) if name == slot => Some(text.as_str()),
            _ => None,
        })
    }
}

impl RenderSurface for RecordingSurface {
    fn build_gauge(&mut self, _view: &GaugeView) {
        self.calls.push(SurfaceCall::BuildGauge);
    }

    fn build_diagnostic(&mut self, view: &DiagnosticView) {
        self.calls.push(SurfaceCall::BuildDiagnostic(view.sources.clone()));
    }

    fn set_rotation(&mut self, variable: &str, angle: Degrees) {
        self.calls
            .push(SurfaceCall::SetRotation(variable.to_string(), angle));
    }

    fn set_value_text(&mut self, slot: &str, text: &str) {
        self.calls
            .push(SurfaceCall::SetValueText(slot.to_string(), text.to_string()));
    }

    fn teardown(&mut self) {
        self.calls.push(SurfaceCall::Teardown);
    }
}
