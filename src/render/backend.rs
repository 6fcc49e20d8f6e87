use crate::{foundation::core::SurfaceSize, outline::model::FinalizedOutline};

/// Which renderer implementation is drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BackendKind {
    /// Animates and draws on the thread that owns the renderer.
    Direct,
    /// Draws on a background thread that owns the surface.
    Offloaded,
}

/// Consumes finalized outlines and keeps them animating on a surface.
///
/// Calls after [`OutlineRenderer::dispose`] are no-ops.
pub trait OutlineRenderer {
    fn kind(&self) -> BackendKind;

    /// Merge outlines into the animation state and make sure a frame is scheduled.
    fn render_outlines(&mut self, outlines: &[FinalizedOutline]);

    /// Record a new logical size. Surface reallocation happens on the next frame tick.
    fn resize(&mut self, size: SurfaceSize, dpr: f64);

    /// Shift every active outline by the given delta.
    fn scroll(&mut self, delta_x: f64, delta_y: f64);

    /// Host frame opportunity. Returns `true` when another frame is wanted.
    fn on_frame(&mut self) -> bool;

    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}
