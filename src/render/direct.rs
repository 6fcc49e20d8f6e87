use std::sync::Arc;

use crate::{
    foundation::core::SurfaceSize,
    outline::model::FinalizedOutline,
    render::{
        backend::{BackendKind, OutlineRenderer},
        canvas::OutlineCanvas,
    },
    schedule::clock::FrameRequester,
};

/// Renderer that animates and draws on the calling thread.
///
/// Draws are gated by the host frame primitive: at most one frame request is outstanding, and
/// each `on_frame` runs a single draw step.
pub struct DirectRenderer {
    canvas: Option<OutlineCanvas>,
    requester: Arc<dyn FrameRequester>,
    frame_pending: bool,
    pending_resize: Option<(SurfaceSize, f64)>,
}

impl DirectRenderer {
    pub fn new(canvas: OutlineCanvas, requester: Arc<dyn FrameRequester>) -> Self {
        Self {
            canvas: Some(canvas),
            requester,
            frame_pending: false,
            pending_resize: None,
        }
    }

    pub fn canvas(&self) -> Option<&OutlineCanvas> {
        self.canvas.as_ref()
    }

    pub fn is_frame_pending(&self) -> bool {
        self.frame_pending
    }

    fn schedule(&mut self) {
        if !self.frame_pending {
            self.frame_pending = true;
            self.requester.request_frame();
        }
    }
}

impl OutlineRenderer for DirectRenderer {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct
    }

    fn render_outlines(&mut self, outlines: &[FinalizedOutline]) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        if outlines.is_empty() {
            return;
        }
        canvas.merge(outlines);
        self.schedule();
    }

    fn resize(&mut self, size: SurfaceSize, dpr: f64) {
        if self.canvas.is_none() {
            return;
        }
        self.pending_resize = Some((size, dpr));
        self.schedule();
    }

    fn scroll(&mut self, delta_x: f64, delta_y: f64) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        canvas.scroll(delta_x, delta_y);
        if canvas.is_animating() {
            self.schedule();
        }
    }

    fn on_frame(&mut self) -> bool {
        self.frame_pending = false;
        let Some(canvas) = self.canvas.as_mut() else {
            return false;
        };

        if let Some((size, dpr)) = self.pending_resize.take()
            && let Err(e) = canvas.resize(size, dpr)
        {
            tracing::warn!(error = %e, "overlay resize ignored");
        }

        let again = canvas.draw_step();
        if again {
            self.schedule();
        }
        again
    }

    fn dispose(&mut self) {
        if self.canvas.take().is_some() {
            tracing::debug!("direct renderer disposed");
        }
        self.pending_resize = None;
    }

    fn is_disposed(&self) -> bool {
        self.canvas.is_none()
    }
}
