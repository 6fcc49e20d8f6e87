use std::sync::Arc;

use crate::{
    config::PipelineOpts,
    render::{
        backend::{BackendKind, OutlineRenderer},
        canvas::OutlineCanvas,
        direct::DirectRenderer,
        offload::{OffloadedRenderer, SpawnFailure},
        surface::OverlaySurface,
    },
    schedule::clock::FrameRequester,
};

/// What the host environment can do for the overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Surfaces can be handed to a background drawing thread.
    pub offscreen_surfaces: bool,
}

impl HostCapabilities {
    pub fn detect() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            offscreen_surfaces: threads > 1,
        }
    }
}

/// Pick the backend for this host: offloaded only when the host supports it and the caller
/// asked for it. Any failure to set up the worker falls back to drawing on the calling thread.
pub fn create_renderer(
    caps: HostCapabilities,
    opts: &PipelineOpts,
    surface: OverlaySurface,
    requester: Arc<dyn FrameRequester>,
) -> Box<dyn OutlineRenderer> {
    let kind = match (opts.offload, caps.offscreen_surfaces) {
        (true, true) => BackendKind::Offloaded,
        (true, false) => {
            tracing::warn!("offscreen surfaces unavailable; drawing on the calling thread");
            BackendKind::Direct
        }
        (false, _) => BackendKind::Direct,
    };

    if kind == BackendKind::Direct {
        return direct(surface, opts, requester);
    }
    match OffloadedRenderer::spawn(surface, opts.animation, opts.style, requester.clone()) {
        Ok(offloaded) => {
            tracing::debug!("outline renderer: offloaded");
            Box::new(offloaded)
        }
        Err(SpawnFailure { error, surface }) => {
            tracing::warn!(error = %error, "drawing thread unavailable; falling back");
            direct(surface, opts, requester)
        }
    }
}

fn direct(
    surface: OverlaySurface,
    opts: &PipelineOpts,
    requester: Arc<dyn FrameRequester>,
) -> Box<dyn OutlineRenderer> {
    tracing::debug!("outline renderer: direct");
    let canvas = OutlineCanvas::new(surface, opts.animation, opts.style);
    Box::new(DirectRenderer::new(canvas, requester))
}
