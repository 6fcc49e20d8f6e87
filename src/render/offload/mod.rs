pub mod protocol;
pub(crate) mod worker;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
};

use crossbeam_channel::{SendError, Sender};

use crate::{
    config::{AnimationOpts, OutlineStyle},
    foundation::{
        core::SurfaceSize,
        error::{ScopeError, ScopeResult},
    },
    outline::model::FinalizedOutline,
    render::{
        backend::{BackendKind, OutlineRenderer},
        offload::{protocol::WorkerMessage, worker::Worker},
        surface::OverlaySurface,
    },
    schedule::clock::FrameRequester,
};

/// Renderer that hands the surface to a background drawing thread and drives it by message.
///
/// The main thread keeps no drawing capability once [`OffloadedRenderer::spawn`] has moved the
/// surface. Resizes are coalesced to one `resize` message per host frame.
pub struct OffloadedRenderer {
    tx: Option<Sender<WorkerMessage>>,
    worker: Option<JoinHandle<()>>,
    terminated: Arc<AtomicBool>,
    requester: Arc<dyn FrameRequester>,
    frame_pending: bool,
    pending_resize: Option<(SurfaceSize, f64)>,
}

/// A drawing thread that could not be started, with the surface it was meant to own.
#[derive(Debug)]
pub struct SpawnFailure {
    pub error: ScopeError,
    pub surface: OverlaySurface,
}

impl OffloadedRenderer {
    /// Start the drawing thread and move `surface` onto it with its initial size and pixel ratio.
    ///
    /// On failure the surface comes back inside [`SpawnFailure`] so the caller can draw with it.
    pub fn spawn(
        surface: OverlaySurface,
        anim: AnimationOpts,
        style: OutlineStyle,
        requester: Arc<dyn FrameRequester>,
    ) -> Result<Self, SpawnFailure> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let terminated = Arc::new(AtomicBool::new(false));
        let worker = Worker::new(rx, terminated.clone(), anim, style);
        let handle = match std::thread::Builder::new()
            .name("renderscope-outlines".to_string())
            .spawn(move || worker.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                return Err(SpawnFailure {
                    error: ScopeError::backend(format!("failed to spawn drawing thread: {e}")),
                    surface,
                });
            }
        };

        if let Err(surface) = send_init(&tx, surface) {
            if handle.join().is_err() {
                tracing::warn!("drawing thread panicked");
            }
            return Err(SpawnFailure {
                error: ScopeError::backend("drawing thread stopped before init"),
                surface,
            });
        }

        Ok(Self {
            tx: Some(tx),
            worker: Some(handle),
            terminated,
            requester,
            frame_pending: false,
            pending_resize: None,
        })
    }

    fn send(&mut self, msg: WorkerMessage) -> ScopeResult<()> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(ScopeError::backend("renderer disposed"));
        };
        let name = msg.name();
        if tx.send(msg).is_err() {
            tracing::warn!(message = name, "drawing thread gone; message dropped");
            self.tx = None;
            return Err(ScopeError::backend("drawing thread stopped"));
        }
        Ok(())
    }

    fn forward(&mut self, msg: WorkerMessage) {
        // Failures are already logged in `send`; nothing reaches the caller.
        let _ = self.send(msg);
    }

    fn schedule(&mut self) {
        if !self.frame_pending {
            self.frame_pending = true;
            self.requester.request_frame();
        }
    }
}

impl OutlineRenderer for OffloadedRenderer {
    fn kind(&self) -> BackendKind {
        BackendKind::Offloaded
    }

    fn render_outlines(&mut self, outlines: &[FinalizedOutline]) {
        if self.tx.is_none() || outlines.is_empty() {
            return;
        }
        match WorkerMessage::draw(outlines) {
            Ok(msg) => self.forward(msg),
            Err(e) => tracing::warn!(error = %e, outlines = outlines.len(), "outline batch dropped"),
        }
    }

    fn resize(&mut self, size: SurfaceSize, dpr: f64) {
        if self.tx.is_none() {
            return;
        }
        self.pending_resize = Some((size, dpr));
        self.schedule();
    }

    fn scroll(&mut self, delta_x: f64, delta_y: f64) {
        if self.tx.is_none() {
            return;
        }
        self.forward(WorkerMessage::Scroll { delta_x, delta_y });
    }

    fn on_frame(&mut self) -> bool {
        self.frame_pending = false;
        if let Some((size, dpr)) = self.pending_resize.take()
            && self.tx.is_some()
        {
            self.forward(WorkerMessage::resize(size, dpr));
        }
        false
    }

    fn dispose(&mut self) {
        self.terminated.store(true, Ordering::Release);
        self.tx = None;
        self.pending_resize = None;
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::warn!("drawing thread panicked");
            }
            tracing::debug!("offloaded renderer disposed");
        }
    }

    fn is_disposed(&self) -> bool {
        self.worker.is_none()
    }
}

/// Hands the surface back when the drawing thread is already gone.
fn send_init(tx: &Sender<WorkerMessage>, surface: OverlaySurface) -> Result<(), OverlaySurface> {
    if let Err(SendError(WorkerMessage::Init { surface, .. })) =
        tx.send(WorkerMessage::init(surface))
    {
        tracing::warn!("drawing thread gone before init");
        return Err(surface);
    }
    Ok(())
}

impl Drop for OffloadedRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}
