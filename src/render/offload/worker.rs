use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::{
    config::{AnimationOpts, OutlineStyle},
    foundation::core::SurfaceSize,
    render::{
        canvas::OutlineCanvas,
        offload::protocol::{WorkerMessage, unpack_outlines},
    },
};

/// State owned by the drawing thread.
pub(crate) struct Worker {
    rx: Receiver<WorkerMessage>,
    terminated: Arc<AtomicBool>,
    anim: AnimationOpts,
    style: OutlineStyle,
    frame_interval: Duration,
    canvas: Option<OutlineCanvas>,
    next_frame: Option<Instant>,
}

impl Worker {
    pub(crate) fn new(
        rx: Receiver<WorkerMessage>,
        terminated: Arc<AtomicBool>,
        anim: AnimationOpts,
        style: OutlineStyle,
    ) -> Self {
        Self {
            rx,
            terminated,
            frame_interval: Duration::from_millis(anim.worker_frame_ms.max(1)),
            anim,
            style,
            canvas: None,
            next_frame: None,
        }
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    #[tracing::instrument(name = "outline_worker", skip(self))]
    pub(crate) fn run(mut self) {
        tracing::debug!("outline worker started");
        loop {
            let received = match self.next_frame {
                Some(deadline) => match self.rx.recv_deadline(deadline) {
                    Ok(msg) => Some(msg),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match self.rx.recv() {
                    Ok(msg) => Some(msg),
                    Err(_) => break,
                },
            };
            if self.is_terminated() {
                break;
            }

            if let Some(msg) = received {
                self.handle(msg);
            }

            if let Some(deadline) = self.next_frame
                && Instant::now() >= deadline
            {
                self.frame(deadline);
            }
        }
        tracing::debug!("outline worker stopped");
    }

    fn schedule(&mut self) {
        if self.next_frame.is_none() {
            self.next_frame = Some(Instant::now());
        }
    }

    fn handle(&mut self, msg: WorkerMessage) {
        tracing::trace!(message = msg.name(), "worker message");
        match msg {
            WorkerMessage::Init {
                surface,
                width,
                height,
                dpr,
            } => {
                let mut canvas = OutlineCanvas::new(surface, self.anim, self.style);
                if let Err(e) = canvas.resize(SurfaceSize::new(width, height), dpr) {
                    tracing::warn!(error = %e, "worker init size rejected");
                }
                self.canvas = Some(canvas);
            }
            WorkerMessage::DrawOutlines { buffer, names } => {
                let Some(canvas) = self.canvas.as_mut() else {
                    tracing::warn!("draw-outlines before init dropped");
                    return;
                };
                match unpack_outlines(&buffer, names) {
                    Ok(outlines) if !outlines.is_empty() => {
                        canvas.merge(&outlines);
                        self.schedule();
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "malformed draw-outlines dropped"),
                }
            }
            WorkerMessage::Resize { width, height, dpr } => {
                let Some(canvas) = self.canvas.as_mut() else {
                    return;
                };
                if let Err(e) = canvas.resize(SurfaceSize::new(width, height), dpr) {
                    tracing::warn!(error = %e, "worker resize rejected");
                }
                self.schedule();
            }
            WorkerMessage::Scroll { delta_x, delta_y } => {
                let Some(canvas) = self.canvas.as_mut() else {
                    return;
                };
                canvas.scroll(delta_x, delta_y);
                if canvas.is_animating() {
                    self.schedule();
                }
            }
        }
    }

    fn frame(&mut self, deadline: Instant) {
        if self.is_terminated() {
            self.next_frame = None;
            return;
        }
        let Some(canvas) = self.canvas.as_mut() else {
            self.next_frame = None;
            return;
        };
        if canvas.draw_step() {
            let next = deadline + self.frame_interval;
            let now = Instant::now();
            self.next_frame = Some(if next < now { now } else { next });
        } else {
            self.next_frame = None;
        }
    }
}
