//! Scripted render-event traces.
//!
//! A trace describes a static element layout plus a sequence of cycles. Each cycle may resize the
//! viewport, scroll the content and record render events before one flush runs. The replay drives
//! the full pipeline (aggregator, visibility resolution, chosen backend) and returns the last
//! presented overlay frame.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    config::PipelineOpts,
    foundation::{
        core::{ElementId, InstanceKey, Node, Rect, SurfaceSize},
        error::{ScopeError, ScopeResult},
    },
    outline::aggregator::FlushReport,
    render::{
        backend::BackendKind,
        select::{HostCapabilities, create_renderer},
        surface::{FrameRGBA, OverlaySurface, SharedFrame},
    },
    schedule::{clock::FrameSignal, pipeline::OutlinePipeline},
    visibility::layout::LayoutVisibility,
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReplayTrace {
    pub viewport: SurfaceSize,
    #[serde(default = "default_dpr")]
    pub dpr: f64,
    #[serde(default)]
    pub layout: Vec<Placement>,
    #[serde(default)]
    pub cycles: Vec<ReplayCycle>,
}

fn default_dpr() -> f64 {
    1.0
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    pub element: u64,
    pub rect: Rect,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReplayCycle {
    pub records: Vec<ReplayRecord>,
    /// Content scroll applied before recording, as `[dx, dy]`.
    pub scroll: Option<(f64, f64)>,
    pub resize: Option<ReplayResize>,
    /// Host frames delivered after the flush.
    pub frames: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReplayRecord {
    pub instance: u64,
    pub name: String,
    #[serde(default)]
    pub elements: Vec<u64>,
    /// Non-element nodes attached to the instance (text, comments). Skipped at flush.
    #[serde(default)]
    pub text_nodes: Vec<u64>,
    #[serde(default = "default_commit")]
    pub did_commit: bool,
}

fn default_commit() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReplayResize {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_dpr")]
    pub dpr: f64,
}

impl ReplayTrace {
    pub fn from_json_str(s: &str) -> ScopeResult<Self> {
        let trace: Self = serde_json::from_str(s)
            .map_err(|e| ScopeError::validation(format!("invalid replay trace: {e}")))?;
        trace.validate()?;
        Ok(trace)
    }

    pub fn validate(&self) -> ScopeResult<()> {
        self.viewport.physical(self.dpr)?;
        for p in &self.layout {
            let r = p.rect;
            if ![r.x, r.y, r.width, r.height].iter().all(|v| v.is_finite()) {
                return Err(ScopeError::validation(format!(
                    "element {} has a non-finite rect",
                    p.element
                )));
            }
        }
        for (i, c) in self.cycles.iter().enumerate() {
            if let Some(r) = c.resize {
                SurfaceSize::new(r.width, r.height)
                    .physical(r.dpr)
                    .map_err(|e| ScopeError::validation(format!("cycle {i}: {e}")))?;
            }
        }
        Ok(())
    }

    fn visibility(&self) -> LayoutVisibility {
        let mut source = LayoutVisibility::new(self.viewport.bounds());
        for p in &self.layout {
            source.place(ElementId(p.element), p.rect);
        }
        source
    }
}

/// Result of a replay run.
#[derive(Debug)]
pub struct ReplayOutcome {
    pub backend: BackendKind,
    pub reports: Vec<FlushReport>,
    /// Frames presented by the overlay surface.
    pub presents: u64,
    /// Last presented frame, if any frame was drawn.
    pub frame: Option<FrameRGBA>,
}

/// Run `trace` through a fresh pipeline.
///
/// `frames` overrides the per-cycle frame count (default 1). Offloaded replays wait one worker
/// frame period per requested frame instead of delivering host frames.
#[tracing::instrument(skip_all, fields(cycles = trace.cycles.len(), offload = opts.offload))]
pub fn run_replay(
    trace: &ReplayTrace,
    opts: &PipelineOpts,
    frames: Option<u32>,
) -> ScopeResult<ReplayOutcome> {
    trace.validate()?;
    opts.validate()?;

    let shared = SharedFrame::new();
    let signal = FrameSignal::new();
    let surface = OverlaySurface::new(trace.viewport, trace.dpr, Box::new(shared.clone()))?;
    let renderer = create_renderer(
        HostCapabilities::detect(),
        opts,
        surface,
        Arc::new(signal.clone()),
    );
    let backend = renderer.kind();
    let mut pipeline = OutlinePipeline::new(trace.visibility(), renderer, opts.clone());

    let step = opts
        .flush_interval()
        .max(opts.resize_debounce())
        .max(opts.scroll_interval());
    let mut now = Instant::now();
    let mut reports = Vec::with_capacity(trace.cycles.len());

    for cycle in &trace.cycles {
        if let Some(r) = cycle.resize {
            let size = SurfaceSize::new(r.width, r.height);
            pipeline.source_mut().set_viewport(size.bounds());
            pipeline.resize(size, r.dpr, now);
        }
        if let Some((dx, dy)) = cycle.scroll {
            pipeline.source_mut().scroll_content(dx, dy);
            pipeline.scroll(dx, dy);
        }
        for rec in &cycle.records {
            let nodes = rec
                .elements
                .iter()
                .map(|id| Node::element(*id))
                .chain(rec.text_nodes.iter().map(|id| Node::text(*id)))
                .collect();
            pipeline.record(
                InstanceKey(rec.instance),
                rec.name.clone(),
                nodes,
                rec.did_commit,
            );
        }

        now += step;
        reports.push(settle(&mut pipeline, now));

        let frames = frames.or(cycle.frames).unwrap_or(1);
        drive_frames(&mut pipeline, &signal, backend, opts, frames);
    }

    let frame = shared.latest();
    let presents = shared.present_count();
    pipeline.dispose();
    tracing::debug!(presents, "replay finished");

    Ok(ReplayOutcome {
        backend,
        reports,
        presents,
        frame,
    })
}

/// Tick until the cycle started at `now` completes. The layout source answers from its own thread
/// and reports every element, so the loop ends.
fn settle(pipeline: &mut OutlinePipeline<LayoutVisibility>, now: Instant) -> FlushReport {
    let mut report = pipeline.tick(now);
    while report.is_none() && pipeline.is_flushing() {
        std::thread::sleep(Duration::from_millis(1));
        report = pipeline.tick(now);
    }
    report.unwrap_or_default()
}

fn drive_frames(
    pipeline: &mut OutlinePipeline<LayoutVisibility>,
    signal: &FrameSignal,
    backend: BackendKind,
    opts: &PipelineOpts,
    frames: u32,
) {
    match backend {
        BackendKind::Direct => {
            for _ in 0..frames {
                if !signal.take() {
                    break;
                }
                pipeline.on_frame();
            }
        }
        BackendKind::Offloaded => {
            // Resizes still reach the worker through the host frame.
            if signal.take() {
                pipeline.on_frame();
            }
            let period = Duration::from_millis(opts.animation.worker_frame_ms);
            std::thread::sleep(period * frames);
        }
    }
}
