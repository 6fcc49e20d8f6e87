use std::time::Instant;

use crate::{
    config::PipelineOpts,
    foundation::core::{InstanceKey, Node, SurfaceSize},
    outline::aggregator::{Aggregator, FlushCycle, FlushReport},
    render::backend::OutlineRenderer,
    schedule::debounce::{Debounce, DeltaThrottle},
    visibility::source::VisibilitySource,
};

/// Scheduling glue between the instrumentation side and the renderer.
///
/// Owns the aggregator, the visibility source and the chosen renderer. `tick` is driven by the
/// host's timer and never waits on the source: it forwards the coalesced resize and scroll input,
/// renders whatever visibility batches are ready, and starts at most one flush per
/// `flush_interval`. A new flush starts only once the open cycle has completed.
pub struct OutlinePipeline<S: VisibilitySource> {
    aggregator: Aggregator,
    cycle: Option<FlushCycle>,
    source: S,
    renderer: Box<dyn OutlineRenderer>,
    opts: PipelineOpts,
    last_flush: Option<Instant>,
    resize: Debounce<(SurfaceSize, f64)>,
    scroll: DeltaThrottle,
    flushes: u64,
}

impl<S: VisibilitySource> OutlinePipeline<S> {
    pub fn new(source: S, renderer: Box<dyn OutlineRenderer>, opts: PipelineOpts) -> Self {
        Self {
            aggregator: Aggregator::new(),
            cycle: None,
            source,
            renderer,
            resize: Debounce::new(opts.resize_debounce()),
            scroll: DeltaThrottle::new(opts.scroll_interval()),
            opts,
            last_flush: None,
            flushes: 0,
        }
    }

    /// Entry point for the instrumentation source. Never fails.
    pub fn record(
        &mut self,
        key: InstanceKey,
        name: impl Into<String>,
        nodes: Vec<Node>,
        did_commit: bool,
    ) {
        if self.renderer.is_disposed() {
            return;
        }
        self.aggregator.record(key, name, nodes, did_commit);
    }

    /// Timer callback. Returns the report of a flush cycle that completed during this tick.
    pub fn tick(&mut self, now: Instant) -> Option<FlushReport> {
        if let Some((size, dpr)) = self.resize.poll(now) {
            self.renderer.resize(size, dpr);
        }
        if let Some((dx, dy)) = self.scroll.poll(now) {
            self.renderer.scroll(dx, dy);
        }
        if self.renderer.is_disposed() {
            return None;
        }

        if self.cycle.is_none() {
            let due = self.last_flush.is_none_or(|last| {
                now.saturating_duration_since(last) >= self.opts.flush_interval()
            });
            if !due || self.aggregator.is_empty() {
                return None;
            }
            self.last_flush = Some(now);
            self.flushes += 1;
            match self.aggregator.begin_flush(&mut self.source) {
                Ok(cycle) => self.cycle = cycle,
                Err(e) => {
                    tracing::warn!(error = %e, "outline flush failed; cycle dropped");
                    return None;
                }
            }
        }

        let cycle = self.cycle.as_mut()?;
        if !cycle.poll(self.renderer.as_mut()) {
            return None;
        }
        self.cycle.take().map(FlushCycle::finish)
    }

    /// Whether a flush cycle is waiting on visibility results.
    pub fn is_flushing(&self) -> bool {
        self.cycle.is_some()
    }

    /// Queue a resize; it reaches the renderer once the debounce window is quiet.
    pub fn resize(&mut self, size: SurfaceSize, dpr: f64, now: Instant) {
        self.resize.push((size, dpr), now);
    }

    /// Queue a scroll delta; net deltas are forwarded at most once per scroll interval.
    pub fn scroll(&mut self, delta_x: f64, delta_y: f64) {
        self.scroll.push(delta_x, delta_y);
    }

    /// Host frame opportunity, passed through to the renderer.
    pub fn on_frame(&mut self) -> bool {
        self.renderer.on_frame()
    }

    pub fn dispose(&mut self) {
        self.cycle = None;
        self.renderer.dispose();
    }

    pub fn renderer(&self) -> &dyn OutlineRenderer {
        self.renderer.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn opts(&self) -> &PipelineOpts {
        &self.opts
    }

    /// Flushes started so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    pub fn pending_records(&self) -> usize {
        self.aggregator.len()
    }
}
