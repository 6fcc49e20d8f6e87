use std::collections::{HashMap, HashSet};

use crate::{
    foundation::{
        core::{ElementId, InstanceKey, Node, Rect},
        error::ScopeResult,
    },
    outline::{
        merge::merge_rects,
        model::{FinalizedOutline, InstanceBlueprint},
    },
    render::{backend::OutlineRenderer, offload::protocol::MAX_WIRE_ID},
    visibility::{
        resolver::{BatchPoll, BatchedVisibility},
        source::{VisibilityEntry, VisibilitySource},
    },
};

/// Counters for one flush cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct FlushReport {
    /// Blueprints recorded when the cycle started.
    pub blueprints: usize,
    /// Distinct element nodes submitted for resolution.
    pub elements: usize,
    /// Resolver batches consumed.
    pub batches: usize,
    /// Outlines handed to the renderer, summed over every emission.
    pub outlines_emitted: usize,
    /// Blueprints cleared without ever acquiring a rect.
    pub dropped: usize,
}

/// Collects render events between flushes and turns them into outline batches.
///
/// Blueprints live for exactly one cycle: every flush ends by clearing them, resolved or not.
/// Outline ids are compact per-session numbers assigned on first record of an instance, so they
/// stay exact on the `f32` offload wire.
#[derive(Debug, Default)]
pub struct Aggregator {
    order: Vec<InstanceKey>,
    blueprints: HashMap<InstanceKey, InstanceBlueprint>,
    ids: HashMap<InstanceKey, u64>,
    next_id: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the blueprint for `key`. Repeats bump `count` and overwrite `did_commit`; the node
    /// list of the first record in the cycle is kept.
    pub fn record(
        &mut self,
        key: InstanceKey,
        name: impl Into<String>,
        nodes: Vec<Node>,
        did_commit: bool,
    ) {
        match self.blueprints.get_mut(&key) {
            Some(bp) => {
                bp.count = bp.count.saturating_add(1);
                bp.did_commit = did_commit;
            }
            None => {
                self.assign_id(key);
                self.order.push(key);
                self.blueprints.insert(
                    key,
                    InstanceBlueprint {
                        name: name.into(),
                        count: 1,
                        nodes,
                        did_commit,
                    },
                );
            }
        }
    }

    fn assign_id(&mut self, key: InstanceKey) -> u64 {
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        if self.next_id >= MAX_WIRE_ID {
            tracing::warn!(
                issued = self.next_id,
                "outline id space exhausted; restarting ids"
            );
            self.ids.clear();
            self.next_id = 0;
        }
        self.next_id += 1;
        self.ids.insert(key, self.next_id);
        self.next_id
    }

    pub fn blueprint(&self, key: InstanceKey) -> Option<&InstanceBlueprint> {
        self.blueprints.get(&key)
    }

    /// Outline id issued to `key`, if it was ever recorded.
    pub fn outline_id(&self, key: InstanceKey) -> Option<u64> {
        self.ids.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Start a flush cycle: move the current blueprints into it and subscribe to visibility for
    /// their element nodes. Returns `None` when nothing was recorded.
    ///
    /// Blueprints leave the aggregator here, so a failed subscription still clears them.
    pub fn begin_flush(
        &mut self,
        source: &mut dyn VisibilitySource,
    ) -> ScopeResult<Option<FlushCycle>> {
        if self.is_empty() {
            return Ok(None);
        }
        let keys = std::mem::take(&mut self.order);
        let blueprints = std::mem::take(&mut self.blueprints);
        let order: Vec<(InstanceKey, u64)> = keys
            .into_iter()
            .map(|k| {
                let id = self.assign_id(k);
                (k, id)
            })
            .collect();

        let mut owners: HashMap<ElementId, Vec<InstanceKey>> = HashMap::new();
        let mut elements = Vec::new();
        for (key, _) in &order {
            let Some(bp) = blueprints.get(key) else {
                continue;
            };
            for node in bp.nodes.iter().filter(|n| n.is_element()) {
                let keys = owners.entry(node.id).or_default();
                if keys.is_empty() {
                    elements.push(node.id);
                }
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
        }

        let report = FlushReport {
            blueprints: order.len(),
            elements: elements.len(),
            ..FlushReport::default()
        };
        let resolver = BatchedVisibility::observe(source, &elements)?;
        tracing::trace!(
            blueprints = report.blueprints,
            elements = report.elements,
            "flush started"
        );

        Ok(Some(FlushCycle {
            order,
            blueprints,
            owners,
            rects: HashMap::new(),
            resolved: HashSet::new(),
            resolver,
            report,
        }))
    }

    /// Run a whole flush on the calling thread.
    ///
    /// Blocks until the source has reported every element or disconnected. Frame-driven hosts
    /// use [`Aggregator::begin_flush`] with [`FlushCycle::poll`] instead.
    pub fn flush(
        &mut self,
        source: &mut dyn VisibilitySource,
        renderer: &mut dyn OutlineRenderer,
    ) -> ScopeResult<FlushReport> {
        let Some(mut cycle) = self.begin_flush(source)? else {
            return Ok(FlushReport::default());
        };
        cycle.run(renderer);
        Ok(cycle.finish())
    }
}

/// One open flush: the cycle's blueprints, the rects resolved so far and the live resolver.
///
/// Each resolver batch produces at most one `render_outlines` call carrying the blueprints it
/// touched, in first-record order, with their rects merged over everything resolved so far.
/// Dropping the cycle unsubscribes and discards its blueprints.
pub struct FlushCycle {
    order: Vec<(InstanceKey, u64)>,
    blueprints: HashMap<InstanceKey, InstanceBlueprint>,
    owners: HashMap<ElementId, Vec<InstanceKey>>,
    rects: HashMap<ElementId, Rect>,
    resolved: HashSet<InstanceKey>,
    resolver: BatchedVisibility,
    report: FlushReport,
}

impl FlushCycle {
    /// Whether resolution has ended (every element seen, or the source disconnected).
    pub fn is_done(&self) -> bool {
        self.resolver.is_done()
    }

    pub fn report(&self) -> &FlushReport {
        &self.report
    }

    /// Render whatever batches are ready without waiting. Returns `true` once resolution ended.
    pub fn poll(&mut self, renderer: &mut dyn OutlineRenderer) -> bool {
        loop {
            match self.resolver.try_next() {
                BatchPoll::Ready(batch) => self.apply(batch, renderer),
                BatchPoll::Pending => return false,
                BatchPoll::Done => return true,
            }
        }
    }

    /// Render every batch, waiting on the source between them.
    pub fn run(&mut self, renderer: &mut dyn OutlineRenderer) {
        while let Some(batch) = self.resolver.next() {
            self.apply(batch, renderer);
        }
    }

    /// Close the cycle and drop its blueprints, resolved or not.
    #[tracing::instrument(skip_all, fields(blueprints = self.report.blueprints))]
    pub fn finish(self) -> FlushReport {
        let mut report = self.report;
        report.dropped = self
            .order
            .iter()
            .filter(|(k, _)| !self.resolved.contains(k))
            .count();
        tracing::debug!(
            elements = report.elements,
            batches = report.batches,
            outlines = report.outlines_emitted,
            dropped = report.dropped,
            "flush complete"
        );
        report
    }

    fn apply(
        &mut self,
        batch: Vec<VisibilityEntry>,
        renderer: &mut dyn OutlineRenderer,
    ) {
        self.report.batches += 1;
        let mut touched = HashSet::new();
        for entry in batch {
            let Some(rect) = entry.resolved_rect() else {
                continue;
            };
            self.rects.insert(entry.element, rect);
            if let Some(keys) = self.owners.get(&entry.element) {
                touched.extend(keys.iter().copied());
            }
        }
        if touched.is_empty() {
            return;
        }

        let outlines = self.finalize(&touched);
        if !outlines.is_empty() {
            self.report.outlines_emitted += outlines.len();
            tracing::trace!(outlines = outlines.len(), "emitting outline batch");
            renderer.render_outlines(&outlines);
        }
    }

    fn finalize(&mut self, touched: &HashSet<InstanceKey>) -> Vec<FinalizedOutline> {
        let mut out = Vec::with_capacity(touched.len());
        for (key, id) in self.order.iter().filter(|(k, _)| touched.contains(k)) {
            let Some(bp) = self.blueprints.get(key) else {
                continue;
            };
            let rects: Vec<Rect> = bp
                .nodes
                .iter()
                .filter(|n| n.is_element())
                .filter_map(|n| self.rects.get(&n.id).copied())
                .collect();
            let Some(rect) = merge_rects(&rects) else {
                continue;
            };
            self.resolved.insert(*key);
            out.push(FinalizedOutline {
                id: *id,
                name: bp.name.clone(),
                count: bp.count,
                rect,
                did_commit: bp.did_commit,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AnimationOpts,
        foundation::core::SurfaceSize,
        render::{
            animation::OutlineSet,
            backend::BackendKind,
            offload::protocol::{pack_outlines, unpack_outlines},
        },
        visibility::{
            layout::LayoutVisibility,
            source::{NotificationSink, ObserverHandle},
        },
    };

    #[derive(Default)]
    struct Recording {
        calls: Vec<Vec<FinalizedOutline>>,
    }

    impl OutlineRenderer for Recording {
        fn kind(&self) -> BackendKind {
            BackendKind::Direct
        }
        fn render_outlines(&mut self, outlines: &[FinalizedOutline]) {
            self.calls.push(outlines.to_vec());
        }
        fn resize(&mut self, _size: SurfaceSize, _dpr: f64) {}
        fn scroll(&mut self, _dx: f64, _dy: f64) {}
        fn on_frame(&mut self) -> bool {
            false
        }
        fn dispose(&mut self) {}
        fn is_disposed(&self) -> bool {
            false
        }
    }

    fn layout() -> LayoutVisibility {
        let mut layout = LayoutVisibility::new(Rect::new(0.0, 0.0, 200.0, 200.0));
        layout.place(ElementId(1), Rect::new(10.0, 10.0, 50.0, 50.0));
        layout.place(ElementId(2), Rect::new(0.0, 0.0, 10.0, 10.0));
        layout.place(ElementId(3), Rect::new(20.0, 20.0, 10.0, 10.0));
        layout.place(ElementId(4), Rect::new(500.0, 500.0, 10.0, 10.0));
        layout
    }

    /// Keeps the sink so the test decides when bursts arrive.
    struct Held {
        sink: Option<NotificationSink>,
    }

    impl VisibilitySource for Held {
        fn observe(
            &mut self,
            _elements: &[ElementId],
            sink: NotificationSink,
        ) -> ScopeResult<ObserverHandle> {
            self.sink = Some(sink);
            Ok(ObserverHandle::noop())
        }
    }

    fn seen(id: u64) -> VisibilityEntry {
        VisibilityEntry {
            element: ElementId(id),
            rect: Rect::new(0.0, 0.0, 4.0, 4.0),
            is_intersecting: true,
        }
    }

    #[test]
    fn repeated_records_count_and_keep_latest_commit() {
        let mut agg = Aggregator::new();
        let key = InstanceKey(7);
        agg.record(key, "List", vec![Node::element(1)], true);
        agg.record(key, "List", vec![Node::element(1)], false);
        agg.record(key, "List", vec![Node::element(1)], true);
        agg.record(key, "List", vec![Node::element(1)], false);

        let bp = agg.blueprint(key).unwrap();
        assert_eq!(bp.count, 4);
        assert!(!bp.did_commit);
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn empty_flush_is_a_noop() {
        let mut agg = Aggregator::new();
        let mut renderer = Recording::default();
        let report = agg.flush(&mut layout(), &mut renderer).unwrap();
        assert_eq!(report, FlushReport::default());
        assert!(renderer.calls.is_empty());
    }

    #[test]
    fn flush_merges_and_clears() {
        let mut agg = Aggregator::new();
        agg.record(InstanceKey(1), "A", vec![Node::element(1)], true);
        agg.record(
            InstanceKey(2),
            "C",
            vec![Node::element(2), Node::text(99), Node::element(3)],
            false,
        );

        let mut renderer = Recording::default();
        let report = agg.flush(&mut layout(), &mut renderer).unwrap();
        assert!(agg.is_empty());
        assert_eq!(report.blueprints, 2);
        assert_eq!(report.elements, 3);
        assert_eq!(report.dropped, 0);

        let last: HashMap<u64, FinalizedOutline> = renderer
            .calls
            .iter()
            .flatten()
            .map(|o| (o.id, o.clone()))
            .collect();
        assert_eq!(last[&1].rect, Rect::new(10.0, 10.0, 50.0, 50.0));
        assert_eq!(last[&2].rect, Rect::new(0.0, 0.0, 30.0, 30.0));
        assert!(!last[&2].did_commit);
    }

    #[test]
    fn unresolved_blueprints_are_dropped_without_render() {
        let mut agg = Aggregator::new();
        agg.record(InstanceKey(9), "Offscreen", vec![Node::element(4)], true);
        agg.record(InstanceKey(10), "Detached", vec![Node::element(404)], true);
        agg.record(InstanceKey(11), "TextOnly", vec![Node::text(5)], true);

        let mut renderer = Recording::default();
        let report = agg.flush(&mut layout(), &mut renderer).unwrap();
        assert!(renderer.calls.is_empty());
        assert_eq!(report.dropped, 3);
        assert_eq!(report.elements, 2);
        assert!(agg.is_empty());
    }

    #[test]
    fn emission_follows_first_record_order() {
        let mut agg = Aggregator::new();
        agg.record(InstanceKey(30), "Late", vec![Node::element(2)], true);
        agg.record(InstanceKey(10), "Early", vec![Node::element(1)], true);

        let mut renderer = Recording::default();
        let mut source = layout().with_burst_size(8);
        agg.flush(&mut source, &mut renderer).unwrap();
        assert_eq!(renderer.calls.len(), 1);
        let names: Vec<&str> = renderer.calls[0].iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Late", "Early"]);
        let ids: Vec<u64> = renderer.calls[0].iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn large_keys_get_distinct_ids_that_survive_the_wire() {
        let mut agg = Aggregator::new();
        let a = InstanceKey((1 << 24) + 1);
        let b = InstanceKey((1 << 24) + 2);
        agg.record(a, "A", vec![Node::element(1)], true);
        agg.record(b, "B", vec![Node::element(2)], true);
        assert_ne!(agg.outline_id(a), agg.outline_id(b));

        let mut renderer = Recording::default();
        agg.flush(&mut layout().with_burst_size(8), &mut renderer).unwrap();
        let (buffer, names) = pack_outlines(&renderer.calls[0]).unwrap();
        let decoded = unpack_outlines(&buffer, names).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_ne!(decoded[0].id, decoded[1].id);
        assert_eq!(decoded[0].id, agg.outline_id(a).unwrap());
        assert_eq!(decoded[1].id, agg.outline_id(b).unwrap());
    }

    #[test]
    fn ids_are_stable_across_cycles() {
        let mut agg = Aggregator::new();
        let mut renderer = Recording::default();
        agg.record(InstanceKey(500), "A", vec![Node::element(1)], true);
        agg.flush(&mut layout(), &mut renderer).unwrap();
        agg.record(InstanceKey(600), "B", vec![Node::element(2)], true);
        agg.record(InstanceKey(500), "A", vec![Node::element(1)], true);
        agg.flush(&mut layout(), &mut renderer).unwrap();

        assert_eq!(agg.outline_id(InstanceKey(500)), Some(1));
        assert_eq!(agg.outline_id(InstanceKey(600)), Some(2));
        let a: Vec<u64> = renderer
            .calls
            .iter()
            .flatten()
            .filter(|o| o.name == "A")
            .map(|o| o.id)
            .collect();
        assert_eq!(a, vec![1, 1]);
    }

    #[test]
    fn incremental_batches_only_reemit_touched_blueprints() {
        let mut agg = Aggregator::new();
        agg.record(InstanceKey(1), "A", vec![Node::element(1)], true);
        agg.record(
            InstanceKey(2),
            "C",
            vec![Node::element(2), Node::element(3)],
            true,
        );

        let mut renderer = Recording::default();
        let mut source = layout().with_burst_size(1);
        let report = agg.flush(&mut source, &mut renderer).unwrap();
        assert_eq!(report.batches, 3);
        assert_eq!(renderer.calls.len(), 3);
        for call in &renderer.calls {
            assert_eq!(call.len(), 1);
        }
        let c: Vec<&FinalizedOutline> = renderer
            .calls
            .iter()
            .flatten()
            .filter(|o| o.id == 2)
            .collect();
        assert_eq!(c.len(), 2);
        assert_eq!(c[1].rect, Rect::new(0.0, 0.0, 30.0, 30.0));

        let mut set = OutlineSet::new();
        for call in &renderer.calls {
            set.merge(call);
        }
        let shown = set.get(2).unwrap();
        assert_eq!(shown.target, Rect::new(0.0, 0.0, 30.0, 30.0));
        assert_eq!(shown.count, 2);
        assert_eq!(set.get(1).unwrap().count, 1);
    }

    #[test]
    fn multi_batch_flush_counts_one_per_reemission() {
        let mut agg = Aggregator::new();
        for _ in 0..5 {
            agg.record(
                InstanceKey(2),
                "C",
                vec![Node::element(2), Node::element(3)],
                true,
            );
        }

        let mut renderer = Recording::default();
        let report = agg
            .flush(&mut layout().with_burst_size(1), &mut renderer)
            .unwrap();
        assert_eq!(report.outlines_emitted, 2);
        assert_eq!(renderer.calls[0][0].count, 5);

        let mut set = OutlineSet::new();
        set.merge(&renderer.calls[0]);
        assert_eq!(set.get(1).unwrap().count, 5);
        set.step(&AnimationOpts::default());
        set.merge(&renderer.calls[1]);
        let shown = set.get(1).unwrap();
        assert_eq!(shown.count, 6);
        assert_eq!(shown.frame, 0);
    }

    #[test]
    fn open_cycle_renders_ready_batches_without_waiting() {
        let mut agg = Aggregator::new();
        agg.record(InstanceKey(1), "Seen", vec![Node::element(1)], true);
        agg.record(InstanceKey(2), "Never", vec![Node::element(2)], true);

        let mut src = Held { sink: None };
        let mut cycle = agg.begin_flush(&mut src).unwrap().unwrap();
        assert!(agg.is_empty());
        let mut renderer = Recording::default();
        assert!(!cycle.poll(&mut renderer));
        assert!(renderer.calls.is_empty());

        let sink = src.sink.take().unwrap();
        assert!(sink.try_deliver(vec![seen(1)]).is_ok());
        assert!(!cycle.poll(&mut renderer));
        assert_eq!(renderer.calls.len(), 1);
        assert_eq!(renderer.calls[0][0].name, "Seen");
        assert!(!cycle.is_done());

        drop(sink);
        assert!(cycle.poll(&mut renderer));
        let report = cycle.finish();
        assert_eq!(report.blueprints, 2);
        assert_eq!(report.batches, 1);
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn failed_subscription_still_clears_blueprints() {
        struct Refusing;
        impl VisibilitySource for Refusing {
            fn observe(
                &mut self,
                _elements: &[ElementId],
                _sink: NotificationSink,
            ) -> ScopeResult<ObserverHandle> {
                Err(crate::foundation::error::ScopeError::visibility("refused"))
            }
        }

        let mut agg = Aggregator::new();
        agg.record(InstanceKey(1), "A", vec![Node::element(1)], true);
        assert!(agg.begin_flush(&mut Refusing).is_err());
        assert!(agg.is_empty());
        assert!(agg.begin_flush(&mut Refusing).unwrap().is_none());
    }
}
