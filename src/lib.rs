#![forbid(unsafe_code)]

pub mod config;
pub mod foundation;
pub mod outline;
pub mod render;
pub mod replay;
pub mod schedule;
pub mod visibility;

pub use config::{AnimationOpts, OutlineStyle, PipelineOpts};
pub use foundation::core::{ElementId, InstanceKey, Node, NodeKind, Rect, SurfaceSize};
pub use foundation::error::{ScopeError, ScopeResult};
pub use outline::aggregator::{Aggregator, FlushCycle, FlushReport};
pub use outline::merge::merge_rects;
pub use outline::model::{FinalizedOutline, InstanceBlueprint};
pub use render::animation::{ActiveOutline, OutlineSet};
pub use render::backend::{BackendKind, OutlineRenderer};
pub use render::canvas::OutlineCanvas;
pub use render::direct::DirectRenderer;
pub use render::ease::Ease;
pub use render::offload::{OffloadedRenderer, SpawnFailure};
pub use render::offload::protocol::{MAX_WIRE_ID, OUTLINE_STRIDE, OutlineBuffer, WorkerMessage};
pub use render::paint::OutlineLabel;
pub use render::select::{HostCapabilities, create_renderer};
pub use render::surface::{FrameRGBA, NullPresenter, OverlaySurface, Present, SharedFrame};
pub use replay::{ReplayOutcome, ReplayTrace, run_replay};
pub use schedule::clock::{FrameRequester, FrameSignal, NoopRequester};
pub use schedule::pipeline::OutlinePipeline;
pub use visibility::layout::LayoutVisibility;
pub use visibility::resolver::{BatchPoll, BatchedVisibility};
pub use visibility::source::{NotificationSink, ObserverHandle, VisibilityEntry, VisibilitySource};
