use crate::foundation::core::{Node, Rect};

/// Per-instance accumulator for one flush cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceBlueprint {
    pub name: String,
    /// Renders observed since the last flush. Starts at 1.
    pub count: u32,
    pub nodes: Vec<Node>,
    /// Commit status of the latest render.
    pub did_commit: bool,
}

/// A resolved outline handed from the aggregator to a renderer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FinalizedOutline {
    pub id: u64,
    pub name: String,
    pub count: u32,
    pub rect: Rect,
    pub did_commit: bool,
}
