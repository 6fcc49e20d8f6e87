use crate::foundation::error::{ScopeError, ScopeResult};

/// Axis-aligned rectangle in logical (viewport) pixels.
#[derive(Clone, Copy, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(self) -> f64 {
        self.y + self.height
    }

    pub fn area(self) -> f64 {
        self.width * self.height
    }

    /// `true` when the rect covers no pixels (zero or negative extent, or NaN).
    pub fn is_empty(self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    pub fn contains_rect(self, other: Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    pub fn to_kurbo(self) -> kurbo::Rect {
        kurbo::Rect::new(self.x, self.y, self.right(), self.bottom())
    }

    pub fn from_kurbo(r: kurbo::Rect) -> Self {
        Self {
            x: r.x0,
            y: r.y0,
            width: r.width(),
            height: r.height(),
        }
    }
}

/// Logical (CSS-like) surface size. The backing store is this size times the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Backing-store pixel dimensions for `dpr`, at least 1x1.
    pub fn physical(self, dpr: f64) -> ScopeResult<(u16, u16)> {
        if !(dpr.is_finite() && dpr > 0.0) {
            return Err(ScopeError::validation("device pixel ratio must be > 0"));
        }
        fn scaled(v: f64, dpr: f64, axis: &str) -> ScopeResult<u16> {
            let px = (v * dpr).round().max(1.0);
            if !px.is_finite() || px > f64::from(u16::MAX) {
                return Err(ScopeError::validation(format!(
                    "surface {axis} exceeds u16 at dpr {dpr}"
                )));
            }
            Ok(px as u16)
        }
        Ok((
            scaled(self.width, dpr, "width")?,
            scaled(self.height, dpr, "height")?,
        ))
    }

    pub fn bounds(self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Handle of an on-screen node owned by the host UI.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ElementId(pub u64);

/// Opaque identity of a component instance, issued by the instrumentation source.
///
/// Only the key is stored; the instance itself is never owned here.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct InstanceKey(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

/// A host node associated with an instance. Only `Element` nodes have a layout box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: ElementId,
    pub kind: NodeKind,
}

impl Node {
    pub fn element(id: u64) -> Self {
        Self {
            id: ElementId(id),
            kind: NodeKind::Element,
        }
    }

    pub fn text(id: u64) -> Self {
        Self {
            id: ElementId(id),
            kind: NodeKind::Text,
        }
    }

    pub fn is_element(self) -> bool {
        self.kind == NodeKind::Element
    }
}
