//! Wire format between the main thread and the background drawing thread.
//!
//! Outlines travel as a flat `f32` buffer with a fixed stride of [`OUTLINE_STRIDE`] slots:
//! `[id, count, x, y, width, height, did_commit]`. Names travel beside it as an index-aligned list.
//! Ids must not exceed [`MAX_WIRE_ID`], the largest range in which every integer is an exact `f32`.

use crate::{
    foundation::{
        core::{Rect, SurfaceSize},
        error::{ScopeError, ScopeResult},
    },
    outline::model::FinalizedOutline,
    render::surface::OverlaySurface,
};

/// Slots per outline record.
pub const OUTLINE_STRIDE: usize = 7;
/// Bytes per slot.
pub const SLOT_BYTES: usize = std::mem::size_of::<f32>();
/// Bytes per outline record.
pub const RECORD_BYTES: usize = OUTLINE_STRIDE * SLOT_BYTES;
/// Largest outline id the wire carries without rounding.
pub const MAX_WIRE_ID: u64 = 1 << 24;

const SLOT_ID: usize = 0;
const SLOT_COUNT: usize = 1;
const SLOT_X: usize = 2;
const SLOT_Y: usize = 3;
const SLOT_WIDTH: usize = 4;
const SLOT_HEIGHT: usize = 5;
const SLOT_COMMIT: usize = 6;

/// Fixed-stride outline records. Ownership moves with the message that carries it.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct OutlineBuffer {
    slots: Vec<f32>,
}

impl OutlineBuffer {
    pub fn with_capacity(outlines: usize) -> Self {
        Self {
            slots: Vec::with_capacity(outlines * OUTLINE_STRIDE),
        }
    }

    pub fn from_slots(slots: Vec<f32>) -> ScopeResult<Self> {
        if slots.len() % OUTLINE_STRIDE != 0 {
            return Err(ScopeError::protocol(format!(
                "outline buffer holds {} slots, not a multiple of {OUTLINE_STRIDE}",
                slots.len()
            )));
        }
        Ok(Self { slots })
    }

    pub fn from_bytes(bytes: &[u8]) -> ScopeResult<Self> {
        if bytes.len() % RECORD_BYTES != 0 {
            return Err(ScopeError::protocol(format!(
                "outline buffer is {} bytes, not a multiple of {RECORD_BYTES}",
                bytes.len()
            )));
        }
        Self::from_slots(bytemuck::pod_collect_to_vec::<u8, f32>(bytes))
    }

    pub fn push(&mut self, o: &FinalizedOutline) -> ScopeResult<()> {
        if o.id > MAX_WIRE_ID {
            return Err(ScopeError::protocol(format!(
                "outline id {} exceeds the wire limit {MAX_WIRE_ID}",
                o.id
            )));
        }
        let mut record = [0.0f32; OUTLINE_STRIDE];
        record[SLOT_ID] = o.id as f32;
        record[SLOT_COUNT] = o.count as f32;
        record[SLOT_X] = o.rect.x as f32;
        record[SLOT_Y] = o.rect.y as f32;
        record[SLOT_WIDTH] = o.rect.width as f32;
        record[SLOT_HEIGHT] = o.rect.height as f32;
        record[SLOT_COMMIT] = if o.did_commit { 1.0 } else { 0.0 };
        self.slots.extend_from_slice(&record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len() / OUTLINE_STRIDE
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.slots.len() * SLOT_BYTES
    }

    pub fn slots(&self) -> &[f32] {
        &self.slots
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.slots)
    }

    pub fn records(&self) -> impl Iterator<Item = &[f32]> {
        self.slots.chunks_exact(OUTLINE_STRIDE)
    }
}

/// Pack outlines into a buffer and an index-aligned name list.
pub fn pack_outlines(outlines: &[FinalizedOutline]) -> ScopeResult<(OutlineBuffer, Vec<String>)> {
    let mut buffer = OutlineBuffer::with_capacity(outlines.len());
    let mut names = Vec::with_capacity(outlines.len());
    for o in outlines {
        buffer.push(o)?;
        names.push(o.name.clone());
    }
    Ok((buffer, names))
}

pub fn unpack_outlines(
    buffer: &OutlineBuffer,
    names: Vec<String>,
) -> ScopeResult<Vec<FinalizedOutline>> {
    if names.len() != buffer.len() {
        return Err(ScopeError::protocol(format!(
            "{} outline records but {} names",
            buffer.len(),
            names.len()
        )));
    }

    Ok(buffer
        .records()
        .zip(names)
        .map(|(r, name)| FinalizedOutline {
            id: r[SLOT_ID] as u64,
            name,
            count: r[SLOT_COUNT] as u32,
            rect: Rect::new(
                f64::from(r[SLOT_X]),
                f64::from(r[SLOT_Y]),
                f64::from(r[SLOT_WIDTH]),
                f64::from(r[SLOT_HEIGHT]),
            ),
            did_commit: r[SLOT_COMMIT] != 0.0,
        })
        .collect())
}

/// One-way messages to the drawing thread. Delivered in order; never acknowledged.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Hands the surface to the worker. Sent once, first.
    Init {
        surface: OverlaySurface,
        width: f64,
        height: f64,
        dpr: f64,
    },
    DrawOutlines {
        buffer: OutlineBuffer,
        names: Vec<String>,
    },
    Resize {
        width: f64,
        height: f64,
        dpr: f64,
    },
    Scroll {
        delta_x: f64,
        delta_y: f64,
    },
}

impl WorkerMessage {
    pub fn init(surface: OverlaySurface) -> Self {
        let size = surface.size();
        let dpr = surface.dpr();
        Self::Init {
            surface,
            width: size.width,
            height: size.height,
            dpr,
        }
    }

    pub fn draw(outlines: &[FinalizedOutline]) -> ScopeResult<Self> {
        let (buffer, names) = pack_outlines(outlines)?;
        Ok(Self::DrawOutlines { buffer, names })
    }

    pub fn resize(size: SurfaceSize, dpr: f64) -> Self {
        Self::Resize {
            width: size.width,
            height: size.height,
            dpr,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::DrawOutlines { .. } => "draw-outlines",
            Self::Resize { .. } => "resize",
            Self::Scroll { .. } => "scroll",
        }
    }
}
