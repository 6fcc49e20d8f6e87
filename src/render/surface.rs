use std::sync::{Arc, Mutex, PoisonError};

use crate::foundation::{core::SurfaceSize, error::ScopeResult};

/// A presented overlay frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data.get(i..i + 4).map(|px| [px[0], px[1], px[2], px[3]])
    }

    pub fn is_blank(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Straight (non-premultiplied) RGBA8, suitable for image encoders.
    pub fn to_straight_rgba(&self) -> Vec<u8> {
        if !self.premultiplied {
            return self.data.clone();
        }
        let mut out = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            let a = px[3];
            if a == 0 {
                out.extend_from_slice(&[0, 0, 0, 0]);
                continue;
            }
            let unpremul = |c: u8| -> u8 {
                ((u16::from(c) * 255 + u16::from(a) / 2) / u16::from(a)).min(255) as u8
            };
            out.extend_from_slice(&[unpremul(px[0]), unpremul(px[1]), unpremul(px[2]), a]);
        }
        out
    }
}

/// Receives finished frames from whichever thread owns the surface.
pub trait Present: Send {
    fn present(&mut self, frame: &FrameRGBA);
}

/// Discards frames.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPresenter;

impl Present for NullPresenter {
    fn present(&mut self, _frame: &FrameRGBA) {}
}

/// Latest-frame slot readable from any thread.
#[derive(Clone, Debug, Default)]
pub struct SharedFrame {
    inner: Arc<Mutex<SharedFrameState>>,
}

#[derive(Debug, Default)]
struct SharedFrameState {
    latest: Option<FrameRGBA>,
    presents: u64,
}

impl SharedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<FrameRGBA> {
        self.lock().latest.clone()
    }

    pub fn present_count(&self) -> u64 {
        self.lock().presents
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SharedFrameState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Present for SharedFrame {
    fn present(&mut self, frame: &FrameRGBA) {
        let mut state = self.lock();
        state.latest = Some(frame.clone());
        state.presents += 1;
    }
}

/// Drawing surface: a logical size, a device pixel ratio and a backing pixmap of
/// `logical * dpr` pixels.
///
/// The surface is `Send` so it can be moved onto a drawing thread; whoever owns it is the only
/// party able to draw.
pub struct OverlaySurface {
    size: SurfaceSize,
    dpr: f64,
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
    presenter: Box<dyn Present>,
}

impl OverlaySurface {
    pub fn new(size: SurfaceSize, dpr: f64, presenter: Box<dyn Present>) -> ScopeResult<Self> {
        let (width, height) = size.physical(dpr)?;
        Ok(Self {
            size,
            dpr,
            width,
            height,
            pixmap: vello_cpu::Pixmap::new(width, height),
            presenter,
        })
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    pub fn physical_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Update the logical size and ratio. The backing store is reallocated only when its pixel
    /// dimensions change.
    pub fn resize(&mut self, size: SurfaceSize, dpr: f64) -> ScopeResult<()> {
        let (width, height) = size.physical(dpr)?;
        self.size = size;
        self.dpr = dpr;
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.pixmap = vello_cpu::Pixmap::new(width, height);
        }
        Ok(())
    }

    /// Transform from logical coordinates to backing-store pixels.
    pub fn transform(&self) -> vello_cpu::kurbo::Affine {
        vello_cpu::kurbo::Affine::scale(self.dpr)
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut vello_cpu::Pixmap {
        &mut self.pixmap
    }

    pub fn snapshot(&self) -> FrameRGBA {
        FrameRGBA {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: self.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }

    pub fn present(&mut self) {
        let frame = self.snapshot();
        self.presenter.present(&frame);
    }
}

impl std::fmt::Debug for OverlaySurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlaySurface")
            .field("size", &self.size)
            .field("dpr", &self.dpr)
            .field("physical", &(self.width, self.height))
            .finish()
    }
}

pub(crate) fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_store_follows_dpr() {
        let mut s =
            OverlaySurface::new(SurfaceSize::new(40.0, 30.0), 2.0, Box::new(NullPresenter)).unwrap();
        assert_eq!(s.physical_size(), (80, 60));
        s.resize(SurfaceSize::new(40.0, 30.0), 1.0).unwrap();
        assert_eq!(s.physical_size(), (40, 30));
        assert_eq!(s.snapshot().data.len(), 40 * 30 * 4);
        assert!(s.resize(SurfaceSize::new(40.0, 30.0), -1.0).is_err());
        assert_eq!(s.dpr(), 1.0);
    }

    #[test]
    fn shared_frame_keeps_latest_present() {
        let shared = SharedFrame::new();
        let mut s = OverlaySurface::new(
            SurfaceSize::new(2.0, 2.0),
            1.0,
            Box::new(shared.clone()),
        )
        .unwrap();
        s.present();
        s.present();
        assert_eq!(shared.present_count(), 2);
        let frame = shared.latest().unwrap();
        assert_eq!((frame.width, frame.height), (2, 2));
        assert!(frame.is_blank());
    }

    #[test]
    fn unpremultiply_restores_channels() {
        let frame = FrameRGBA {
            width: 2,
            height: 1,
            data: vec![50, 0, 100, 128, 9, 9, 9, 0],
            premultiplied: true,
        };
        let straight = frame.to_straight_rgba();
        assert_eq!(&straight[..4], &[100, 0, 199, 128]);
        assert_eq!(&straight[4..], &[0, 0, 0, 0]);
        assert_eq!(frame.pixel(1, 0), Some([9, 9, 9, 0]));
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn pixel_lookup_past_u32_index_range_misses_instead_of_overflowing() {
        let frame = FrameRGBA {
            width: 70_000,
            height: 70_000,
            data: vec![0; 16],
            premultiplied: true,
        };
        assert_eq!(frame.pixel(69_999, 69_999), None);
        assert_eq!(frame.pixel(3, 0), Some([0, 0, 0, 0]));
    }
}
