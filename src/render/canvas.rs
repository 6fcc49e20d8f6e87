use crate::{
    config::{AnimationOpts, OutlineStyle},
    foundation::{core::SurfaceSize, error::ScopeResult},
    outline::model::FinalizedOutline,
    render::{
        animation::OutlineSet,
        paint::{OutlineLabel, build_labels, paint_outlines},
        surface::OverlaySurface,
    },
};

/// Surface plus animation state: the merge/animate/draw logic run by whichever thread owns the
/// surface.
#[derive(Debug)]
pub struct OutlineCanvas {
    surface: OverlaySurface,
    outlines: OutlineSet,
    anim: AnimationOpts,
    style: OutlineStyle,
    /// Whether the last presented frame had anything on it.
    dirty: bool,
}

impl OutlineCanvas {
    pub fn new(surface: OverlaySurface, anim: AnimationOpts, style: OutlineStyle) -> Self {
        Self {
            surface,
            outlines: OutlineSet::new(),
            anim,
            style,
            dirty: false,
        }
    }

    pub fn outlines(&self) -> &OutlineSet {
        &self.outlines
    }

    pub fn surface(&self) -> &OverlaySurface {
        &self.surface
    }

    pub fn merge(&mut self, outlines: &[FinalizedOutline]) {
        self.outlines.merge(outlines);
    }

    pub fn scroll(&mut self, dx: f64, dy: f64) {
        self.outlines.scroll(dx, dy);
    }

    pub fn resize(&mut self, size: SurfaceSize, dpr: f64) -> ScopeResult<()> {
        self.surface.resize(size, dpr)
    }

    pub fn is_animating(&self) -> bool {
        !self.outlines.is_empty()
    }

    /// One animation frame: advance every entry, drop expired ones, repaint and present.
    ///
    /// Returns `true` while further frames are needed. The frame that removes the last entry
    /// still presents a cleared surface.
    pub fn draw_step(&mut self) -> bool {
        if self.outlines.is_empty() && !self.dirty {
            return false;
        }
        let animating = self.outlines.step(&self.anim);
        paint_outlines(&mut self.surface, &self.outlines, &self.anim, &self.style);
        self.surface.present();
        self.dirty = animating;
        animating
    }

    /// Labels for the current state, for hosts that draw text themselves.
    pub fn labels(&self) -> Vec<OutlineLabel> {
        build_labels(
            &self.outlines,
            self.surface.size().bounds(),
            &self.anim,
            &self.style,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        foundation::core::Rect,
        render::surface::{NullPresenter, SharedFrame},
    };

    fn outline(id: u64, rect: Rect) -> FinalizedOutline {
        FinalizedOutline {
            id,
            name: "Box".to_string(),
            count: 1,
            rect,
            did_commit: true,
        }
    }

    fn canvas(shared: &SharedFrame, max_frames: u32) -> OutlineCanvas {
        let surface = OverlaySurface::new(
            SurfaceSize::new(64.0, 64.0),
            1.0,
            Box::new(shared.clone()),
        )
        .unwrap();
        OutlineCanvas::new(
            surface,
            AnimationOpts {
                max_frames,
                ..AnimationOpts::default()
            },
            OutlineStyle::default(),
        )
    }

    #[test]
    fn idle_canvas_does_not_present() {
        let shared = SharedFrame::new();
        let mut c = canvas(&shared, 5);
        assert!(!c.draw_step());
        assert_eq!(shared.present_count(), 0);
    }

    #[test]
    fn outline_pixels_appear_then_clear_after_expiry() {
        let shared = SharedFrame::new();
        let mut c = canvas(&shared, 2);
        c.merge(&[outline(1, Rect::new(10.0, 20.0, 30.0, 30.0))]);

        assert!(c.draw_step());
        let frame = shared.latest().unwrap();
        // Stroke pixel on the left edge, untouched pixel outside.
        assert!(frame.pixel(10, 35).unwrap()[3] > 0);
        assert_eq!(frame.pixel(2, 2).unwrap()[3], 0);

        assert!(c.draw_step());
        assert!(!c.draw_step());
        assert!(shared.latest().unwrap().is_blank());
        let presents = shared.present_count();
        assert!(!c.draw_step());
        assert_eq!(shared.present_count(), presents);
    }

    #[test]
    fn labels_follow_surface_bounds() {
        let surface =
            OverlaySurface::new(SurfaceSize::new(50.0, 50.0), 1.0, Box::new(NullPresenter))
                .unwrap();
        let mut c = OutlineCanvas::new(surface, AnimationOpts::default(), OutlineStyle::default());
        c.merge(&[outline(1, Rect::new(45.0, 0.0, 5.0, 5.0))]);
        let labels = c.labels();
        assert_eq!(labels.len(), 1);
        assert!(labels[0].plate.right() <= 50.0);
        assert_eq!(labels[0].plate.y, 0.0);
    }
}
