/// Curves mapping normalized outline age to fade progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InCubic,
    OutCubic,
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }

    /// Opacity of an outline `frame` frames old on a `max_frames` lifetime.
    pub fn fade_alpha(self, frame: u32, max_frames: u32) -> f64 {
        if max_frames == 0 {
            return 0.0;
        }
        1.0 - self.apply(f64::from(frame) / f64::from(max_frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Ease; 5] = [
        Ease::Linear,
        Ease::InQuad,
        Ease::OutQuad,
        Ease::InCubic,
        Ease::OutCubic,
    ];

    #[test]
    fn endpoints_are_stable() {
        for ease in ALL {
            assert_eq!(ease.apply(0.0), 0.0);
            assert_eq!(ease.apply(1.0), 1.0);
        }
    }

    #[test]
    fn alpha_fades_with_age() {
        for ease in ALL {
            let fresh = ease.fade_alpha(0, 45);
            let mid = ease.fade_alpha(20, 45);
            let old = ease.fade_alpha(45, 45);
            assert_eq!(fresh, 1.0);
            assert!(mid < fresh && mid > old);
            assert_eq!(old, 0.0);
        }
        assert_eq!(Ease::Linear.fade_alpha(200, 45), 0.0);
    }
}
