use std::time::Duration;

use crate::{
    foundation::error::{ScopeError, ScopeResult},
    render::ease::Ease,
};

/// Top-level pipeline configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineOpts {
    /// Period of the flush timer.
    pub flush_interval_ms: u64,
    /// Quiet window before a resize is forwarded to the renderer.
    pub resize_debounce_ms: u64,
    /// Minimum spacing between forwarded scroll deltas.
    pub scroll_interval_ms: u64,
    /// Opt in to the offloaded backend where the host supports it.
    pub offload: bool,
    pub animation: AnimationOpts,
    pub style: OutlineStyle,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            flush_interval_ms: 32,
            resize_debounce_ms: 16,
            scroll_interval_ms: 16,
            offload: false,
            animation: AnimationOpts::default(),
            style: OutlineStyle::default(),
        }
    }
}

impl PipelineOpts {
    pub fn from_json_str(s: &str) -> ScopeResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| ScopeError::config(format!("invalid pipeline options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> ScopeResult<()> {
        if self.flush_interval_ms == 0 {
            return Err(ScopeError::config("flush_interval_ms must be > 0"));
        }
        if self.animation.max_frames == 0 {
            return Err(ScopeError::config("animation.max_frames must be > 0"));
        }
        if !(self.animation.approach > 0.0 && self.animation.approach <= 1.0) {
            return Err(ScopeError::config("animation.approach must be in (0, 1]"));
        }
        if !(self.animation.snap_epsilon >= 0.0) {
            return Err(ScopeError::config("animation.snap_epsilon must be >= 0"));
        }
        if self.animation.worker_frame_ms == 0 {
            return Err(ScopeError::config("animation.worker_frame_ms must be > 0"));
        }
        if self.style.max_label_chars == 0 {
            return Err(ScopeError::config("style.max_label_chars must be > 0"));
        }
        Ok(())
    }

    /// Apply `RENDERSCOPE_OFFLOAD` and `RENDERSCOPE_FLUSH_INTERVAL_MS` when set and well-formed.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = std::env::var("RENDERSCOPE_OFFLOAD")
            .ok()
            .and_then(|v| parse_flag(&v))
        {
            self.offload = v;
        }
        if let Some(ms) = std::env::var("RENDERSCOPE_FLUSH_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&n| n > 0)
        {
            self.flush_interval_ms = ms;
        }
        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn scroll_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_interval_ms)
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Outline animation policy, shared by both backends.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnimationOpts {
    /// Frames an outline stays on screen after its last update.
    pub max_frames: u32,
    /// Fraction of the remaining distance covered per frame.
    pub approach: f64,
    /// Distance below which the current rect snaps onto its target.
    pub snap_epsilon: f64,
    pub fade: Ease,
    /// Frame period of the background drawing thread.
    pub worker_frame_ms: u64,
}

impl Default for AnimationOpts {
    fn default() -> Self {
        Self {
            max_frames: 45,
            approach: 0.2,
            snap_epsilon: 0.5,
            fade: Ease::Linear,
            worker_frame_ms: 16,
        }
    }
}

/// Colours and label metrics.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OutlineStyle {
    /// Straight RGB for renders that committed to the host tree.
    pub committed_rgb: [u8; 3],
    /// Straight RGB for renders that produced no commit.
    pub uncommitted_rgb: [u8; 3],
    /// Fill opacity relative to the stroke.
    pub fill_alpha: f64,
    /// Stroke width in logical pixels.
    pub stroke_width: f64,
    pub label_height: f64,
    /// Approximate advance per label character, used to size label plates.
    pub label_char_width: f64,
    pub max_label_chars: usize,
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            committed_rgb: [115, 97, 230],
            uncommitted_rgb: [158, 158, 170],
            fill_alpha: 0.1,
            stroke_width: 1.0,
            label_height: 14.0,
            label_char_width: 6.0,
            max_label_chars: 40,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let opts =
            PipelineOpts::from_json_str(r#"{"offload": true, "animation": {"max_frames": 10}}"#)
                .unwrap();
        assert!(opts.offload);
        assert_eq!(opts.animation.max_frames, 10);
        assert_eq!(opts.animation.approach, 0.2);
        assert_eq!(opts.flush_interval_ms, 32);
        assert_eq!(opts.style.committed_rgb, [115, 97, 230]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(PipelineOpts::from_json_str(r#"{"flush_interval_ms": 0}"#).is_err());
        assert!(PipelineOpts::from_json_str(r#"{"animation": {"approach": 1.5}}"#).is_err());
        assert!(PipelineOpts::from_json_str(r#"{"animation": {"max_frames": 0}}"#).is_err());
        assert!(PipelineOpts::from_json_str("not json").is_err());
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" Off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
