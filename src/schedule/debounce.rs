use std::time::{Duration, Instant};

/// Trailing-edge debounce: a value is released once no newer value arrived for `window`.
#[derive(Debug)]
pub struct Debounce<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replace the pending value and restart the quiet window.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let (_, at) = self.pending.as_ref()?;
        if now.saturating_duration_since(*at) < self.window {
            return None;
        }
        self.pending.take().map(|(v, _)| v)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Accumulates scroll deltas and releases the net delta at most once per `interval`.
#[derive(Debug)]
pub struct DeltaThrottle {
    interval: Duration,
    dx: f64,
    dy: f64,
    dirty: bool,
    last_emit: Option<Instant>,
}

impl DeltaThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            dx: 0.0,
            dy: 0.0,
            dirty: false,
            last_emit: None,
        }
    }

    pub fn push(&mut self, dx: f64, dy: f64) {
        self.dx += dx;
        self.dy += dy;
        self.dirty = true;
    }

    pub fn poll(&mut self, now: Instant) -> Option<(f64, f64)> {
        if !self.dirty {
            return None;
        }
        if let Some(last) = self.last_emit
            && now.saturating_duration_since(last) < self.interval
        {
            return None;
        }
        self.last_emit = Some(now);
        self.dirty = false;
        let out = (self.dx, self.dy);
        self.dx = 0.0;
        self.dy = 0.0;
        Some(out)
    }
}
