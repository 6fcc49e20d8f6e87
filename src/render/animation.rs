use std::collections::HashMap;

use crate::{config::AnimationOpts, foundation::core::Rect, outline::model::FinalizedOutline};

/// An outline currently on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveOutline {
    pub id: u64,
    pub name: String,
    /// Interpolated position.
    pub rect: Rect,
    /// Latest received position.
    pub target: Rect,
    /// Frames elapsed since the last update.
    pub frame: u32,
    /// Render count: the first arrival's count, plus one per re-arrival. Never reset while the
    /// entry lives.
    pub count: u32,
    pub did_commit: bool,
}

impl ActiveOutline {
    fn from_outline(o: &FinalizedOutline) -> Self {
        Self {
            id: o.id,
            name: o.name.clone(),
            rect: o.rect,
            target: o.rect,
            frame: 0,
            count: o.count,
            did_commit: o.did_commit,
        }
    }

    fn retrigger(&mut self, o: &FinalizedOutline) {
        self.name.clone_from(&o.name);
        self.target = o.rect;
        self.did_commit = o.did_commit;
        self.count = self.count.saturating_add(1);
        self.frame = 0;
    }

    pub fn is_settled(&self) -> bool {
        self.rect == self.target
    }
}

/// Animation state keyed by outline id, in first-arrival order.
#[derive(Debug, Default)]
pub struct OutlineSet {
    entries: Vec<ActiveOutline>,
    index: HashMap<u64, usize>,
}

impl OutlineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&ActiveOutline> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveOutline> {
        self.entries.iter()
    }

    /// New ids start fresh at frame 0; known ids retarget and restart their fade.
    pub fn merge(&mut self, outlines: &[FinalizedOutline]) {
        for o in outlines {
            match self.index.get(&o.id) {
                Some(&i) => self.entries[i].retrigger(o),
                None => {
                    self.index.insert(o.id, self.entries.len());
                    self.entries.push(ActiveOutline::from_outline(o));
                }
            }
        }
    }

    /// Shift current and target positions of every entry.
    pub fn scroll(&mut self, dx: f64, dy: f64) {
        for e in &mut self.entries {
            e.rect = e.rect.translate(dx, dy);
            e.target = e.target.translate(dx, dy);
        }
    }

    /// Advance one animation frame: ease toward targets, age entries, drop expired ones.
    ///
    /// Returns `true` while any entry remains.
    pub fn step(&mut self, opts: &AnimationOpts) -> bool {
        for e in &mut self.entries {
            e.rect = approach_rect(e.rect, e.target, opts.approach, opts.snap_epsilon);
            e.frame = e.frame.saturating_add(1);
        }

        let before = self.entries.len();
        self.entries.retain(|e| e.frame <= opts.max_frames);
        if self.entries.len() != before {
            self.reindex();
        }
        !self.entries.is_empty()
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, e) in self.entries.iter().enumerate() {
            self.index.insert(e.id, i);
        }
    }
}

/// Move `current` a fraction `t` toward `target`, snapping once within `epsilon`.
///
/// With `t` in `(0, 1]` the value never passes the target.
pub fn approach(current: f64, target: f64, t: f64, epsilon: f64) -> f64 {
    let next = current + (target - current) * t;
    if (target - next).abs() <= epsilon {
        target
    } else {
        next
    }
}

fn approach_rect(current: Rect, target: Rect, t: f64, epsilon: f64) -> Rect {
    Rect {
        x: approach(current.x, target.x, t, epsilon),
        y: approach(current.y, target.y, t, epsilon),
        width: approach(current.width, target.width, t, epsilon),
        height: approach(current.height, target.height, t, epsilon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(id: u64, count: u32, rect: Rect) -> FinalizedOutline {
        FinalizedOutline {
            id,
            name: format!("C{id}"),
            count,
            rect,
            did_commit: true,
        }
    }

    #[test]
    fn approach_converges_exactly_without_overshoot() {
        let mut v = 0.0;
        let mut steps = 0;
        while v != 100.0 {
            let next = approach(v, 100.0, 0.2, 0.5);
            assert!(next > v && next <= 100.0);
            v = next;
            steps += 1;
            assert!(steps < 100, "did not converge");
        }

        let mut down = 50.0;
        for _ in 0..100 {
            down = approach(down, -10.0, 0.2, 0.5);
            assert!(down >= -10.0);
        }
        assert_eq!(down, -10.0);
    }

    #[test]
    fn new_entries_start_at_target() {
        let mut set = OutlineSet::new();
        set.merge(&[outline(1, 2, Rect::new(1.0, 2.0, 3.0, 4.0))]);
        let e = set.get(1).unwrap();
        assert_eq!(e.frame, 0);
        assert_eq!(e.count, 2);
        assert!(e.is_settled());
    }

    #[test]
    fn rearrival_retargets_and_bumps_count_by_one() {
        let opts = AnimationOpts::default();
        let mut set = OutlineSet::new();
        set.merge(&[outline(7, 1, Rect::new(0.0, 0.0, 10.0, 10.0))]);
        for _ in 0..5 {
            set.step(&opts);
        }
        assert_eq!(set.get(7).unwrap().frame, 5);

        let mut update = outline(7, 3, Rect::new(100.0, 0.0, 10.0, 10.0));
        update.did_commit = false;
        set.merge(&[update]);

        let e = set.get(7).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(e.frame, 0);
        assert_eq!(e.count, 2);
        assert!(!e.did_commit);
        assert_eq!(e.rect.x, 0.0);
        assert_eq!(e.target.x, 100.0);

        set.step(&opts);
        let x = set.get(7).unwrap().rect.x;
        assert!(x > 0.0 && x < 100.0);
    }

    #[test]
    fn entries_expire_after_max_frames() {
        let opts = AnimationOpts {
            max_frames: 3,
            ..AnimationOpts::default()
        };
        let mut set = OutlineSet::new();
        set.merge(&[outline(1, 1, Rect::new(0.0, 0.0, 1.0, 1.0))]);
        assert!(set.step(&opts));
        assert!(set.step(&opts));
        set.merge(&[outline(2, 1, Rect::new(5.0, 5.0, 1.0, 1.0))]);
        assert!(set.step(&opts));
        assert!(set.step(&opts));
        assert!(set.get(1).is_none());
        assert_eq!(set.get(2).unwrap().frame, 2);
        assert!(set.step(&opts));
        assert!(!set.step(&opts));
        assert!(set.is_empty());
    }

    #[test]
    fn scroll_shifts_current_and_target() {
        let mut set = OutlineSet::new();
        set.merge(&[outline(1, 1, Rect::new(10.0, 10.0, 5.0, 5.0))]);
        set.merge(&[outline(1, 1, Rect::new(20.0, 10.0, 5.0, 5.0))]);
        set.scroll(0.0, -4.0);
        let e = set.get(1).unwrap();
        assert_eq!(e.rect, Rect::new(10.0, 6.0, 5.0, 5.0));
        assert_eq!(e.target, Rect::new(20.0, 6.0, 5.0, 5.0));
    }
}
