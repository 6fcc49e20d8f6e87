use std::collections::HashMap;

use crate::{
    config::{AnimationOpts, OutlineStyle},
    foundation::core::Rect,
    render::{
        animation::{ActiveOutline, OutlineSet},
        surface::{OverlaySurface, clear_pixmap},
    },
};

/// Text and placement of a label shared by every outline drawn at the same rect.
#[derive(Clone, Debug, PartialEq)]
pub struct OutlineLabel {
    pub text: String,
    /// Plate rect in logical pixels, clamped into the surface.
    pub plate: Rect,
    pub alpha: f64,
    pub did_commit: bool,
}

impl OutlineStyle {
    pub fn rgb_for(&self, did_commit: bool) -> [u8; 3] {
        if did_commit {
            self.committed_rgb
        } else {
            self.uncommitted_rgb
        }
    }
}

/// Group outlines by their drawn rect and build one label per group.
pub fn build_labels(
    outlines: &OutlineSet,
    bounds: Rect,
    anim: &AnimationOpts,
    style: &OutlineStyle,
) -> Vec<OutlineLabel> {
    let mut groups: Vec<(Rect, Vec<&ActiveOutline>)> = Vec::new();
    let mut by_rect: HashMap<[u64; 4], usize> = HashMap::new();
    for o in outlines.iter() {
        if o.rect.is_empty() || anim.fade.fade_alpha(o.frame, anim.max_frames) <= 0.0 {
            continue;
        }
        let key = [
            o.rect.x.to_bits(),
            o.rect.y.to_bits(),
            o.rect.width.to_bits(),
            o.rect.height.to_bits(),
        ];
        match by_rect.get(&key) {
            Some(&i) => groups[i].1.push(o),
            None => {
                by_rect.insert(key, groups.len());
                groups.push((o.rect, vec![o]));
            }
        }
    }

    groups
        .into_iter()
        .map(|(rect, members)| {
            let text = label_text(&members, style.max_label_chars);
            let alpha = members
                .iter()
                .map(|o| anim.fade.fade_alpha(o.frame, anim.max_frames))
                .fold(0.0, f64::max);
            let did_commit = members.iter().any(|o| o.did_commit);
            OutlineLabel {
                plate: plate_rect(rect, &text, bounds, style),
                text,
                alpha,
                did_commit,
            }
        })
        .collect()
}

/// `Name ×count` per distinct name in first-seen order, joined by `, `.
fn label_text(members: &[&ActiveOutline], max_chars: usize) -> String {
    let mut names: Vec<(&str, u64)> = Vec::new();
    for o in members {
        match names.iter_mut().find(|(n, _)| *n == o.name) {
            Some((_, count)) => *count += u64::from(o.count),
            None => names.push((o.name.as_str(), u64::from(o.count))),
        }
    }

    let text = names
        .iter()
        .map(|(name, count)| {
            if *count > 1 {
                format!("{name} ×{count}")
            } else {
                (*name).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    if text.chars().count() <= max_chars {
        return text;
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn plate_rect(rect: Rect, text: &str, bounds: Rect, style: &OutlineStyle) -> Rect {
    let width = text.chars().count() as f64 * style.label_char_width + 4.0;
    let height = style.label_height;
    let mut x = rect.x;
    let mut y = rect.y - height;
    if y < bounds.y {
        y = rect.y;
    }
    if x + width > bounds.right() {
        x = bounds.right() - width;
    }
    if x < bounds.x {
        x = bounds.x;
    }
    Rect::new(x, y, width, height)
}

/// Inner stroke of `rect` as four filled bands.
fn stroke_bands(rect: Rect, width: f64) -> Vec<Rect> {
    if rect.width <= width * 2.0 || rect.height <= width * 2.0 {
        return vec![rect];
    }
    vec![
        Rect::new(rect.x, rect.y, rect.width, width),
        Rect::new(rect.x, rect.bottom() - width, rect.width, width),
        Rect::new(rect.x, rect.y + width, width, rect.height - width * 2.0),
        Rect::new(rect.right() - width, rect.y + width, width, rect.height - width * 2.0),
    ]
}

fn paint_color(rgb: [u8; 3], alpha: f64) -> vello_cpu::peniko::Color {
    let a = (alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    vello_cpu::peniko::Color::from_rgba8(rgb[0], rgb[1], rgb[2], a)
}

fn to_cpu_rect(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x, r.y, r.right(), r.bottom())
}

/// Redraw the full surface from `outlines`.
pub(crate) fn paint_outlines(
    surface: &mut OverlaySurface,
    outlines: &OutlineSet,
    anim: &AnimationOpts,
    style: &OutlineStyle,
) {
    if outlines.is_empty() {
        clear_pixmap(surface.pixmap_mut());
        return;
    }

    let (w, h) = surface.physical_size();
    let bounds = surface.size().bounds();
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_transform(surface.transform());

    for o in outlines.iter() {
        let alpha = anim.fade.fade_alpha(o.frame, anim.max_frames);
        if alpha <= 0.0 || o.rect.is_empty() {
            continue;
        }
        let rgb = style.rgb_for(o.did_commit);
        ctx.set_paint(paint_color(rgb, alpha * style.fill_alpha));
        ctx.fill_rect(&to_cpu_rect(o.rect));
        ctx.set_paint(paint_color(rgb, alpha));
        for band in stroke_bands(o.rect, style.stroke_width) {
            ctx.fill_rect(&to_cpu_rect(band));
        }
    }

    for label in build_labels(outlines, bounds, anim, style) {
        ctx.set_paint(paint_color(style.rgb_for(label.did_commit), label.alpha));
        ctx.fill_rect(&to_cpu_rect(label.plate));
    }

    ctx.flush();
    let pixmap = surface.pixmap_mut();
    clear_pixmap(pixmap);
    ctx.render_to_pixmap(pixmap);
}
