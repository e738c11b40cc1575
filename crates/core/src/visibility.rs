use anyhow::Result;

use crate::color::{self, Sampling};
use crate::coords::CoordinateMapper;
use crate::elements::{Anchor, Element, VisibilityCheck};
use crate::frame::Screen;
use crate::logger;
use crate::types::*;

/// Options for one visibility evaluation.
#[derive(Debug, Clone, Copy)]
pub struct CheckOptions {
    pub confidence: f64,
    pub sampling: Sampling,
    pub verbose: bool,
}

/// AND over all anchors against a single capture. Short-circuits on the
/// first failing anchor.
pub fn anchors_match(
    capture: &Capture,
    mapper: &CoordinateMapper,
    name: &str,
    anchors: &[Anchor],
    opts: CheckOptions,
) -> bool {
    if anchors.is_empty() {
        return false;
    }
    for (i, anchor) in anchors.iter().enumerate() {
        let (sx, sy) = mapper.scaled_point(anchor.point);
        let found = color::sample(capture, sx, sy, opts.sampling);
        let ok = found.is_some_and(|c| color::within_confidence(c, anchor.color, opts.confidence));
        if opts.verbose {
            let seen = found.map_or_else(|| "out of frame".to_string(), |c| c.to_string());
            logger::debug_p(
                "vis",
                &format!(
                    "{}[{}] ({},{}) -> ({},{}) expected {} found {} conf {:.2} {}",
                    name, i, anchor.point.x, anchor.point.y, sx, sy,
                    anchor.color, seen, opts.confidence,
                    if ok { "PASS" } else { "FAIL" },
                ),
            );
        }
        if !ok {
            return false;
        }
    }
    true
}

/// Evaluate an element against the current frame. Errors only when the frame
/// cannot be captured; an absent window is simply not visible.
pub fn try_visible(screen: &mut Screen, element: &Element, opts: CheckOptions) -> Result<bool> {
    let anchors = match &element.check {
        Some(VisibilityCheck::PixelAnchors(a)) => a,
        Some(VisibilityCheck::Template(t)) => {
            logger::debug_p("vis", &format!("{}: template check '{}' not supported", element.name, t.path));
            return Ok(false);
        }
        None => return Ok(false),
    };
    if screen.geometry().is_none() && screen.refresh().is_none() {
        return Ok(false);
    }
    // one frame for every anchor of this evaluation
    let frame = screen.try_frame(false)?;
    Ok(anchors_match(&frame.capture, screen.mapper(), &element.name, anchors, opts))
}

/// Soft variant: capture problems count as "not visible".
pub fn is_visible(screen: &mut Screen, element: &Element, opts: CheckOptions) -> bool {
    try_visible(screen, element, opts).unwrap_or_else(|e| {
        logger::debug_p("vis", &format!("{}: {}", element.name, e));
        false
    })
}

/// Ad hoc single-anchor check at a reference point.
pub fn try_color_at(screen: &mut Screen, x: i32, y: i32, expected: Rgb, opts: CheckOptions) -> Result<bool> {
    if screen.geometry().is_none() && screen.refresh().is_none() {
        return Ok(false);
    }
    let frame = screen.try_frame(false)?;
    let anchor = Anchor::new(x, y, expected);
    Ok(anchors_match(&frame.capture, screen.mapper(), "color_at", &[anchor], opts))
}
