use crate::types::{Capture, Rgb};

/// Euclidean distance between black and white in RGB space (~441.67).
pub fn max_distance() -> f64 {
    (3.0 * 255.0f64 * 255.0).sqrt()
}

pub fn distance(a: Rgb, b: Rgb) -> f64 {
    let dr = a.r as f64 - b.r as f64;
    let dg = a.g as f64 - b.g as f64;
    let db = a.b as f64 - b.b as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

pub fn exact(found: Rgb, expected: Rgb) -> bool {
    found == expected
}

/// Passes when `distance <= (1 - confidence) * max_distance`.
/// A confidence of 1.0 (or above) is an exact match.
pub fn within_confidence(found: Rgb, expected: Rgb, confidence: f64) -> bool {
    if confidence >= 1.0 {
        return exact(found, expected);
    }
    let threshold = (1.0 - confidence.max(0.0)) * max_distance();
    distance(found, expected) <= threshold
}

/// How a color is read out of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sampling {
    /// The single pixel under the point.
    #[default]
    Point,
    /// Per-channel median of the square of the given half-size around the point.
    Region(u32),
}

pub fn sample(capture: &Capture, x: i32, y: i32, sampling: Sampling) -> Option<Rgb> {
    match sampling {
        Sampling::Point => capture.pixel(x, y),
        Sampling::Region(half) => region_median(capture, x, y, half),
    }
}

/// Per-channel median over the clamped square window around (cx, cy).
pub fn region_median(capture: &Capture, cx: i32, cy: i32, half: u32) -> Option<Rgb> {
    if capture.width == 0 || capture.height == 0 {
        return None;
    }
    // no window needs more than the capture's larger side
    let half = half.min(capture.width.max(capture.height)) as i32;
    let max_x = capture.width as i32 - 1;
    let max_y = capture.height as i32 - 1;
    if cx < 0 || cy < 0 || cx > max_x || cy > max_y {
        return None;
    }
    let (x1, x2) = ((cx - half).max(0), (cx + half).min(max_x));
    let (y1, y2) = ((cy - half).max(0), (cy + half).min(max_y));

    let n = ((x2 - x1 + 1) * (y2 - y1 + 1)) as usize;
    let (mut rs, mut gs, mut bs) = (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
    for y in y1..=y2 {
        for x in x1..=x2 {
            let c = capture.pixel(x, y)?;
            rs.push(c.r);
            gs.push(c.g);
            bs.push(c.b);
        }
    }
    Some(Rgb::new(median(&mut rs)?, median(&mut gs)?, median(&mut bs)?))
}

// Even counts average the two middle values, truncating.
fn median(values: &mut [u8]) -> Option<u8> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        ((values[mid - 1] as u16 + values[mid] as u16) / 2) as u8
    } else {
        values[mid]
    })
}
