use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::logger;
use crate::types::{Capture, Rgb};

/// Window-relative rectangle to outline: (x, y, w, h).
pub type Rect = (i32, i32, i32, i32);

/// 20x20 box centred on a window-relative point.
pub fn box_around(x: i32, y: i32) -> Rect {
    (x - 10, y - 10, 20, 20)
}

pub fn artifact_path(dir: &Path, label: &str, unix_ms: u128) -> PathBuf {
    let label: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    dir.join(format!("artifact_{}_{}.png", label, unix_ms))
}

fn unix_ms() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Save `capture` with outlined rectangles under `dir`. Returns the written path.
#[cfg(feature = "debug-capture")]
pub fn save(dir: &Path, label: &str, capture: &Capture, rects: &[Rect], color: Rgb, thickness: u32) -> Result<Option<PathBuf>> {
    use image::{Rgba, RgbaImage};

    let mut img = RgbaImage::new(capture.width, capture.height);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let c = capture.pixel(x as i32, y as i32).unwrap_or(Rgb::BLACK);
        *px = Rgba([c.r, c.g, c.b, 255]);
    }

    let (w, h) = (capture.width as i32, capture.height as i32);
    let col = Rgba([color.r, color.g, color.b, 255]);
    let t = thickness.max(1) as i32;
    let mut put = |x: i32, y: i32| {
        if x >= 0 && y >= 0 && x < w && y < h {
            img.put_pixel(x as u32, y as u32, col);
        }
    };
    for &(rx, ry, rw, rh) in rects {
        let (x2, y2) = (rx + rw - 1, ry + rh - 1);
        for i in 0..t {
            for x in rx..=x2 {
                put(x, ry + i);
                put(x, y2 - i);
            }
            for y in ry..=y2 {
                put(rx + i, y);
                put(x2 - i, y);
            }
        }
    }

    std::fs::create_dir_all(dir)?;
    let path = artifact_path(dir, label, unix_ms());
    img.save(&path)?;
    logger::info(&format!("saved failure artifact {}", path.display()));
    Ok(Some(path))
}

#[cfg(not(feature = "debug-capture"))]
pub fn save(_dir: &Path, label: &str, _capture: &Capture, _rects: &[Rect], _color: Rgb, _thickness: u32) -> Result<Option<PathBuf>> {
    logger::debug(&format!("artifact '{}' skipped, built without debug-capture", label));
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_uses_label_and_timestamp() {
        let p = artifact_path(Path::new("logs"), "wait_visible:back button", 1700000000123);
        assert_eq!(p, Path::new("logs/artifact_wait_visible_back_button_1700000000123.png"));
    }

    #[cfg(feature = "debug-capture")]
    #[test]
    fn saved_png_has_outline() {
        let dir = tempfile::tempdir().unwrap();
        let cap = Capture::blank(64, 64);
        let orange = Rgb::new(255, 165, 0);
        let path = save(dir.path(), "probe", &cap, &[box_around(32, 32)], orange, 2)
            .unwrap()
            .unwrap();
        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (64, 64));
        assert_eq!(img.get_pixel(22, 22).0, [255, 165, 0, 255]);
        assert_eq!(img.get_pixel(32, 32).0, [0, 0, 0, 255]);
    }
}
