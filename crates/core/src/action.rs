use std::time::Duration;

use crate::color::Sampling;
use crate::frame::Screen;
use crate::logger;
use crate::settings::Clicks;
use crate::sleep::{jitter, sleep_ms};
use crate::types::{Point, Rgb};

/// Whether a watched color should show up or go away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Appear,
    Disappear,
}

impl ColorMode {
    /// Map a raw color match to "condition met".
    pub fn holds(self, matched: bool) -> bool {
        match self {
            ColorMode::Appear => matched,
            ColorMode::Disappear => !matched,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::Appear => "appear",
            ColorMode::Disappear => "disappear",
        }
    }
}

/// A color expected to appear or disappear at a reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorWatch {
    pub point: Point,
    pub color: Rgb,
    pub mode: ColorMode,
    /// None uses the configured default.
    pub confidence: Option<f64>,
    pub sampling: Sampling,
}

impl ColorWatch {
    pub fn appear(x: i32, y: i32, color: Rgb) -> Self {
        Self {
            point: Point::new(x, y),
            color,
            mode: ColorMode::Appear,
            confidence: None,
            sampling: Sampling::Point,
        }
    }

    pub fn disappear(x: i32, y: i32, color: Rgb) -> Self {
        Self { mode: ColorMode::Disappear, ..Self::appear(x, y, color) }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }
}

/// Clicks at reference points with jitter, grace delay and dry-run.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    jitter_radius: i32,
    grace: Duration,
    dry_run: bool,
}

impl ActionExecutor {
    pub fn new(jitter_radius: i32, grace: Duration, dry_run: bool) -> Self {
        Self { jitter_radius, grace, dry_run }
    }

    pub fn from_config(clicks: &Clicks, dry_run: bool) -> Self {
        Self::new(clicks.jitter_radius_px, Duration::from_millis(clicks.post_click_grace_ms), dry_run)
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn set_dry_run(&mut self, on: bool) {
        self.dry_run = on;
    }

    /// Click without the grace delay. Returns false when the window is
    /// missing or the OS refused the click; dry-run reports success.
    pub fn press(&self, screen: &mut Screen, x: i32, y: i32, label: &str) -> bool {
        let (jx, jy) = jitter(x, y, self.jitter_radius);
        let Some((ax, ay)) = screen.absolute(jx, jy) else {
            logger::info_p("act", &format!("{} ignored: window not found", label));
            return false;
        };
        logger::debug_p("act", &format!("{} at ({}, {}) (base {},{})", label, ax, ay, jx, jy));
        if self.dry_run {
            logger::info_p("act", &format!("[DRY-RUN] {} at ({}, {})", label, ax, ay));
            return true;
        }
        match screen.click_at(ax, ay) {
            Ok(()) => true,
            Err(e) => {
                logger::warn_p("act", &format!("{} failed: {}", label, e));
                false
            }
        }
    }

    /// Click, then sleep the grace delay so the target can start responding.
    pub fn click(&self, screen: &mut Screen, x: i32, y: i32, label: &str) -> bool {
        let ok = self.press(screen, x, y, label);
        if ok && !self.dry_run {
            sleep_ms(self.grace.as_millis() as u64);
        }
        ok
    }
}
