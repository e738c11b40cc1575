use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::coords::CoordinateMapper;
use crate::logger;
use crate::platform::WindowHandle;
use crate::types::*;

/// Immutable snapshot of the window's client area.
#[derive(Clone)]
pub struct Frame {
    pub capture: Arc<Capture>,
    pub captured_at: Instant,
    /// True when the window could not be captured and this is a blank stand-in.
    pub placeholder: bool,
}

impl Frame {
    fn placeholder(size: (i32, i32)) -> Self {
        Self {
            capture: Arc::new(Capture::blank(size.0.max(1) as u32, size.1.max(1) as u32)),
            captured_at: Instant::now(),
            placeholder: true,
        }
    }

    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

/// The target window as seen by the engine: geometry, coordinate mapping and
/// a short-lived frame cache. There is exactly one writer.
pub struct Screen {
    window: Option<Box<dyn WindowHandle>>,
    mapper: CoordinateMapper,
    max_age: Duration,
    cached: Option<Frame>,
}

impl Screen {
    pub fn new(window: Option<Box<dyn WindowHandle>>, mapper: CoordinateMapper, max_age: Duration) -> Self {
        let mut screen = Self { window, mapper, max_age, cached: None };
        screen.refresh();
        screen
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn title(&self) -> Option<&str> {
        self.window.as_ref().map(|w| w.title())
    }

    /// Re-query window geometry. None when there is no window or it is gone.
    pub fn refresh(&mut self) -> Option<Region> {
        let region = match self.window.as_mut() {
            Some(w) => {
                w.update();
                w.region()
            }
            None => None,
        };
        self.mapper.set_geometry(region);
        region
    }

    pub fn geometry(&self) -> Option<Region> {
        self.mapper.geometry()
    }

    pub fn activate(&mut self) {
        if let Some(w) = self.window.as_mut() {
            w.activate();
        }
    }

    /// Fresh capture of the client area.
    pub fn try_capture(&mut self) -> Result<Frame> {
        let Some(window) = self.window.as_mut() else {
            return Err(anyhow!("no target window"));
        };
        window.update();
        let region = window.region();
        self.mapper.set_geometry(region);
        if region.is_none() {
            return Err(anyhow!("window '{}' is gone", window.title()));
        }
        let capture = window.capture()?;
        let frame = Frame {
            capture: Arc::new(capture),
            captured_at: Instant::now(),
            placeholder: false,
        };
        self.cached = Some(frame.clone());
        Ok(frame)
    }

    /// Fresh capture, or a blank frame of the last known size if the window
    /// cannot be captured.
    pub fn capture(&mut self) -> Frame {
        match self.try_capture() {
            Ok(f) => f,
            Err(e) => {
                logger::debug_p("frame", &format!("capture failed: {}", e));
                self.cached = None;
                Frame::placeholder(self.mapper.size())
            }
        }
    }

    fn cached(&self) -> Option<Frame> {
        self.cached.as_ref().filter(|f| f.age() <= self.max_age).cloned()
    }

    /// Cached frame if it is younger than the max age, else a new capture.
    pub fn try_frame(&mut self, fresh: bool) -> Result<Frame> {
        match self.cached() {
            Some(f) if !fresh => Ok(f),
            _ => self.try_capture(),
        }
    }

    /// Soft variant of [`try_frame`](Screen::try_frame).
    pub fn frame(&mut self, fresh: bool) -> Frame {
        match self.cached() {
            Some(f) if !fresh => f,
            _ => self.capture(),
        }
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Reference point -> absolute screen point, refreshing geometry first.
    pub fn absolute(&mut self, x: i32, y: i32) -> Option<(i32, i32)> {
        self.refresh()?;
        self.mapper.absolute(x, y)
    }

    /// Left click at an absolute screen point.
    pub fn click_at(&mut self, x: i32, y: i32) -> Result<()> {
        let window = self.window.as_mut().ok_or_else(|| anyhow!("no target window"))?;
        window.click_at(x, y)?;
        // the screen is about to change
        self.cached = None;
        Ok(())
    }
}
