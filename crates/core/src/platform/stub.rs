use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};

use crate::types::*;
use crate::logger;
use super::{Platform, WindowHandle};

pub const STUB_WINDOW_ID: WindowId = 30001;

type ClickHook = Box<dyn FnMut(&mut Capture, i32, i32) + Send>;

struct StubState {
    region: Option<Region>,
    canvas: Capture,
    clicks: Vec<(i32, i32)>,
    captures: u32,
    activations: u32,
    failing_captures: u32,
    on_click: Option<ClickHook>,
}

/// Scriptable in-memory screen. Clones share the same state, so a test can
/// keep one handle to paint and inspect while the engine owns the window.
#[derive(Clone)]
pub struct StubScreen {
    state: Arc<Mutex<StubState>>,
}

impl StubScreen {
    /// A black `w`x`h` window at the screen origin.
    pub fn new(w: u32, h: u32) -> Self {
        Self::at(0, 0, w, h)
    }

    pub fn at(l: i32, t: i32, w: u32, h: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState {
                region: Some(Region::from_ltwh(l, t, w as i32, h as i32)),
                canvas: Capture::blank(w, h),
                clicks: Vec::new(),
                captures: 0,
                activations: 0,
                failing_captures: 0,
                on_click: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Simulate the window vanishing (None) or reappearing.
    pub fn set_region(&self, region: Option<Region>) {
        self.lock().region = region;
    }

    /// Paint one window-relative pixel.
    pub fn paint(&self, x: i32, y: i32, color: Rgb) {
        self.lock().canvas.set_pixel(x, y, color);
    }

    pub fn fill_rect(&self, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
        let mut s = self.lock();
        for yy in y..y + h {
            for xx in x..x + w {
                s.canvas.set_pixel(xx, yy, color);
            }
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        self.lock().canvas.pixel(x, y)
    }

    /// Absolute screen points of every click received so far.
    pub fn clicks(&self) -> Vec<(i32, i32)> {
        self.lock().clicks.clone()
    }

    pub fn capture_count(&self) -> u32 {
        self.lock().captures
    }

    pub fn activations(&self) -> u32 {
        self.lock().activations
    }

    /// Make the next `n` captures fail.
    pub fn fail_next_captures(&self, n: u32) {
        self.lock().failing_captures = n;
    }

    /// Run `hook(canvas, x, y)` on every click; (x, y) is window-relative.
    pub fn on_click<F>(&self, hook: F)
    where
        F: FnMut(&mut Capture, i32, i32) + Send + 'static,
    {
        self.lock().on_click = Some(Box::new(hook));
    }

    pub fn window(&self) -> Box<dyn WindowHandle> {
        Box::new(StubWindow {
            screen: self.clone(),
            title: format!("Stub-{}", STUB_WINDOW_ID),
            region: self.lock().region,
        })
    }
}

pub struct StubPlatform {
    screen: StubScreen,
}

impl StubPlatform {
    pub fn new(screen: StubScreen) -> Self {
        Self { screen }
    }
}

impl Platform for StubPlatform {
    fn list_windows(&self) -> Vec<(WindowId, String)> {
        if self.screen.lock().region.is_some() {
            vec![(STUB_WINDOW_ID, "BlueStacks App Player".into())]
        } else {
            Vec::new()
        }
    }

    fn create_window(&self, window_id: WindowId) -> Box<dyn WindowHandle> {
        logger::debug_p("stub", &format!("create_window({})", window_id));
        self.screen.window()
    }
}

struct StubWindow {
    screen: StubScreen,
    title: String,
    region: Option<Region>,
}

impl WindowHandle for StubWindow {
    fn id(&self) -> WindowId { STUB_WINDOW_ID }
    fn title(&self) -> &str { &self.title }
    fn region(&self) -> Option<Region> { self.region }

    fn update(&mut self) {
        self.region = self.screen.lock().region;
    }

    fn activate(&mut self) {
        logger::debug_p("stub", "activate()");
        self.screen.lock().activations += 1;
    }

    fn click_at(&mut self, x: i32, y: i32) -> Result<()> {
        logger::debug_p("stub", &format!("click_at({}, {})", x, y));
        let mut s = self.screen.lock();
        let Some(region) = s.region else { bail!("stub window is gone") };
        s.clicks.push((x, y));
        if let Some(mut hook) = s.on_click.take() {
            hook(&mut s.canvas, x - region.l, y - region.t);
            s.on_click = Some(hook);
        }
        Ok(())
    }

    fn capture(&mut self) -> Result<Capture> {
        let mut s = self.screen.lock();
        s.captures += 1;
        if s.failing_captures > 0 {
            s.failing_captures -= 1;
            bail!("stub capture failure");
        }
        if s.region.is_none() {
            bail!("stub window is gone");
        }
        Ok(s.canvas.clone())
    }
}
