use std::ffi::c_void;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Result};
use core_foundation::array::CFArray;
use core_foundation::base::TCFType;
use core_foundation::dictionary::CFDictionary;
use core_foundation::number::CFNumber;
use core_foundation::string::CFString;
use core_graphics::event::*;
use core_graphics::event_source::*;
use core_graphics::geometry::*;
use core_graphics::window::*;

use crate::logger;
use crate::types::*;
use super::{Platform, WindowHandle};

pub struct DarwinPlatform;

impl DarwinPlatform {
    pub fn new() -> Self {
        DarwinPlatform
    }
}

/// One entry of the on-screen window list.
struct WindowInfo {
    id: i64,
    title: String,
    pid: Option<i32>,
    layer: Option<i64>,
    bounds: Option<Region>,
}

fn on_screen_windows() -> Vec<WindowInfo> {
    let mut out = Vec::new();
    unsafe {
        let option = kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements;
        let window_list_ref = CGWindowListCopyWindowInfo(option, kCGNullWindowID);
        if window_list_ref.is_null() {
            logger::warn_p("darwin", "failed to get window list");
            return out;
        }

        let list: CFArray = CFArray::wrap_under_create_rule(window_list_ref as _);
        for entry in &list.get_all_values() {
            let info = InfoDict(RawDict::wrap_under_get_rule(*entry as _));
            let Some(id) = info.number("kCGWindowNumber") else { continue };
            let title = info
                .string("kCGWindowName")
                .filter(|n| !n.is_empty())
                .or_else(|| info.string("kCGWindowOwnerName"))
                .unwrap_or_default();
            let bounds = info.dict("kCGWindowBounds").map(|b| {
                let n = |k: &str| b.number(k).unwrap_or(0) as i32;
                Region::from_ltwh(n("X"), n("Y"), n("Width"), n("Height"))
            });
            out.push(WindowInfo {
                id,
                title,
                pid: info.number("kCGWindowOwnerPID").map(|v| v as i32),
                layer: info.number("kCGWindowLayer"),
                bounds,
            });
        }
    }
    out
}

impl Platform for DarwinPlatform {
    fn list_windows(&self) -> Vec<(WindowId, String)> {
        on_screen_windows()
            .into_iter()
            .filter(|w| w.layer == Some(0) && !w.title.is_empty())
            .map(|w| (w.id as WindowId, w.title))
            .collect()
    }

    fn create_window(&self, window_id: WindowId) -> Box<dyn WindowHandle> {
        let mut win = DarwinWindow {
            window_id: window_id as CGWindowID,
            title: String::new(),
            pid: None,
            region: None,
        };
        win.do_update();
        logger::info_p("darwin", &format!("bound window \"{}\" (id: {})", win.title, window_id));
        Box::new(win)
    }
}

struct DarwinWindow {
    window_id: CGWindowID,
    title: String,
    pid: Option<i32>,
    region: Option<Region>,
}

impl DarwinWindow {
    fn do_update(&mut self) {
        match on_screen_windows().into_iter().find(|w| w.id == self.window_id as i64) {
            Some(w) => {
                self.title = w.title;
                self.pid = w.pid;
                self.region = w.bounds;
            }
            None => self.region = None,
        }
    }
}

impl WindowHandle for DarwinWindow {
    fn id(&self) -> WindowId {
        self.window_id as WindowId
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn region(&self) -> Option<Region> {
        self.region
    }

    fn update(&mut self) {
        self.do_update();
    }

    fn activate(&mut self) {
        if self.pid.is_none() {
            self.do_update();
        }
        let Some(pid) = self.pid else { return };
        let script = format!(
            "tell application \"System Events\" to set frontmost of first process whose unix id is {}",
            pid
        ) + " to true";
        let status = Command::new("osascript")
            .args(["-e", &script])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = status {
            logger::debug_p("darwin", &format!("activate failed: {}", e));
        }
    }

    fn click_at(&mut self, x: i32, y: i32) -> Result<()> {
        let point = CGPoint::new(x as f64, y as f64);
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| anyhow!("failed to create event source"))?;

        for kind in [CGEventType::LeftMouseDown, CGEventType::LeftMouseUp] {
            let event = CGEvent::new_mouse_event(source.clone(), kind, point, CGMouseButton::Left)
                .map_err(|_| anyhow!("failed to create mouse event"))?;
            event.post(CGEventTapLocation::HID);
            std::thread::sleep(std::time::Duration::from_millis(15));
        }
        Ok(())
    }

    fn capture(&mut self) -> Result<Capture> {
        self.do_update();
        let region = self.region.ok_or_else(|| anyhow!("window {} not on screen", self.window_id))?;

        // Composite of everything on screen inside the window bounds.
        let cg_rect = CGRect::new(
            &CGPoint::new(region.l as f64, region.t as f64),
            &CGSize::new(region.w as f64, region.h as f64),
        );
        let image_option = kCGWindowImageBoundsIgnoreFraming | kCGWindowImageNominalResolution;
        let image = create_image(cg_rect, kCGWindowListOptionOnScreenOnly, kCGNullWindowID, image_option)
            .ok_or_else(|| anyhow!("screen capture failed (screen recording permission?)"))?;

        let bpr = image.bytes_per_row() as u32;
        let cf_data = image.data();

        Ok(Capture {
            data: cf_data.bytes().to_vec(),
            width: (image.width() as u32).min(bpr / 4),
            height: image.height() as u32,
            bytes_per_row: bpr,
        })
    }
}

type RawDict = CFDictionary<CFString, *const c_void>;

/// Typed reads from one window-info dictionary.
struct InfoDict(RawDict);

impl InfoDict {
    fn raw(&self, key: &str) -> Option<*const c_void> {
        self.0.find(&CFString::new(key)).map(|v| *v)
    }

    fn string(&self, key: &str) -> Option<String> {
        let v = self.raw(key)?;
        Some(unsafe { CFString::wrap_under_get_rule(v as _) }.to_string())
    }

    fn number(&self, key: &str) -> Option<i64> {
        let v = self.raw(key)?;
        unsafe { CFNumber::wrap_under_get_rule(v as _) }.to_i64()
    }

    fn dict(&self, key: &str) -> Option<InfoDict> {
        let v = self.raw(key)?;
        Some(InfoDict(unsafe { RawDict::wrap_under_get_rule(v as _) }))
    }
}
