pub mod stub;
pub mod hotkey;

#[cfg(target_os = "macos")]
pub mod darwin;

#[cfg(target_os = "windows")]
pub mod win32;

use anyhow::Result;
use regex::Regex;

use crate::types::*;
use crate::logger;

/// Handle to a specific OS window, providing automation ops.
pub trait WindowHandle: Send {
    fn id(&self) -> WindowId;
    fn title(&self) -> &str;
    /// Client area in screen coordinates, as of the last `update()`.
    fn region(&self) -> Option<Region>;
    /// Re-query geometry from the OS. Clears the region if the window is gone.
    fn update(&mut self);
    fn activate(&mut self);
    /// Left click at an absolute screen point.
    fn click_at(&mut self, x: i32, y: i32) -> Result<()>;
    /// Grab the screen composite at the window's current bounds (BGRA).
    fn capture(&mut self) -> Result<Capture>;
}

/// How to pick the target window among all top-level windows.
#[derive(Debug, Clone, Default)]
pub struct WindowQuery {
    /// Preferred exact title.
    pub title: String,
    /// Regex fallback (case-insensitive unless the pattern says otherwise).
    pub pattern: String,
    /// Titles containing any of these (case-insensitive) are skipped by the fallback.
    pub exclude: Vec<String>,
}

/// Platform-level operations (window enumeration, factory).
pub trait Platform: Send {
    fn list_windows(&self) -> Vec<(WindowId, String)>;
    fn create_window(&self, window_id: WindowId) -> Box<dyn WindowHandle>;

    fn find_window(&self, query: &WindowQuery) -> Option<(WindowId, String)> {
        select_window(&self.list_windows(), query)
    }
}

/// Exact title match wins; otherwise the first pattern match whose title
/// contains none of the excluded keywords.
pub fn select_window(windows: &[(WindowId, String)], query: &WindowQuery) -> Option<(WindowId, String)> {
    if !query.title.is_empty() {
        if let Some(w) = windows.iter().find(|(_, t)| t.trim() == query.title.trim()) {
            return Some(w.clone());
        }
    }
    if query.pattern.is_empty() {
        return None;
    }
    let re = match Regex::new(&query.pattern) {
        Ok(r) => r,
        Err(e) => {
            logger::error(&format!("invalid window pattern '{}': {}", query.pattern, e));
            return None;
        }
    };
    let excluded = |title: &str| {
        let lower = title.to_lowercase();
        query.exclude.iter().any(|k| lower.contains(&k.to_lowercase()))
    };
    windows
        .iter()
        .find(|(_, t)| re.is_match(t) && !excluded(t))
        .cloned()
}

/// Create the platform appropriate for the current OS.
pub fn create_platform(force_stub: bool) -> Box<dyn Platform> {
    if force_stub {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        return Box::new(stub::StubPlatform::new(stub::StubScreen::new(1920, 1080)));
    }
    #[cfg(target_os = "macos")]
    {
        logger::register_prefix("darwin", logger::COLOR_GRAY);
        return Box::new(darwin::DarwinPlatform::new());
    }
    #[cfg(target_os = "windows")]
    {
        logger::register_prefix("win32", logger::COLOR_GRAY);
        return Box::new(win32::Win32Platform);
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        logger::warn("no native platform on this OS, using stub");
        logger::register_prefix("stub", logger::COLOR_GRAY);
        Box::new(stub::StubPlatform::new(stub::StubScreen::new(1920, 1080)))
    }
}
