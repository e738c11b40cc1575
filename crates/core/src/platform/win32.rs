use std::ffi::c_void;
use std::mem::size_of;

use anyhow::{anyhow, bail, Result};
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, POINT, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, ClientToScreen, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject,
    GetDC, GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
    DIB_RGB_COLORS, SRCCOPY,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEINPUT, MOUSE_EVENT_FLAGS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClientRect, GetWindowTextW, IsWindow, IsWindowVisible, SetCursorPos,
    SetForegroundWindow,
};

use crate::logger;
use crate::types::*;
use super::{Platform, WindowHandle};

pub struct Win32Platform;

fn hwnd(id: WindowId) -> HWND {
    HWND(id as usize as *mut c_void)
}

fn window_text(h: HWND) -> String {
    let mut buf = [0u16; 512];
    let n = unsafe { GetWindowTextW(h, &mut buf) };
    String::from_utf16_lossy(&buf[..n.max(0) as usize])
}

unsafe extern "system" fn collect_window(h: HWND, lparam: LPARAM) -> BOOL {
    let out = &mut *(lparam.0 as *mut Vec<(WindowId, String)>);
    if IsWindowVisible(h).as_bool() {
        let title = window_text(h);
        if !title.is_empty() {
            out.push((h.0 as usize as WindowId, title));
        }
    }
    BOOL(1)
}

/// Client area in screen coordinates.
fn client_region(h: HWND) -> Option<Region> {
    unsafe {
        if !IsWindow(h).as_bool() {
            return None;
        }
        let mut rect = RECT::default();
        GetClientRect(h, &mut rect).ok()?;
        let mut origin = POINT { x: rect.left, y: rect.top };
        if !ClientToScreen(h, &mut origin).as_bool() {
            return None;
        }
        Some(Region::from_ltwh(origin.x, origin.y, rect.right - rect.left, rect.bottom - rect.top))
    }
}

impl Platform for Win32Platform {
    fn list_windows(&self) -> Vec<(WindowId, String)> {
        let mut out: Vec<(WindowId, String)> = Vec::new();
        let res = unsafe {
            EnumWindows(Some(collect_window), LPARAM(&mut out as *mut _ as isize))
        };
        if let Err(e) = res {
            logger::warn_p("win32", &format!("EnumWindows failed: {}", e));
        }
        out
    }

    fn create_window(&self, window_id: WindowId) -> Box<dyn WindowHandle> {
        let h = hwnd(window_id);
        let win = Win32Window {
            window_id,
            title: window_text(h),
            region: client_region(h),
        };
        logger::info_p("win32", &format!("bound window \"{}\" (hwnd: {:#x})", win.title, window_id));
        Box::new(win)
    }
}

// HWND is a raw pointer; keep the id and rebuild the handle per call.
struct Win32Window {
    window_id: WindowId,
    title: String,
    region: Option<Region>,
}

fn mouse_input(flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT { dx: 0, dy: 0, mouseData: 0, dwFlags: flags, time: 0, dwExtraInfo: 0 },
        },
    }
}

impl WindowHandle for Win32Window {
    fn id(&self) -> WindowId {
        self.window_id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn region(&self) -> Option<Region> {
        self.region
    }

    fn update(&mut self) {
        self.region = client_region(hwnd(self.window_id));
    }

    fn activate(&mut self) {
        unsafe {
            let _ = SetForegroundWindow(hwnd(self.window_id));
        }
    }

    fn click_at(&mut self, x: i32, y: i32) -> Result<()> {
        unsafe {
            SetCursorPos(x, y)?;
            let inputs = [mouse_input(MOUSEEVENTF_LEFTDOWN), mouse_input(MOUSEEVENTF_LEFTUP)];
            let sent = SendInput(&inputs, size_of::<INPUT>() as i32);
            if sent as usize != inputs.len() {
                bail!("SendInput delivered {} of {} events", sent, inputs.len());
            }
        }
        Ok(())
    }

    fn capture(&mut self) -> Result<Capture> {
        self.update();
        let region = self.region.ok_or_else(|| anyhow!("window {:#x} is gone", self.window_id))?;
        let (w, h) = (region.w, region.h);
        if w <= 0 || h <= 0 {
            bail!("window {:#x} has empty client area", self.window_id);
        }

        unsafe {
            // Screen DC: the composite at the client bounds, not the window's own surface.
            let screen_dc = GetDC(HWND::default());
            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, w, h);
            let previous = SelectObject(mem_dc, bitmap);

            let blit = BitBlt(mem_dc, 0, 0, w, h, screen_dc, region.l, region.t, SRCCOPY);

            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: w,
                    biHeight: -h, // top-down rows
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let mut data = vec![0u8; (w * h * 4) as usize];
            let lines = GetDIBits(
                mem_dc,
                bitmap,
                0,
                h as u32,
                Some(data.as_mut_ptr() as *mut c_void),
                &mut info,
                DIB_RGB_COLORS,
            );

            SelectObject(mem_dc, previous);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(HWND::default(), screen_dc);

            blit?;
            if lines != h {
                bail!("GetDIBits copied {} of {} rows", lines, h);
            }

            Ok(Capture {
                data,
                width: w as u32,
                height: h as u32,
                bytes_per_row: (w * 4) as u32,
            })
        }
    }
}
