use crate::abort::AbortFlag;

/// macOS virtual keycode for a panic-key name.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn mac_keycode(key: &str) -> Option<i64> {
    Some(match key.to_lowercase().as_str() {
        "f1" => 122, "f2" => 120, "f3" => 99, "f4" => 118,
        "f5" => 96, "f6" => 97, "f7" => 98, "f8" => 100,
        "f9" => 101, "f10" => 109, "f11" => 103, "f12" => 111,
        "escape" | "esc" => 53,
        _ => return None,
    })
}

/// Windows virtual-key code for a panic-key name.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn vk_code(key: &str) -> Option<u32> {
    let key = key.to_lowercase();
    if let Some(n) = key.strip_prefix('f').and_then(|n| n.parse::<u32>().ok()) {
        if (1..=12).contains(&n) {
            return Some(0x70 + n - 1);
        }
    }
    match key.as_str() {
        "pause" => Some(0x13),
        "escape" | "esc" => Some(0x1B),
        _ => None,
    }
}

/// Start a background thread that raises `flag` when the panic key is
/// pressed without modifiers. Returns false if no listener could be started.
#[cfg(target_os = "macos")]
pub fn start_panic_key_listener(key: &str, flag: AbortFlag) -> bool {
    use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
    use core_graphics::event::{
        CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
        CGEventType, EventField,
    };

    let Some(keycode) = mac_keycode(key) else {
        crate::logger::warn(&format!("unsupported panic key '{}'", key));
        return false;
    };
    let key = key.to_string();
    let modifiers = CGEventFlags::CGEventFlagCommand
        | CGEventFlags::CGEventFlagControl
        | CGEventFlags::CGEventFlagAlternate;

    std::thread::spawn(move || {
        let tap = CGEventTap::new(
            CGEventTapLocation::HID,
            CGEventTapPlacement::HeadInsertEventTap,
            CGEventTapOptions::ListenOnly,
            vec![CGEventType::KeyDown],
            |_proxy, _kind, event| {
                let code = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
                if code == keycode && !event.get_flags().intersects(modifiers) {
                    flag.set();
                }
                None
            },
        );
        let Ok(tap) = tap else {
            crate::logger::error(
                "failed to create event tap for panic key, \
                 grant Accessibility permission to your terminal",
            );
            return;
        };
        let Ok(source) = tap.mach_port.create_runloop_source(0) else {
            crate::logger::error("failed to attach panic key tap to the run loop");
            return;
        };
        unsafe {
            CFRunLoop::get_current().add_source(&source, kCFRunLoopCommonModes);
        }
        tap.enable();
        crate::logger::info(&format!("panic key {} armed", key));
        CFRunLoop::run_current(); // blocks forever
    });
    true
}

/// Start a background thread that raises `flag` when the panic key is
/// pressed (Windows global hotkey, no modifiers).
#[cfg(target_os = "windows")]
pub fn start_panic_key_listener(key: &str, flag: AbortFlag) -> bool {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Input::KeyboardAndMouse::{RegisterHotKey, MOD_NOREPEAT};
    use windows::Win32::UI::WindowsAndMessaging::{GetMessageW, MSG, WM_HOTKEY};

    const PANIC_HOTKEY_ID: i32 = 0x0F8;

    let Some(vk) = vk_code(key) else {
        crate::logger::warn(&format!("unsupported panic key '{}'", key));
        return false;
    };
    let key = key.to_string();

    std::thread::spawn(move || unsafe {
        // registered on this thread, so WM_HOTKEY arrives in this thread's queue
        if let Err(e) = RegisterHotKey(HWND::default(), PANIC_HOTKEY_ID, MOD_NOREPEAT, vk) {
            crate::logger::error(&format!("failed to register panic key {}: {}", key, e));
            return;
        }
        crate::logger::info(&format!("panic key {} armed", key));

        let mut msg = MSG::default();
        while GetMessageW(&mut msg, HWND::default(), 0, 0).0 > 0 {
            if msg.message == WM_HOTKEY && msg.wParam.0 == PANIC_HOTKEY_ID as usize {
                flag.set();
            }
        }
    });
    true
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn start_panic_key_listener(key: &str, _flag: AbortFlag) -> bool {
    crate::logger::warn(&format!("panic key {} not supported on this platform", key));
    false
}
