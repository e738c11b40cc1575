use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use libtest_mimic::{Arguments, Failed, Trial};

use glance_core::platform::stub::StubScreen;
use glance_core::settings::EngineConfig;
use glance_core::{logger, ColorWatch, Engine, Point, Profile, Rgb};

const WHITE: Rgb = Rgb::WHITE;
const GRAY: Rgb = Rgb::new(49, 49, 49);
const SKY: Rgb = Rgb::new(0, 153, 220);

const TILE: (i32, i32) = (1550, 950);
const BACK: (i32, i32) = (130, 50);

const PROFILE: &str = r#"{
    "elements": {
        "E": { "anchors": [[100, 50, [255, 255, 255]]] },
        "back_button": { "anchors": [[130, 50, [49, 49, 49]]], "click": [130, 50] },
        "main_menu_indicators": { "anchors": [
            [1366, 110, [255, 255, 255]],
            [69, 78, [255, 255, 255]]
        ] },
        "base_panel_indicator": { "anchors": [[1650, 100, [0, 153, 220]]] },
        "tile_base": { "click": [1550, 950] }
    },
    "states": {
        "main_menu": "main_menu_indicators",
        "base_panel": "base_panel_indicator"
    }
}"#;

fn profile() -> Profile {
    Profile::from_json(PROFILE).expect("scenario profile")
}

fn engine_with(stub: &StubScreen, cfg: EngineConfig) -> Engine {
    Engine::new(Some(stub.window()), profile(), cfg)
}

fn engine(stub: &StubScreen) -> Engine {
    engine_with(stub, EngineConfig::for_tests())
}

fn check(cond: bool, msg: &str) -> Result<(), Failed> {
    if cond {
        Ok(())
    } else {
        Err(msg.into())
    }
}

fn count(clicks: &[(i32, i32)], at: (i32, i32)) -> usize {
    clicks.iter().filter(|c| **c == at).count()
}

fn paint_main_menu(canvas: &mut glance_core::types::Capture) {
    canvas.set_pixel(1366, 110, WHITE);
    canvas.set_pixel(69, 78, WHITE);
}

// ---- perception ----

fn exact_color_is_visible() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    stub.paint(100, 50, WHITE);
    let mut e = engine(&stub);
    check(e.is_visible("E", None), "E should be visible")
}

fn near_color_passes_default_confidence() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    stub.paint(100, 50, Rgb::new(250, 250, 250));
    let mut e = engine(&stub);
    check(e.is_visible("E", Some(0.95)), "250 gray within 0.95")?;
    check(!e.is_visible("E", Some(1.0)), "exact match must fail")
}

fn multi_anchor_needs_every_anchor() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    stub.paint(1366, 110, WHITE);
    let mut e = engine(&stub);
    check(!e.is_visible("main_menu_indicators", None), "one of two anchors")?;
    stub.paint(69, 78, WHITE);
    check(e.is_state("main_menu"), "both anchors")
}

fn scaled_window_maps_anchors() -> Result<(), Failed> {
    let stub = StubScreen::at(300, 120, 1280, 720);
    // (100, 50) on a 1280x720 window
    stub.paint(66, 33, WHITE);
    let mut e = engine(&stub);
    check(e.is_visible("E", None), "anchor should scale")?;
    e.click(100, 50);
    check(stub.clicks() == vec![(366, 153)], "click should land on the scaled point")
}

fn windowed_mode_applies_insets() -> Result<(), Failed> {
    let stub = StubScreen::new(1903, 1041);
    stub.paint(109, 81, WHITE);
    let mut cfg = EngineConfig::for_tests();
    cfg.window.windowed_mode = true;
    cfg.window.windowed_preset = "google_play".into();
    let mut e = engine_with(&stub, cfg);
    check(e.is_visible("E", None), "inset anchor should be visible")
}

fn missing_window_is_soft() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    stub.paint(100, 50, WHITE);
    let mut e = engine(&stub);
    stub.set_region(None);
    check(!e.click(100, 50), "click without a window")?;
    check(!e.tap("back_button"), "tap without a window")?;
    check(!e.is_visible("E", None), "nothing is visible without a window")?;
    check(e.pixel_color(100, 50).is_none(), "no pixels without a window")?;
    check(stub.clicks().is_empty(), "no click may reach the stub")
}

fn no_window_at_all() -> Result<(), Failed> {
    let mut e = Engine::new(None, profile(), EngineConfig::for_tests());
    check(!e.click(1, 1), "click")?;
    check(!e.is_state("main_menu"), "state")?;
    let nav = e.navigate_to("tile_base", "base_panel", Some(0));
    check(!nav.arrived && nav.attempts == 1, "navigation without a window")
}

// ---- waiting ----

fn always_false_waits_full_timeout() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    let mut e = engine(&stub);
    let start = Instant::now();
    let ok = e.wait_visible("E", Some(Duration::from_millis(150)), None);
    let elapsed = start.elapsed();
    check(!ok, "never visible")?;
    check(elapsed >= Duration::from_millis(150), "returned before the timeout")?;
    check(elapsed < Duration::from_millis(600), "overshot the timeout")
}

fn stable_success_after_late_appearance() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    let mut cfg = EngineConfig::for_tests();
    cfg.timeouts.stability_frames = 3;
    cfg.timeouts.check_interval_min_s = 0.02;
    cfg.timeouts.check_interval_max_s = 0.025;
    let mut e = engine_with(&stub, cfg);

    let painter = stub.clone();
    let appear_at = Duration::from_millis(100);
    let start = Instant::now();
    let t = std::thread::spawn(move || {
        std::thread::sleep(appear_at);
        painter.paint(100, 50, WHITE);
    });
    let ok = e.wait_visible("E", Some(Duration::from_secs(2)), None);
    let elapsed = start.elapsed();
    t.join().map_err(|_| "painter thread panicked")?;
    check(ok, "should stabilize")?;
    check(elapsed >= appear_at + Duration::from_millis(40), "success came before 3 stable frames")
}

fn gone_waits_for_disappearance() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    stub.paint(BACK.0, BACK.1, GRAY);
    let mut e = engine(&stub);
    check(!e.wait_gone("back_button", Some(Duration::from_millis(60)), None), "still there")?;
    stub.paint(BACK.0, BACK.1, Rgb::BLACK);
    check(e.wait_gone("back_button", None, None), "gone")
}

fn capture_glitches_do_not_kill_a_wait() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    stub.paint(100, 50, WHITE);
    stub.fail_next_captures(3);
    let mut e = engine(&stub);
    check(e.wait_visible("E", Some(Duration::from_secs(1)), None), "wait should ride out failures")
}

// ---- actions ----

fn dry_run_never_clicks() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    stub.on_click(|canvas, x, y| canvas.set_pixel(x, y, WHITE));
    let mut e = engine(&stub);
    e.set_dry_run(true);
    check(e.click(100, 50), "dry click reports success")?;
    check(e.tap("back_button"), "dry tap reports success")?;
    check(e.safe_click(Point::new(100, 50), None, None), "dry safe_click reports success")?;
    check(stub.clicks().is_empty(), "no click may reach the stub")?;
    check(!e.is_visible("E", None), "screen must be unchanged")?;

    e.set_dry_run(false);
    e.click(100, 50);
    check(e.is_visible("E", None), "real click paints")
}

fn spam_click_until_color_appears() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    let n = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&n);
    stub.on_click(move |canvas, _, _| {
        if seen.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
            canvas.set_pixel(500, 500, SKY);
        }
    });
    let mut e = engine(&stub);
    let watch = ColorWatch::appear(500, 500, SKY).with_confidence(1.0);
    let ok = e.spam_click_until_color(Point::new(TILE.0, TILE.1), &watch, Some(Duration::from_secs(2)), None);
    check(ok, "color should appear")?;
    check(n.load(Ordering::SeqCst) == 3, "exactly three clicks")?;

    // already satisfied: no click at all
    let ok = e.spam_click_until_color(Point::new(TILE.0, TILE.1), &watch, None, None);
    check(ok && n.load(Ordering::SeqCst) == 3, "pre-satisfied condition must not click")
}

fn click_and_wait_for_disappearance() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    stub.paint(BACK.0, BACK.1, GRAY);
    stub.on_click(|canvas, x, y| {
        if (x, y) == BACK {
            canvas.set_pixel(BACK.0, BACK.1, Rgb::BLACK);
        }
    });
    let mut e = engine(&stub);
    let watch = ColorWatch::disappear(BACK.0, BACK.1, GRAY);
    check(e.click_and_wait(Point::new(BACK.0, BACK.1), &watch, None), "gray should disappear")
}

fn abort_wins_everywhere() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    stub.paint(100, 50, WHITE);
    let mut e = engine(&stub);
    let flag = e.abort_flag();
    flag.set();

    let start = Instant::now();
    check(!e.wait_visible("E", Some(Duration::from_secs(5)), None), "aborted wait is a failure")?;
    check(!e.wait_state("main_menu", Some(Duration::from_secs(5))), "aborted state wait")?;
    let watch = ColorWatch::appear(500, 500, SKY);
    check(
        !e.spam_click_until_color(Point::new(TILE.0, TILE.1), &watch, Some(Duration::from_secs(5)), None),
        "aborted spam click",
    )?;
    check(stub.clicks().is_empty(), "spam click must not click once aborted")?;
    let nav = e.navigate_to("tile_base", "base_panel", Some(5));
    check(!nav.arrived && nav.attempts == 0, "aborted navigation")?;
    check(start.elapsed() < Duration::from_secs(1), "abort must be prompt")?;

    flag.clear();
    check(e.wait_visible("E", None, None), "cleared flag resumes")
}

fn abort_mid_spam_click() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    let mut e = engine(&stub);
    let flag = e.abort_flag();
    let n = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&n);
    stub.on_click(move |_, _, _| {
        if seen.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
            flag.set();
        }
    });
    let watch = ColorWatch::appear(500, 500, SKY);
    let ok = e.spam_click_until_color(Point::new(TILE.0, TILE.1), &watch, Some(Duration::from_secs(5)), None);
    check(!ok, "abort is a failure")?;
    check(n.load(Ordering::SeqCst) == 2, "no click after the abort")
}

// ---- navigation ----

fn navigation_exhausts_retries() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    let mut e = engine(&stub);
    let nav = e.navigate_to("tile_base", "base_panel", Some(2));
    let clicks = stub.clicks();
    check(!nav.arrived, "target never shows")?;
    check(nav.attempts == 3, "retries + 1 attempts")?;
    check(nav.recoveries == 2, "recovery between attempts")?;
    check(count(&clicks, TILE) == 3, "exactly three tile clicks")?;
    check(count(&clicks, BACK) > 0, "recovery pressed back")
}

fn navigation_arrives_first_try() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    stub.on_click(|canvas, x, y| {
        if (x, y) == TILE {
            canvas.set_pixel(1650, 100, SKY);
        }
    });
    let mut e = engine(&stub);
    let nav = e.navigate_to("tile_base", "base_panel", None);
    check(nav.arrived && nav.attempts == 1 && nav.recoveries == 0, "direct arrival")
}

fn navigation_recovers_then_arrives() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    let tiles = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&tiles);
    stub.on_click(move |canvas, x, y| {
        if (x, y) == BACK {
            paint_main_menu(canvas);
        } else if (x, y) == TILE && seen.fetch_add(1, Ordering::SeqCst) + 1 >= 2 {
            canvas.set_pixel(1650, 100, SKY);
        }
    });
    let mut e = engine(&stub);
    let nav = e.navigate_to("tile_base", "base_panel", Some(3));
    check(nav.arrived, "second attempt should arrive")?;
    check(nav.attempts == 2 && nav.recoveries == 1, "one recovery")?;
    check(count(&stub.clicks(), BACK) == 1, "one back press reached home")
}

fn recover_when_already_home() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    stub.paint(1366, 110, WHITE);
    stub.paint(69, 78, WHITE);
    let mut e = engine(&stub);
    check(e.recover(), "already home")?;
    check(stub.clicks().is_empty(), "no back press needed")
}

fn recover_gives_up_bounded() -> Result<(), Failed> {
    let stub = StubScreen::new(1920, 1080);
    let mut e = engine(&stub);
    let max = e.config().recovery.max_presses as usize;
    check(!e.recover(), "home never shows")?;
    check(count(&stub.clicks(), BACK) == max, "bounded back presses")
}

// ---- observability ----

fn timeout_saves_annotated_artifact() -> Result<(), Failed> {
    let dir = tempfile::tempdir()?;
    let stub = StubScreen::new(320, 180);
    let mut cfg = EngineConfig::for_tests();
    cfg.observability.enable_failure_screenshots = true;
    cfg.observability.artifacts_dir = dir.path().to_string_lossy().into_owned();
    let mut e = engine_with(&stub, cfg);

    check(!e.wait_visible("E", Some(Duration::from_millis(40)), None), "E never shows")?;
    let files: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|f| f.ok())
        .map(|f| f.path())
        .collect();
    check(files.len() == 1, "exactly one artifact")?;
    let name = files[0].file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    check(name.starts_with("artifact_wait_visible_timeout_E_") && name.ends_with(".png"), &name)?;

    // (100, 50) -> (16, 8) on 320x180; box corner at (6, -2) is clipped, left edge visible
    let img = image::open(&files[0])?.to_rgba8();
    check(img.get_pixel(6, 4).0 == [255, 165, 0, 255], "annotation missing")?;
    check(img.get_pixel(16, 8).0 == [0, 0, 0, 255], "box interior must stay untouched")
}

fn timeout_and_abort_logs_differ() -> Result<(), Failed> {
    let (tx, rx) = mpsc::channel();
    logger::set_sender(tx);
    let stub = StubScreen::new(1920, 1080);
    let mut e = engine(&stub);
    e.wait_visible("E", Some(Duration::from_millis(30)), None);
    e.abort_flag().set();
    e.wait_gone("back_button", Some(Duration::from_millis(30)), None);

    let lines: Vec<String> = rx.try_iter().collect();
    let has = |needle: &str| lines.iter().any(|l| l.contains(needle));
    check(has("[WARN] [wait] wait 'wait_visible:E' timed out"), "timeout line")?;
    check(has("[WARN] [wait] wait 'wait_gone:back_button' aborted"), "abort line")
}

fn main() {
    let args = Arguments::from_args();

    let tests = vec![
        Trial::test("perception::exact_color_is_visible", exact_color_is_visible),
        Trial::test("perception::near_color_passes_default_confidence", near_color_passes_default_confidence),
        Trial::test("perception::multi_anchor_needs_every_anchor", multi_anchor_needs_every_anchor),
        Trial::test("perception::scaled_window_maps_anchors", scaled_window_maps_anchors),
        Trial::test("perception::windowed_mode_applies_insets", windowed_mode_applies_insets),
        Trial::test("perception::missing_window_is_soft", missing_window_is_soft),
        Trial::test("perception::no_window_at_all", no_window_at_all),
        Trial::test("wait::always_false_waits_full_timeout", always_false_waits_full_timeout),
        Trial::test("wait::stable_success_after_late_appearance", stable_success_after_late_appearance),
        Trial::test("wait::gone_waits_for_disappearance", gone_waits_for_disappearance),
        Trial::test("wait::capture_glitches_do_not_kill_a_wait", capture_glitches_do_not_kill_a_wait),
        Trial::test("action::dry_run_never_clicks", dry_run_never_clicks),
        Trial::test("action::spam_click_until_color_appears", spam_click_until_color_appears),
        Trial::test("action::click_and_wait_for_disappearance", click_and_wait_for_disappearance),
        Trial::test("action::abort_wins_everywhere", abort_wins_everywhere),
        Trial::test("action::abort_mid_spam_click", abort_mid_spam_click),
        Trial::test("nav::navigation_exhausts_retries", navigation_exhausts_retries),
        Trial::test("nav::navigation_arrives_first_try", navigation_arrives_first_try),
        Trial::test("nav::navigation_recovers_then_arrives", navigation_recovers_then_arrives),
        Trial::test("nav::recover_when_already_home", recover_when_already_home),
        Trial::test("nav::recover_gives_up_bounded", recover_gives_up_bounded),
        Trial::test("obs::timeout_saves_annotated_artifact", timeout_saves_annotated_artifact),
        Trial::test("obs::timeout_and_abort_logs_differ", timeout_and_abort_logs_differ),
    ];

    libtest_mimic::run(&args, tests).exit();
}
