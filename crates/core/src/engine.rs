use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::abort::{Abort, AbortFlag, AbortSource};
use crate::action::{ActionExecutor, ColorWatch};
use crate::artifact;
use crate::color::Sampling;
use crate::coords::{windowed_preset, CoordinateMapper, ReferenceCanvas};
use crate::elements::{Anchor, Element, ElementRegistry, Profile, VisibilityCheck};
use crate::frame::Screen;
use crate::logger;
use crate::navigation::{self, Navigation, NavigationPlan, Navigator};
use crate::platform::{Platform, WindowHandle, WindowQuery};
use crate::settings::EngineConfig;
use crate::sleep::sleep_ms;
use crate::states::StateModel;
use crate::types::*;
use crate::visibility::{self, CheckOptions};
use crate::wait::{Polling, Waiter};

/// Element override, then the caller's value, then the configured default.
fn check_options(cfg: &EngineConfig, element: Option<&Element>, confidence: Option<f64>, sampling: Sampling) -> CheckOptions {
    let confidence = element
        .and_then(|e| e.confidence)
        .or(confidence)
        .unwrap_or(cfg.colors.default_confidence);
    CheckOptions { confidence, sampling, verbose: cfg.observability.verbose_checks }
}

fn lookup<'a>(elements: &'a ElementRegistry, name: &str) -> Option<&'a Element> {
    let el = elements.get(name);
    if el.is_none() {
        logger::warn_p("vis", &format!("element '{}' not in registry", name));
    }
    el
}

/// What `safe_click` should click.
#[derive(Debug, Clone, Copy)]
pub enum ClickTarget<'a> {
    Element(&'a str),
    Point(Point),
}

impl<'a> From<&'a str> for ClickTarget<'a> {
    fn from(name: &'a str) -> Self {
        ClickTarget::Element(name)
    }
}

impl From<Point> for ClickTarget<'_> {
    fn from(p: Point) -> Self {
        ClickTarget::Point(p)
    }
}

/// Perception and action surface over one target window.
///
/// Single caller, blocking. Every operation is soft: a missing window, an
/// unknown element or state, a timeout or an abort all come back as `false`
/// (or an unsuccessful [`Navigation`]) after logging.
pub struct Engine {
    screen: Screen,
    elements: ElementRegistry,
    states: StateModel,
    cfg: EngineConfig,
    actions: ActionExecutor,
    abort: Abort,
}

impl Engine {
    pub fn new(window: Option<Box<dyn WindowHandle>>, profile: Profile, cfg: EngineConfig) -> Self {
        logger::register_prefix("wait", logger::COLOR_GRAY);
        logger::register_prefix("vis", logger::COLOR_GRAY);
        logger::register_prefix("frame", logger::COLOR_GRAY);
        logger::register_prefix("act", logger::COLOR_CYAN);
        logger::register_prefix("nav", logger::COLOR_BLUE);

        let insets = if cfg.window.windowed_mode {
            let preset = windowed_preset(&cfg.window.windowed_preset);
            if preset.is_none() {
                logger::warn(&format!("unknown windowed preset '{}', ignoring", cfg.window.windowed_preset));
            }
            preset
        } else {
            None
        };
        let canvas = ReferenceCanvas { width: cfg.window.canvas_width, height: cfg.window.canvas_height };
        let screen = Screen::new(
            window,
            CoordinateMapper::new(canvas, insets),
            Duration::from_millis(cfg.window.frame_max_age_ms),
        );

        let states = StateModel::new(profile.states);
        for state in states.dangling(&profile.elements) {
            logger::warn_p("nav", &format!("state '{}' has no indicator element", state));
        }

        match (screen.title(), screen.geometry()) {
            (Some(title), Some(g)) => logger::info(&format!(
                "attached to '{}' at ({}, {}) {}x{}{}",
                title, g.l, g.t, g.w, g.h,
                if cfg.safety.dry_run { " [dry-run]" } else { "" },
            )),
            _ => logger::warn("no target window, every operation will be a no-op"),
        }

        Self {
            screen,
            elements: profile.elements,
            states,
            actions: ActionExecutor::from_config(&cfg.clicks, cfg.safety.dry_run),
            cfg,
            abort: Abort::default(),
        }
    }

    /// Look the window up with `cfg.window` and attach to it (or to nothing).
    pub fn attach(platform: &dyn Platform, profile: Profile, cfg: EngineConfig) -> Self {
        let query = WindowQuery {
            title: cfg.window.title.clone(),
            pattern: cfg.window.title_pattern.clone(),
            exclude: cfg.window.exclude_keywords.clone(),
        };
        let window = platform.find_window(&query).map(|(id, title)| {
            logger::info(&format!("found window '{}' ({})", title, id));
            platform.create_window(id)
        });
        let mut engine = Self::new(window, profile, cfg);
        // clicks land on whatever is frontmost
        engine.screen.activate();
        engine
    }

    /// Add an external abort source, polled alongside the engine's own flag.
    pub fn with_abort_source(mut self, source: Arc<dyn AbortSource>) -> Self {
        self.abort = Abort::new(self.abort.flag().clone(), source);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn elements(&self) -> &ElementRegistry {
        &self.elements
    }

    pub fn states(&self) -> &StateModel {
        &self.states
    }

    pub fn screen(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn abort_flag(&self) -> AbortFlag {
        self.abort.flag().clone()
    }

    pub fn should_abort(&self) -> bool {
        self.abort.should_abort()
    }

    pub fn dry_run(&self) -> bool {
        self.actions.dry_run()
    }

    pub fn set_dry_run(&mut self, on: bool) {
        logger::info(&format!("dry-run {}", if on { "on" } else { "off" }));
        self.actions.set_dry_run(on);
    }

    /// `Sampling::Region` with the configured half-size.
    pub fn region_sampling(&self) -> Sampling {
        Sampling::Region(self.cfg.colors.roi_half_size)
    }

    fn polling(&self) -> Polling {
        Polling::from_config(&self.cfg.timeouts)
    }

    fn timeout_or_default(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or_else(|| Duration::from_secs_f64(self.cfg.timeouts.default_timeout_s.max(0.0)))
    }

    // ---- perception ----

    /// Observed color at a reference point (single pixel).
    pub fn pixel_color(&mut self, x: i32, y: i32) -> Option<Rgb> {
        self.screen.refresh()?;
        let (sx, sy) = self.screen.mapper().scaled(x, y);
        let frame = self.screen.frame(false);
        if frame.placeholder {
            return None;
        }
        frame.capture.pixel(sx, sy)
    }

    /// Ad hoc anchor check without a registered element.
    pub fn check_color_at(&mut self, x: i32, y: i32, expected: Rgb, confidence: Option<f64>, sampling: Sampling) -> bool {
        let opts = check_options(&self.cfg, None, confidence, sampling);
        visibility::try_color_at(&mut self.screen, x, y, expected, opts).unwrap_or_else(|e| {
            logger::debug_p("vis", &format!("color check at ({}, {}): {}", x, y, e));
            false
        })
    }

    pub fn is_visible(&mut self, name: &str, confidence: Option<f64>) -> bool {
        self.is_visible_with(name, confidence, Sampling::Point)
    }

    /// [`is_visible`](Engine::is_visible) with an explicit sampling mode,
    /// e.g. [`region_sampling`](Engine::region_sampling) on noisy screens.
    pub fn is_visible_with(&mut self, name: &str, confidence: Option<f64>, sampling: Sampling) -> bool {
        let Some(el) = lookup(&self.elements, name) else { return false };
        let opts = check_options(&self.cfg, Some(el), confidence, sampling);
        visibility::is_visible(&mut self.screen, el, opts)
    }

    fn wait_visibility(
        &mut self,
        name: &str,
        want: bool,
        timeout: Duration,
        confidence: Option<f64>,
        sampling: Sampling,
        label: &str,
    ) -> bool {
        // an unknown element is never visible
        let Some(el) = lookup(&self.elements, name) else { return !want };
        let opts = check_options(&self.cfg, Some(el), confidence, sampling);
        let waiter = Waiter::new(label, timeout, self.polling(), &self.abort);
        let screen = &mut self.screen;
        waiter.until(|| {
            // every stability reading is its own capture
            screen.invalidate();
            Ok(visibility::try_visible(screen, el, opts)? == want)
        })
    }

    pub fn wait_visible(&mut self, name: &str, timeout: Option<Duration>, confidence: Option<f64>) -> bool {
        self.wait_visible_with(name, timeout, confidence, Sampling::Point)
    }

    pub fn wait_visible_with(
        &mut self,
        name: &str,
        timeout: Option<Duration>,
        confidence: Option<f64>,
        sampling: Sampling,
    ) -> bool {
        let timeout = self.timeout_or_default(timeout);
        let ok = self.wait_visibility(name, true, timeout, confidence, sampling, &format!("wait_visible:{}", name));
        if !ok && !self.should_abort() {
            let points: Vec<Point> = match self.elements.get(name).and_then(|e| e.check.as_ref()) {
                Some(VisibilityCheck::PixelAnchors(a)) => a.iter().map(|a| a.point).collect(),
                _ => Vec::new(),
            };
            self.save_artifact(&format!("wait_visible_timeout_{}", name), &points);
        }
        ok
    }

    pub fn wait_gone(&mut self, name: &str, timeout: Option<Duration>, confidence: Option<f64>) -> bool {
        self.wait_gone_with(name, timeout, confidence, Sampling::Point)
    }

    pub fn wait_gone_with(
        &mut self,
        name: &str,
        timeout: Option<Duration>,
        confidence: Option<f64>,
        sampling: Sampling,
    ) -> bool {
        let timeout = self.timeout_or_default(timeout);
        self.wait_visibility(name, false, timeout, confidence, sampling, &format!("wait_gone:{}", name))
    }

    /// Index of the first element to become stably visible.
    pub fn wait_any_visible(&mut self, names: &[&str], timeout: Option<Duration>, sampling: Sampling) -> Option<usize> {
        let timeout = self.timeout_or_default(timeout);
        let checks: Vec<Option<(&Element, CheckOptions)>> = names
            .iter()
            .map(|n| self.elements.get(n).map(|e| (e, check_options(&self.cfg, Some(e), None, sampling))))
            .collect();
        let waiter = Waiter::new(format!("wait_any:{}", names.join("|")), timeout, self.polling(), &self.abort);
        let screen = &mut self.screen;
        waiter.until_any(names.len(), |i| {
            // one capture per poll, shared by every element
            if i == 0 {
                screen.invalidate();
            }
            match checks[i] {
                Some((el, opts)) => visibility::try_visible(screen, el, opts),
                None => Ok(false),
            }
        })
    }

    /// True once every element is stably visible at the same time.
    pub fn wait_all_visible(&mut self, names: &[&str], timeout: Option<Duration>, sampling: Sampling) -> bool {
        let timeout = self.timeout_or_default(timeout);
        let mut checks = Vec::with_capacity(names.len());
        for n in names {
            let Some(el) = lookup(&self.elements, n) else { return false };
            checks.push((el, check_options(&self.cfg, Some(el), None, sampling)));
        }
        let waiter = Waiter::new(format!("wait_all:{}", names.join("&")), timeout, self.polling(), &self.abort);
        let screen = &mut self.screen;
        waiter.until_all(checks.len(), |i| {
            if i == 0 {
                screen.invalidate();
            }
            visibility::try_visible(screen, checks[i].0, checks[i].1)
        })
    }

    // ---- actions ----

    pub fn click(&mut self, x: i32, y: i32) -> bool {
        self.actions.click(&mut self.screen, x, y, "click")
    }

    /// Click an element's preferred point (or its first anchor).
    pub fn tap(&mut self, name: &str) -> bool {
        let Some(target) = lookup(&self.elements, name).map(Element::click_target) else { return false };
        let Some(p) = target else {
            logger::warn_p("act", &format!("tap: element '{}' has no click coordinates", name));
            return false;
        };
        self.actions.click(&mut self.screen, p.x, p.y, &format!("tap '{}'", name))
    }

    /// Click, then optionally wait for `expect_visible`.
    pub fn safe_click<'a>(
        &mut self,
        target: impl Into<ClickTarget<'a>>,
        expect_visible: Option<&str>,
        timeout: Option<Duration>,
    ) -> bool {
        let clicked = match target.into() {
            ClickTarget::Element(name) => self.tap(name),
            ClickTarget::Point(p) => self.actions.click(&mut self.screen, p.x, p.y, "safe_click"),
        };
        if !clicked {
            return false;
        }
        match expect_visible {
            Some(name) => self.wait_visible(name, timeout, None),
            None => true,
        }
    }

    fn save_watch_artifact(&mut self, label: &str, points: &[Point]) {
        if !self.should_abort() {
            self.save_artifact(label, points);
        }
    }

    /// Debounced wait for a color to appear or disappear at a point.
    pub fn wait_for_color_change(&mut self, watch: &ColorWatch, timeout: Option<Duration>) -> bool {
        let timeout = self.timeout_or_default(timeout);
        logger::debug_p(
            "act",
            &format!("waiting for {} to {} at ({}, {})", watch.color, watch.mode.as_str(), watch.point.x, watch.point.y),
        );
        let ok = self.watch_until(watch, timeout, &format!("wait_for_color_change:{}", watch.mode.as_str()));
        if !ok {
            self.save_watch_artifact(&format!("wait_for_color_change_timeout_{}", watch.mode.as_str()), &[watch.point]);
        }
        ok
    }

    fn watch_until(&mut self, watch: &ColorWatch, timeout: Duration, label: &str) -> bool {
        let opts = check_options(&self.cfg, None, watch.confidence, watch.sampling);
        let waiter = Waiter::new(label, timeout, self.polling(), &self.abort);
        let screen = &mut self.screen;
        waiter.until(|| {
            screen.invalidate();
            let matched = visibility::try_color_at(screen, watch.point.x, watch.point.y, watch.color, opts)?;
            Ok(watch.mode.holds(matched))
        })
    }

    /// Click once, let the UI respond, then wait for the watched color.
    pub fn click_and_wait(&mut self, click: Point, watch: &ColorWatch, timeout: Option<Duration>) -> bool {
        let timeout = self.timeout_or_default(timeout);
        self.actions.click(&mut self.screen, click.x, click.y, "click_and_wait");
        let ok = self.watch_until(watch, timeout, &format!("click_and_wait:{}", watch.mode.as_str()));
        if !ok {
            self.save_watch_artifact(&format!("click_and_wait_timeout_{}", watch.mode.as_str()), &[watch.point]);
        }
        ok
    }

    /// Click repeatedly until the watched color condition holds.
    /// Abort is checked on every iteration.
    pub fn spam_click_until_color(
        &mut self,
        click: Point,
        watch: &ColorWatch,
        timeout: Option<Duration>,
        click_delay: Option<Duration>,
    ) -> bool {
        let timeout = self.timeout_or_default(timeout);
        let delay = click_delay.unwrap_or(Duration::from_millis(self.cfg.clicks.spam_click_delay_ms));
        let opts = check_options(&self.cfg, None, watch.confidence, watch.sampling);
        let start = Instant::now();

        let holds = |screen: &mut Screen| {
            visibility::try_color_at(screen, watch.point.x, watch.point.y, watch.color, opts)
                .map(|m| watch.mode.holds(m))
                .unwrap_or(false)
        };

        if holds(&mut self.screen) {
            logger::debug_p("act", "color condition met before spam click");
            return true;
        }
        let mut clicks = 0u32;
        while start.elapsed() < timeout {
            if self.abort.should_abort() {
                logger::warn_p("act", "spam_click_until_color aborted");
                return false;
            }
            self.actions.press(&mut self.screen, click.x, click.y, "spam-click");
            clicks += 1;
            sleep_ms(delay.as_millis() as u64);
            if holds(&mut self.screen) {
                logger::debug_p(
                    "act",
                    &format!("color changed after {} clicks, {:.2}s", clicks, start.elapsed().as_secs_f64()),
                );
                return true;
            }
        }
        if self.abort.should_abort() {
            logger::warn_p("act", "spam_click_until_color aborted");
            return false;
        }
        logger::warn_p(
            "act",
            &format!("spam_click_until_color timed out after {} clicks", clicks),
        );
        self.save_artifact(&format!("spam_click_timeout_{}", watch.mode.as_str()), &[click, watch.point]);
        false
    }

    // ---- states ----

    pub fn is_state(&mut self, state: &str) -> bool {
        let Some(indicator) = self.states.indicator(state).map(str::to_string) else { return false };
        self.is_visible(&indicator, None)
    }

    pub fn wait_state(&mut self, state: &str, timeout: Option<Duration>) -> bool {
        let Some(indicator) = self.states.indicator(state).map(str::to_string) else { return false };
        let timeout = self.timeout_or_default(timeout);
        self.wait_visibility(&indicator, true, timeout, None, Sampling::Point, &format!("wait_state:{}", state))
    }

    /// Click `target` until `state` is confirmed, recovering between attempts.
    /// `retries` defaults to `navigation.default_retries`.
    pub fn navigate_to(&mut self, target: &str, state: &str, retries: Option<u32>) -> Navigation {
        let mut plan = NavigationPlan::from_config(&self.cfg.navigation, self.timeout_or_default(None));
        if let Some(r) = retries {
            plan.retries = r;
        }
        let recovery = self.cfg.recovery.clone();
        navigation::navigate(self, target, state, &plan, &recovery)
    }

    /// Best-effort return to the configured home state.
    pub fn recover(&mut self) -> bool {
        let recovery = self.cfg.recovery.clone();
        navigation::recover(self, &recovery)
    }

    // ---- diagnostics ----

    /// Save the current frame with boxes around `points`, if enabled.
    pub fn save_artifact(&mut self, label: &str, points: &[Point]) -> Option<PathBuf> {
        let obs = &self.cfg.observability;
        if !obs.enable_failure_screenshots {
            return None;
        }
        let frame = self.screen.frame(true);
        if frame.placeholder {
            logger::debug(&format!("artifact '{}' skipped, no window", label));
            return None;
        }
        let mapper = self.screen.mapper();
        let rects: Vec<artifact::Rect> = points
            .iter()
            .map(|p| {
                let (x, y) = mapper.scaled_point(*p);
                artifact::box_around(x, y)
            })
            .collect();
        match artifact::save(
            Path::new(&obs.artifacts_dir),
            label,
            &frame.capture,
            &rects,
            obs.annotation_color,
            obs.annotation_thickness_px,
        ) {
            Ok(path) => path,
            Err(e) => {
                logger::warn(&format!("failed to save artifact '{}': {}", label, e));
                None
            }
        }
    }

    /// Anchors of `name` with the color currently observed at each.
    pub fn probe(&mut self, name: &str) -> Vec<(Anchor, Option<Rgb>)> {
        let anchors = match self.elements.get(name).and_then(|e| e.check.clone()) {
            Some(VisibilityCheck::PixelAnchors(a)) => a,
            _ => return Vec::new(),
        };
        anchors
            .into_iter()
            .map(|a| (a, self.pixel_color(a.point.x, a.point.y)))
            .collect()
    }
}

impl Navigator for Engine {
    fn tap(&mut self, element: &str) -> bool {
        Engine::tap(self, element)
    }

    fn wait_visible(&mut self, element: &str, timeout: Duration) -> bool {
        self.wait_visibility(element, true, timeout, None, Sampling::Point, &format!("wait_visible:{}", element))
    }

    fn wait_gone(&mut self, element: &str, timeout: Duration) -> bool {
        Engine::wait_gone(self, element, Some(timeout), None)
    }

    fn is_state(&mut self, state: &str) -> bool {
        Engine::is_state(self, state)
    }

    fn wait_state(&mut self, state: &str, timeout: Duration) -> bool {
        Engine::wait_state(self, state, Some(timeout))
    }

    fn indicator(&self, state: &str) -> Option<String> {
        self.states.indicator(state).map(str::to_string)
    }

    fn aborted(&self) -> bool {
        self.should_abort()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ColorMode;
    use crate::platform::stub::{StubPlatform, StubScreen};

    const SKY: Rgb = Rgb::new(0, 153, 220);

    fn profile() -> Profile {
        let mut p = Profile::default();
        p.elements.insert(Element::anchors("E", vec![Anchor::new(100, 50, Rgb::WHITE)]));
        p.elements.insert(
            Element::anchors("strict", vec![Anchor::new(100, 50, Rgb::WHITE)]).with_confidence(1.0),
        );
        p.elements.insert(Element::anchors("sky", vec![Anchor::new(200, 200, SKY)]).with_click(300, 300));
        p.elements.insert(Element::click_only("tile", 1550, 950));
        p.states.insert("home".into(), "sky".into());
        p
    }

    fn engine(stub: &StubScreen) -> Engine {
        Engine::new(Some(stub.window()), profile(), EngineConfig::for_tests())
    }

    #[test]
    fn element_confidence_overrides_caller() {
        let stub = StubScreen::new(1920, 1080);
        stub.paint(100, 50, Rgb::new(250, 250, 250));
        let mut e = engine(&stub);
        assert!(e.is_visible("E", None));
        assert!(!e.is_visible("E", Some(1.0)));
        assert!(!e.is_visible("strict", Some(0.5)));
    }

    #[test]
    fn unknown_names_are_soft() {
        let stub = StubScreen::new(1920, 1080);
        let mut e = engine(&stub);
        assert!(!e.is_visible("nope", None));
        assert!(!e.wait_visible("nope", None, None));
        assert!(e.wait_gone("nope", None, None));
        assert!(!e.tap("nope"));
        assert!(!e.is_state("nowhere"));
        assert!(!e.wait_state("nowhere", None));
        assert!(stub.clicks().is_empty());
    }

    #[test]
    fn tap_prefers_click_point() {
        let stub = StubScreen::new(1920, 1080);
        let mut e = engine(&stub);
        assert!(e.tap("sky"));
        assert!(e.tap("tile"));
        assert_eq!(stub.clicks(), vec![(300, 300), (1550, 950)]);
    }

    #[test]
    fn safe_click_waits_for_expected_element() {
        let stub = StubScreen::new(1920, 1080);
        stub.on_click(|canvas, x, y| {
            if (x, y) == (1550, 950) {
                canvas.set_pixel(200, 200, SKY);
            }
        });
        let mut e = engine(&stub);
        assert!(e.safe_click("tile", Some("sky"), None));
        assert!(!e.safe_click(Point::new(10, 10), Some("E"), Some(Duration::from_millis(50))));
        assert!(e.safe_click(Point::new(10, 10), None, None));
        assert!(e.is_state("home"));
    }

    #[test]
    fn attach_finds_stub_window() {
        let stub = StubScreen::new(1920, 1080);
        stub.paint(100, 50, Rgb::WHITE);
        let platform = StubPlatform::new(stub.clone());
        let mut e = Engine::attach(&platform, profile(), EngineConfig::for_tests());
        assert!(e.screen().title().is_some());
        assert!(e.is_visible("E", None));
    }

    #[test]
    fn pixel_color_and_check_color_at() {
        let stub = StubScreen::new(960, 540);
        stub.fill_rect(48, 23, 5, 5, SKY);
        stub.paint(50, 25, Rgb::new(255, 0, 0));
        let mut e = engine(&stub);
        assert_eq!(e.pixel_color(100, 50), Some(Rgb::new(255, 0, 0)));
        assert!(!e.check_color_at(100, 50, SKY, None, Sampling::Point));
        let region = e.region_sampling();
        assert!(e.check_color_at(100, 50, SKY, None, region));
    }

    #[test]
    fn color_change_disappear() {
        let stub = StubScreen::new(1920, 1080);
        stub.paint(10, 10, Rgb::WHITE);
        let mut e = engine(&stub);
        let watch = ColorWatch::disappear(10, 10, Rgb::WHITE);
        assert_eq!(watch.mode, ColorMode::Disappear);
        assert!(!e.wait_for_color_change(&watch, Some(Duration::from_millis(60))));
        stub.paint(10, 10, Rgb::BLACK);
        assert!(e.wait_for_color_change(&watch, None));
    }

    #[test]
    fn wait_any_and_all() {
        let stub = StubScreen::new(1920, 1080);
        stub.paint(200, 200, SKY);
        let mut e = engine(&stub);
        assert_eq!(e.wait_any_visible(&["E", "sky"], None, Sampling::Point), Some(1));
        assert!(!e.wait_all_visible(&["E", "sky"], Some(Duration::from_millis(60)), Sampling::Point));
        stub.paint(100, 50, Rgb::WHITE);
        assert!(e.wait_all_visible(&["E", "sky"], None, Sampling::Point));
    }

    #[test]
    fn region_sampling_reaches_element_checks() {
        let stub = StubScreen::new(1920, 1080);
        stub.fill_rect(98, 48, 5, 5, Rgb::WHITE);
        stub.paint(100, 50, Rgb::new(255, 0, 0));
        let mut e = engine(&stub);
        let region = e.region_sampling();
        assert!(!e.is_visible("E", None));
        assert!(e.is_visible_with("E", None, region));
        assert!(!e.wait_visible("E", Some(Duration::from_millis(40)), None));
        assert!(e.wait_visible_with("E", None, None, region));
        assert!(e.wait_gone("E", None, None));
        assert!(!e.wait_gone_with("E", Some(Duration::from_millis(40)), None, region));
        assert_eq!(e.wait_any_visible(&["sky", "E"], None, region), Some(1));
    }

    #[test]
    fn stability_readings_are_separate_captures() {
        let stub = StubScreen::new(1920, 1080);
        stub.paint(100, 50, Rgb::WHITE);
        let mut cfg = EngineConfig::for_tests();
        cfg.timeouts.stability_frames = 3;
        cfg.timeouts.check_interval_min_s = 0.005;
        cfg.timeouts.check_interval_max_s = 0.005;
        cfg.window.frame_max_age_ms = 1000;
        let mut e = Engine::new(Some(stub.window()), profile(), cfg);

        let before = stub.capture_count();
        assert!(e.wait_visible("E", None, None));
        assert!(stub.capture_count() - before >= 3);

        let before = stub.capture_count();
        assert!(e.wait_for_color_change(&ColorWatch::appear(100, 50, Rgb::WHITE), None));
        assert!(stub.capture_count() - before >= 3);

        let before = stub.capture_count();
        assert!(e.wait_all_visible(&["E", "strict"], None, Sampling::Point));
        assert_eq!(stub.capture_count() - before, 3);
    }

    #[test]
    fn attach_activates_the_window() {
        let stub = StubScreen::new(1920, 1080);
        let platform = StubPlatform::new(stub.clone());
        Engine::attach(&platform, profile(), EngineConfig::for_tests());
        assert_eq!(stub.activations(), 1);
    }
}
