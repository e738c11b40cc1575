use std::time::Duration;

use crate::logger;
use crate::settings::{NavigationConfig, RecoveryConfig};

/// What navigation needs from the engine. Every call is soft: failures
/// come back as `false`.
pub trait Navigator {
    /// Click an element's target point (with grace delay).
    fn tap(&mut self, element: &str) -> bool;
    fn wait_visible(&mut self, element: &str, timeout: Duration) -> bool;
    fn wait_gone(&mut self, element: &str, timeout: Duration) -> bool;
    fn is_state(&mut self, state: &str) -> bool;
    fn wait_state(&mut self, state: &str, timeout: Duration) -> bool;
    fn indicator(&self, state: &str) -> Option<String>;
    fn aborted(&self) -> bool;
}

/// Outcome of a `navigate_to` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub arrived: bool,
    /// Click attempts made, at most `retries + 1`.
    pub attempts: u32,
    pub recoveries: u32,
}

/// Navigation policy for one call.
#[derive(Debug, Clone, Copy)]
pub struct NavigationPlan {
    pub retries: u32,
    /// Brief, unstable wait for the indicator right after the click.
    pub early_wait: Option<Duration>,
    pub state_timeout: Duration,
}

impl NavigationPlan {
    pub fn from_config(nav: &NavigationConfig, state_timeout: Duration) -> Self {
        Self {
            retries: nav.default_retries,
            early_wait: nav
                .wait_visible_after_click
                .then(|| Duration::from_millis(nav.post_click_timeout_ms)),
            state_timeout,
        }
    }
}

/// Click `target` until `state` is confirmed, recovering between attempts.
pub fn navigate<N: Navigator + ?Sized>(
    nav: &mut N,
    target: &str,
    state: &str,
    plan: &NavigationPlan,
    recovery: &RecoveryConfig,
) -> Navigation {
    let mut report = Navigation { arrived: false, attempts: 0, recoveries: 0 };
    let indicator = nav.indicator(state);

    for attempt in 0..=plan.retries {
        if nav.aborted() {
            logger::warn_p("nav", &format!("navigate to '{}' aborted", state));
            return report;
        }
        report.attempts += 1;
        logger::info_p("nav", &format!("-> {} via {} (attempt {}/{})", state, target, attempt + 1, plan.retries + 1));
        nav.tap(target);

        if let (Some(wait), Some(ind)) = (plan.early_wait, indicator.as_deref()) {
            nav.wait_visible(ind, wait);
        }
        if nav.wait_state(state, plan.state_timeout) {
            report.arrived = true;
            logger::info_p("nav", &format!("arrived at {}", state));
            return report;
        }
        if attempt < plan.retries && !nav.aborted() {
            report.recoveries += 1;
            recover(nav, recovery);
        }
    }
    logger::warn_p(
        "nav",
        &format!("gave up on {} after {} attempts", state, report.attempts),
    );
    report
}

/// Best-effort return to the home state. Never fails loudly.
///
/// Only the home state confirms recovery. After each back press the wait for
/// the back element to disappear just paces the loop: a vanished back button
/// can also mean a dialog or a loading screen, so it never ends recovery.
pub fn recover<N: Navigator + ?Sized>(nav: &mut N, cfg: &RecoveryConfig) -> bool {
    logger::info_p("nav", &format!("recovering to {}", cfg.home_state));
    for _ in 0..cfg.max_presses {
        if nav.aborted() {
            return false;
        }
        if nav.is_state(&cfg.home_state) {
            return true;
        }
        nav.tap(&cfg.back_element);
        nav.wait_gone(&cfg.back_element, Duration::from_millis(cfg.gone_timeout_ms));
        if nav.wait_state(&cfg.home_state, Duration::from_millis(cfg.appear_timeout_ms)) {
            return true;
        }
    }
    let ok = nav.wait_state(&cfg.home_state, Duration::from_secs_f64(cfg.final_timeout_s.max(0.0)));
    if !ok {
        logger::warn_p("nav", &format!("failed to recover to {}", cfg.home_state));
    }
    ok
}
