use std::time::{Duration, Instant};

use anyhow::Result;

use crate::abort::AbortSource;
use crate::logger;
use crate::settings::Timeouts;
use crate::sleep::sleep_between;

/// Poll pacing and debounce parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polling {
    pub min_interval: Duration,
    pub max_interval: Duration,
    /// Consecutive true evaluations required for success (at least 1).
    pub stable_frames: u32,
}

impl Polling {
    pub fn from_config(t: &Timeouts) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(t.check_interval_min_s.max(0.0)),
            max_interval: Duration::from_secs_f64(t.check_interval_max_s.max(0.0)),
            stable_frames: t.stability_frames,
        }
    }

    fn required(&self) -> u32 {
        self.stable_frames.max(1)
    }
}

impl Default for Polling {
    fn default() -> Self {
        Self::from_config(&Timeouts::default())
    }
}

/// Debounced blocking wait.
///
/// Each iteration checks the abort source first, then evaluates the
/// predicate(s). A predicate error counts as a false reading and resets the
/// stability counter. Between iterations it sleeps a uniformly random
/// interval in `[min_interval, max_interval]`.
pub struct Waiter<'a> {
    name: String,
    timeout: Duration,
    polling: Polling,
    abort: &'a dyn AbortSource,
}

enum Step<T> {
    Done(T),
    Continue,
}

impl<'a> Waiter<'a> {
    pub fn new(name: impl Into<String>, timeout: Duration, polling: Polling, abort: &'a dyn AbortSource) -> Self {
        Self { name: name.into(), timeout, polling, abort }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn sleep(&self) {
        sleep_between(
            self.polling.min_interval.as_secs_f64(),
            self.polling.max_interval.as_secs_f64(),
        );
    }

    fn run<T>(&self, kind: &str, mut step: impl FnMut(&mut Option<String>) -> Step<T>) -> Option<T> {
        let start = Instant::now();
        let mut last_error = None;
        while start.elapsed() < self.timeout {
            if self.abort.should_abort() {
                logger::warn_p("wait", &format!("{} '{}' aborted", kind, self.name));
                return None;
            }
            if let Step::Done(v) = step(&mut last_error) {
                logger::debug_p(
                    "wait",
                    &format!("{} '{}' satisfied after {:.2}s", kind, self.name, start.elapsed().as_secs_f64()),
                );
                return Some(v);
            }
            self.sleep();
        }
        match last_error {
            Some(e) => logger::warn_p(
                "wait",
                &format!("{} '{}' timed out with last error: {}", kind, self.name, e),
            ),
            None => logger::warn_p(
                "wait",
                &format!("{} '{}' timed out after {:.2}s", kind, self.name, self.timeout.as_secs_f64()),
            ),
        }
        None
    }

    /// True once `predicate` has held for the required number of consecutive polls.
    pub fn until<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut() -> Result<bool>,
    {
        let required = self.polling.required();
        let mut stable = 0u32;
        self.run("wait", |last_error| {
            match predicate() {
                Ok(true) => {
                    stable += 1;
                    if stable >= required {
                        return Step::Done(());
                    }
                }
                Ok(false) => stable = 0,
                Err(e) => {
                    *last_error = Some(e.to_string());
                    stable = 0;
                }
            }
            Step::Continue
        })
        .is_some()
    }

    /// Index of the first of `count` predicates to become stably true.
    /// Every predicate keeps its own stability counter.
    pub fn until_any<F>(&self, count: usize, mut eval: F) -> Option<usize>
    where
        F: FnMut(usize) -> Result<bool>,
    {
        let required = self.polling.required();
        let mut stables = vec![0u32; count];
        self.run("wait-any", |last_error| {
            for (i, stable) in stables.iter_mut().enumerate() {
                match eval(i) {
                    Ok(true) => {
                        *stable += 1;
                        if *stable >= required {
                            return Step::Done(i);
                        }
                    }
                    Ok(false) => *stable = 0,
                    Err(e) => {
                        *last_error = Some(e.to_string());
                        *stable = 0;
                    }
                }
            }
            Step::Continue
        })
    }

    /// True once all `count` predicates are true in the same poll and each
    /// has been true for the required number of consecutive polls.
    pub fn until_all<F>(&self, count: usize, mut eval: F) -> bool
    where
        F: FnMut(usize) -> Result<bool>,
    {
        let required = self.polling.required();
        let mut stables = vec![0u32; count];
        self.run("wait-all", |last_error| {
            let mut all_true = true;
            for (i, stable) in stables.iter_mut().enumerate() {
                match eval(i) {
                    Ok(true) => *stable += 1,
                    Ok(false) => {
                        *stable = 0;
                        all_true = false;
                    }
                    Err(e) => {
                        *last_error = Some(e.to_string());
                        *stable = 0;
                        all_true = false;
                    }
                }
            }
            if all_true && stables.iter().all(|s| *s >= required) {
                Step::Done(())
            } else {
                Step::Continue
            }
        })
        .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::{AbortFlag, NoAbort};
    use anyhow::anyhow;

    fn polling(stable_frames: u32) -> Polling {
        Polling {
            min_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(10),
            stable_frames,
        }
    }

    #[test]
    fn always_false_times_out_no_earlier_than_timeout() {
        let w = Waiter::new("never", Duration::from_millis(120), polling(1), &NoAbort);
        let start = Instant::now();
        assert!(!w.until(|| Ok(false)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(120));
        assert!(elapsed < Duration::from_millis(400));
    }

    #[test]
    fn requires_consecutive_true_readings() {
        let w = Waiter::new("stable", Duration::from_secs(2), polling(3), &NoAbort);
        let mut calls = 0;
        // true, true, false, true, true, true
        let script = [true, true, false, true, true, true];
        assert!(w.until(|| {
            let v = script[calls];
            calls += 1;
            Ok(v)
        }));
        assert_eq!(calls, 6);
    }

    #[test]
    fn success_not_before_stability_window() {
        let min = Duration::from_millis(20);
        let p = Polling { min_interval: min, max_interval: Duration::from_millis(25), stable_frames: 3 };
        let w = Waiter::new("latency", Duration::from_secs(2), p, &NoAbort);
        let start = Instant::now();
        assert!(w.until(|| Ok(true)));
        assert!(start.elapsed() >= min * 2);
    }

    #[test]
    fn errors_count_as_false_and_reset() {
        let w = Waiter::new("flaky", Duration::from_secs(2), polling(2), &NoAbort);
        let mut calls = 0;
        assert!(w.until(|| {
            calls += 1;
            match calls {
                1 => Ok(true),
                2 => Err(anyhow!("capture glitch")),
                _ => Ok(true),
            }
        }));
        assert_eq!(calls, 4);
    }

    #[test]
    fn abort_wins_over_true_predicate() {
        let flag = AbortFlag::new();
        flag.set();
        let w = Waiter::new("aborted", Duration::from_secs(5), polling(1), &flag);
        let start = Instant::now();
        let mut calls = 0;
        assert!(!w.until(|| {
            calls += 1;
            Ok(true)
        }));
        assert_eq!(calls, 0);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn until_any_reports_first_stable_index() {
        let w = Waiter::new("any", Duration::from_secs(2), polling(2), &NoAbort);
        let mut polls = 0;
        let hit = w.until_any(3, |i| {
            if i == 0 {
                polls += 1;
            }
            Ok(i == 2 && polls >= 2)
        });
        assert_eq!(hit, Some(2));
    }

    #[test]
    fn until_any_times_out() {
        let w = Waiter::new("any", Duration::from_millis(50), polling(1), &NoAbort);
        assert_eq!(w.until_any(2, |_| Ok(false)), None);
    }

    #[test]
    fn until_all_needs_every_predicate() {
        let w = Waiter::new("all", Duration::from_millis(80), polling(1), &NoAbort);
        assert!(!w.until_all(2, |i| Ok(i == 0)));

        let w = Waiter::new("all", Duration::from_secs(2), polling(2), &NoAbort);
        let mut polls = 0;
        assert!(w.until_all(2, |i| {
            if i == 0 {
                polls += 1;
            }
            Ok(i == 0 || polls >= 3)
        }));
        assert!(polls >= 4);
    }
}
