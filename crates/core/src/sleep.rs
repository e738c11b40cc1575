use rand::Rng;
use std::thread;
use std::time::Duration;

/// Sleep for a duration drawn uniformly from `[min_secs, max_secs]`.
pub fn sleep_between(min_secs: f64, max_secs: f64) {
    let lo = min_secs.max(0.0);
    let hi = max_secs.max(lo);
    let secs = if hi > lo {
        rand::thread_rng().gen_range(lo..=hi)
    } else {
        lo
    };
    if secs > 0.0 {
        thread::sleep(Duration::from_secs_f64(secs));
    }
}

/// Sleep for exact milliseconds (no jitter).
pub fn sleep_ms(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Offset `(x, y)` by up to `radius` pixels on each axis.
pub fn jitter(x: i32, y: i32, radius: i32) -> (i32, i32) {
    if radius <= 0 {
        return (x, y);
    }
    let mut rng = rand::thread_rng();
    (x + rng.gen_range(-radius..=radius), y + rng.gen_range(-radius..=radius))
}
