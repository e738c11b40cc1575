use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{mpsc, Mutex, MutexGuard, OnceLock};

use anyhow::Result;
use chrono::Local;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

#[derive(Default)]
struct Logger {
    file: Option<File>,
    console: bool,
    sink: Option<mpsc::Sender<String>>,
    prefixes: HashMap<String, u8>, // prefix -> color index
}

// Color indices for console rendering
pub const COLOR_GRAY: u8 = 1;
pub const COLOR_BLUE: u8 = 2;
pub const COLOR_CYAN: u8 = 3;

fn logger() -> MutexGuard<'static, Logger> {
    let lock = LOGGER.get_or_init(|| Mutex::new(Logger::default()));
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Open `<log_dir>/glance.log`, truncating any previous run.
pub fn init(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_dir.join("glance.log"))?;
    logger().file = Some(file);
    Ok(())
}

/// Mirror INFO and above to stderr.
pub fn set_console(enabled: bool) {
    logger().console = enabled;
}

/// Forward every formatted line (all levels) to a channel.
pub fn set_sender(tx: mpsc::Sender<String>) {
    logger().sink = Some(tx);
}

/// Register a prefix with a color. All subsequent `*_p` calls with this
/// prefix are rendered in that color on the console.
pub fn register_prefix(prefix: &str, color: u8) {
    logger().prefixes.insert(prefix.to_string(), color);
}

fn ansi(color: u8) -> &'static str {
    match color {
        COLOR_GRAY => "\x1b[90m",
        COLOR_BLUE => "\x1b[94m",
        COLOR_CYAN => "\x1b[36m",
        _ => "",
    }
}

fn write_log(level: &str, prefix: &str, msg: &str) {
    let ts = Local::now().format("%H:%M:%S%.3f");

    let line = if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level, msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level, prefix, msg)
    };

    let mut l = logger();
    if let Some(file) = l.file.as_mut() {
        writeln!(file, "{}", line).ok();
    }
    let dropped = l.sink.as_ref().is_some_and(|tx| tx.send(line.clone()).is_err());
    if dropped {
        l.sink = None;
    }
    if l.console && level != "DEBUG" {
        let color = l.prefixes.get(prefix).copied().unwrap_or(0);
        let code = ansi(color);
        if code.is_empty() {
            eprintln!("{}", line);
        } else {
            eprintln!("{}{}\x1b[0m", code, line);
        }
    }
}

pub fn debug(msg: &str) {
    write_log("DEBUG", "", msg);
}

pub fn info(msg: &str) {
    write_log("INFO", "", msg);
}

pub fn warn(msg: &str) {
    write_log("WARN", "", msg);
}

pub fn error(msg: &str) {
    write_log("ERROR", "", msg);
}

pub fn debug_p(prefix: &str, msg: &str) {
    write_log("DEBUG", prefix, msg);
}

/// Log with a registered prefix.
pub fn info_p(prefix: &str, msg: &str) {
    write_log("INFO", prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log("WARN", prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log("ERROR", prefix, msg);
}
