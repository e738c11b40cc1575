use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::logger;
use crate::types::Rgb;

/// All tunables consumed by the engine. Every field has a default so partial
/// JSON files are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timeouts: Timeouts,
    pub colors: Colors,
    pub clicks: Clicks,
    pub safety: Safety,
    pub observability: Observability,
    pub window: WindowConfig,
    pub recovery: RecoveryConfig,
    pub navigation: NavigationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub default_timeout_s: f64,
    pub check_interval_min_s: f64,
    pub check_interval_max_s: f64,
    /// Consecutive confirmations required before a wait succeeds.
    pub stability_frames: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_timeout_s: 10.0,
            check_interval_min_s: 0.05,
            check_interval_max_s: 0.15,
            stability_frames: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Colors {
    /// 0..1, where 1.0 means exact match
    pub default_confidence: f64,
    /// 2 => 5x5 sampling window
    pub roi_half_size: u32,
}

impl Default for Colors {
    fn default() -> Self {
        Self { default_confidence: 0.95, roi_half_size: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clicks {
    pub jitter_radius_px: i32,
    pub post_click_grace_ms: u64,
    pub spam_click_delay_ms: u64,
}

impl Default for Clicks {
    fn default() -> Self {
        Self { jitter_radius_px: 3, post_click_grace_ms: 80, spam_click_delay_ms: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Safety {
    /// Log clicks instead of performing them.
    pub dry_run: bool,
    pub enable_panic_key: bool,
    pub panic_key: String,
}

impl Default for Safety {
    fn default() -> Self {
        Self { dry_run: false, enable_panic_key: true, panic_key: "f8".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Observability {
    pub enable_failure_screenshots: bool,
    pub artifacts_dir: String,
    pub annotation_color: Rgb,
    pub annotation_thickness_px: u32,
    /// Log expected vs. observed color for every anchor check.
    pub verbose_checks: bool,
}

impl Default for Observability {
    fn default() -> Self {
        Self {
            enable_failure_screenshots: true,
            artifacts_dir: "logs".into(),
            annotation_color: Rgb::new(255, 165, 0),
            annotation_thickness_px: 2,
            verbose_checks: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Preferred exact window title.
    pub title: String,
    /// Case-insensitive regex used when no exact title matches.
    pub title_pattern: String,
    pub exclude_keywords: Vec<String>,
    pub windowed_mode: bool,
    pub windowed_preset: String,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub frame_max_age_ms: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "BlueStacks App Player".into(),
            title_pattern: "(?i)arknights".into(),
            exclude_keywords: vec![
                "glance".into(),
                "visual studio code".into(),
                ".rs".into(),
            ],
            windowed_mode: false,
            windowed_preset: "google_play".into(),
            canvas_width: 1920,
            canvas_height: 1080,
            frame_max_age_ms: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub home_state: String,
    pub back_element: String,
    pub max_presses: u32,
    pub gone_timeout_ms: u64,
    pub appear_timeout_ms: u64,
    pub final_timeout_s: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            home_state: "main_menu".into(),
            back_element: "back_button".into(),
            max_presses: 6,
            gone_timeout_ms: 100,
            appear_timeout_ms: 250,
            final_timeout_s: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub default_retries: u32,
    pub wait_visible_after_click: bool,
    pub post_click_timeout_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self { default_retries: 21, wait_visible_after_click: true, post_click_timeout_ms: 100 }
    }
}

impl EngineConfig {
    /// Load from a JSON file, falling back to defaults on any error.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::from_json(&s).unwrap_or_else(|e| {
                logger::warn(&format!("invalid config {}: {}, using defaults", path.display(), e));
                Self::default()
            }),
            Err(_) => {
                logger::info(&format!("no config at {}, using defaults", path.display()));
                Self::default()
            }
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Deterministic, fast values: no jitter, no grace, single stability frame.
    pub fn for_tests() -> Self {
        let mut cfg = Self::default();
        cfg.timeouts = Timeouts {
            default_timeout_s: 0.3,
            check_interval_min_s: 0.01,
            check_interval_max_s: 0.02,
            stability_frames: 1,
        };
        cfg.clicks = Clicks { jitter_radius_px: 0, post_click_grace_ms: 0, spam_click_delay_ms: 10 };
        cfg.safety.enable_panic_key = false;
        cfg.observability.enable_failure_screenshots = false;
        cfg.window.frame_max_age_ms = 0;
        cfg.recovery = RecoveryConfig {
            max_presses: 2,
            gone_timeout_ms: 20,
            appear_timeout_ms: 20,
            final_timeout_s: 0.05,
            ..RecoveryConfig::default()
        };
        cfg.navigation = NavigationConfig {
            default_retries: 2,
            wait_visible_after_click: true,
            post_click_timeout_ms: 20,
        };
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = EngineConfig::from_json(r#"{"safety": {"dry_run": true}}"#).unwrap();
        assert!(cfg.safety.dry_run);
        assert_eq!(cfg.safety.panic_key, "f8");
        assert_eq!(cfg.timeouts.stability_frames, 2);
        assert_eq!(cfg.colors.default_confidence, 0.95);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let cfg = EngineConfig::load(Path::new("/nonexistent/glance/settings.json"));
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut cfg = EngineConfig::default();
        cfg.clicks.jitter_radius_px = 7;
        cfg.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).clicks.jitter_radius_px, 7);
    }
}
