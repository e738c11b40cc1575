//! Pixel-driven perception and action engine for an uninstrumented window.
//!
//! Coordinates are authored against a fixed reference canvas and mapped onto
//! the live window; elements are recognized by anchor colors; every blocking
//! operation is a debounced, abortable poll.

pub mod abort;
pub mod action;
pub mod artifact;
pub mod color;
pub mod coords;
pub mod elements;
pub mod engine;
pub mod frame;
pub mod logger;
pub mod navigation;
pub mod platform;
pub mod settings;
pub mod sleep;
pub mod states;
pub mod types;
pub mod visibility;
pub mod wait;

pub use abort::{AbortFlag, AbortSource, NoAbort};
pub use action::{ColorMode, ColorWatch};
pub use color::Sampling;
pub use elements::{Anchor, Element, ElementRegistry, Profile};
pub use engine::{ClickTarget, Engine};
pub use navigation::Navigation;
pub use settings::EngineConfig;
pub use types::{Point, Rgb};
