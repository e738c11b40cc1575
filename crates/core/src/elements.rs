use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{Point, Rgb};

/// One visibility test: the pixel at `point` (reference canvas) should be `color`.
/// Serialized as `[x, y, [r, g, b]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i32, i32, Rgb)", into = "(i32, i32, Rgb)")]
pub struct Anchor {
    pub point: Point,
    pub color: Rgb,
}

impl Anchor {
    pub const fn new(x: i32, y: i32, color: Rgb) -> Self {
        Self { point: Point::new(x, y), color }
    }
}

impl From<(i32, i32, Rgb)> for Anchor {
    fn from((x, y, color): (i32, i32, Rgb)) -> Self {
        Self::new(x, y, color)
    }
}

impl From<Anchor> for (i32, i32, Rgb) {
    fn from(a: Anchor) -> Self {
        (a.point.x, a.point.y, a.color)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub path: String,
    #[serde(default = "default_template_threshold")]
    pub threshold: f64,
}

fn default_template_threshold() -> f64 {
    0.85
}

/// Detection strategy of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum VisibilityCheck {
    /// Visible when every anchor matches in the same frame.
    PixelAnchors(Vec<Anchor>),
    /// Reserved: image template matching is not implemented; never visible.
    Template(TemplateRef),
}

/// A named, recognizable UI feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    /// None for click-only elements (tiles, buttons located by position).
    pub check: Option<VisibilityCheck>,
    pub click: Option<Point>,
    pub confidence: Option<f64>,
}

impl Element {
    pub fn anchors(name: &str, anchors: Vec<Anchor>) -> Self {
        Self {
            name: name.to_string(),
            check: Some(VisibilityCheck::PixelAnchors(anchors)),
            click: None,
            confidence: None,
        }
    }

    pub fn click_only(name: &str, x: i32, y: i32) -> Self {
        Self {
            name: name.to_string(),
            check: None,
            click: Some(Point::new(x, y)),
            confidence: None,
        }
    }

    pub fn with_click(mut self, x: i32, y: i32) -> Self {
        self.click = Some(Point::new(x, y));
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Preferred click point, else the first anchor.
    pub fn click_target(&self) -> Option<Point> {
        self.click.or_else(|| match &self.check {
            Some(VisibilityCheck::PixelAnchors(a)) => a.first().map(|a| a.point),
            _ => None,
        })
    }

    fn from_def(name: String, def: ElementDef) -> Self {
        let check = match (def.anchors.is_empty(), def.template) {
            (false, _) => Some(VisibilityCheck::PixelAnchors(def.anchors)),
            (true, Some(t)) => Some(VisibilityCheck::Template(t)),
            (true, None) => None,
        };
        Self { name, check, click: def.click, confidence: def.confidence }
    }
}

/// On-disk shape of an element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ElementDef {
    #[serde(default)]
    anchors: Vec<Anchor>,
    #[serde(default)]
    click: Option<Point>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    template: Option<TemplateRef>,
}

/// Immutable lookup of elements by name.
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    elements: HashMap<String, Element>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element: Element) {
        self.elements.insert(element.name.clone(), element);
    }

    pub fn with(mut self, element: Element) -> Self {
        self.insert(element);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Element> {
        self.elements.get(name)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Authored data for one target application: elements plus the state map.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub elements: ElementRegistry,
    /// state name -> indicator element name
    pub states: HashMap<String, String>,
}

#[derive(Deserialize)]
struct ProfileDef {
    #[serde(default)]
    elements: HashMap<String, ElementDef>,
    #[serde(default)]
    states: HashMap<String, String>,
}

impl Profile {
    pub fn from_json(s: &str) -> Result<Self> {
        let def: ProfileDef = serde_json::from_str(s)?;
        let mut elements = ElementRegistry::new();
        for (name, e) in def.elements {
            elements.insert(Element::from_def(name, e));
        }
        Ok(Self { elements, states: def.states })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        Self::from_json(&s).with_context(|| format!("parsing profile {}", path.display()))
    }
}
