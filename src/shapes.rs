//! Page-state shapes
//!
//! A shape is a named page-state layout that a `<!-- [class Name] -->` directive
//! selects mid-document. Shapes live in an immutable [`ShapeRegistry`]: the built-in
//! registry is initialized once per process, and a configured registry is assembled once
//! at startup and then only read.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Name of the shape every document starts with.
pub const DEFAULT_SHAPE: &str = "Page";

/// Built-in shapes, shared by every document that does not use a configured registry.
pub static BUILT_IN_SHAPES: Lazy<ShapeRegistry> = Lazy::new(ShapeRegistry::with_defaults);

/// A named page-state layout and the slot values it starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageShape {
    pub name: String,
    pub description: String,
    pub defaults: BTreeMap<String, String>,
}

impl PageShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            defaults: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default(mut self, slot: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(slot.into(), value.into());
        self
    }
}

/// Lookup from shape identifier to shape.
#[derive(Debug, Clone)]
pub struct ShapeRegistry {
    shapes: BTreeMap<String, PageShape>,
    default_shape: PageShape,
}

impl ShapeRegistry {
    /// Registry holding only the default `Page` shape
    pub fn with_defaults() -> Self {
        let default_shape =
            PageShape::new(DEFAULT_SHAPE).with_description("Plain page with no preset slots");
        let mut shapes = BTreeMap::new();
        shapes.insert(default_shape.name.clone(), default_shape.clone());
        Self {
            shapes,
            default_shape,
        }
    }

    /// The default registry extended with `shapes`. A configured shape named like a
    /// built-in one replaces it.
    pub fn with_shapes(shapes: impl IntoIterator<Item = PageShape>) -> Self {
        let mut registry = Self::with_defaults();
        for shape in shapes {
            if shape.name == DEFAULT_SHAPE {
                registry.default_shape = shape.clone();
            }
            registry.shapes.insert(shape.name.clone(), shape);
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<&PageShape> {
        self.shapes.get(name)
    }

    pub fn default_shape(&self) -> &PageShape {
        &self.default_shape
    }

    /// All shape names (sorted)
    pub fn names(&self) -> Vec<&str> {
        self.shapes.keys().map(String::as_str).collect()
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
