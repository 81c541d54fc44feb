//! Page State
//!
//! The named-slot store that data-slot components write into and that scripts read and
//! mutate. Slots live in an ordered map; three built-in slots describe the source file
//! and are reinstalled whenever the active shape changes.

use crate::shapes::PageShape;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Absolute path of the source document
pub const SOURCE_PATH_SLOT: &str = "source_path";
/// Directory containing the source document
pub const SOURCE_DIR_SLOT: &str = "source_dir";
/// File name of the source document
pub const BASE_FILE_NAME_SLOT: &str = "base_file_name";

pub const BUILT_IN_SLOTS: &[&str] = &[SOURCE_PATH_SLOT, SOURCE_DIR_SLOT, BASE_FILE_NAME_SLOT];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("slot {0:?} is built in and cannot be modified")]
    ReadOnly(String),
    #[error("{0:?} is not a valid slot name")]
    InvalidName(String),
}

pub fn is_built_in(slot: &str) -> bool {
    BUILT_IN_SLOTS.contains(&slot)
}

/// Slot name to text value mapping for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageState {
    shape: String,
    slots: BTreeMap<String, String>,
    #[serde(skip)]
    built_ins: [(String, String); 3],
}

impl PageState {
    /// A fresh state of the given shape for the document at `source_path`.
    pub fn new(shape: &PageShape, source_path: &Path) -> Self {
        let source_dir = source_path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let base_file_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let built_ins = [
            (SOURCE_PATH_SLOT.to_string(), source_path.display().to_string()),
            (SOURCE_DIR_SLOT.to_string(), source_dir),
            (BASE_FILE_NAME_SLOT.to_string(), base_file_name),
        ];

        let mut state = Self {
            shape: String::new(),
            slots: BTreeMap::new(),
            built_ins,
        };
        state.install_shape(shape);
        state
    }

    /// Swap to a freshly initialized instance of `shape`. Every previously set slot is
    /// discarded; the built-ins are reinstalled and the shape's defaults applied.
    pub fn install_shape(&mut self, shape: &PageShape) {
        self.shape = shape.name.clone();
        self.slots.clear();
        for (slot, value) in &self.built_ins {
            self.slots.insert(slot.clone(), value.clone());
        }
        for (slot, value) in &shape.defaults {
            if !is_built_in(slot) {
                self.slots.insert(slot.clone(), value.clone());
            }
        }
    }

    /// Name of the active shape
    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn get(&self, slot: &str) -> Option<&str> {
        self.slots.get(slot).map(String::as_str)
    }

    pub fn set(&mut self, slot: &str, value: impl Into<String>) -> Result<(), SlotError> {
        self.check_writable(slot)?;
        self.slots.insert(slot.to_string(), value.into());
        Ok(())
    }

    /// Make a slot absent again.
    pub fn clear(&mut self, slot: &str) -> Result<(), SlotError> {
        self.check_writable(slot)?;
        self.slots.remove(slot);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn check_writable(&self, slot: &str) -> Result<(), SlotError> {
        if is_built_in(slot) {
            return Err(SlotError::ReadOnly(slot.to_string()));
        }
        if !crate::directive::is_slot_name(slot) {
            return Err(SlotError::InvalidName(slot.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::ShapeRegistry;
    use std::path::PathBuf;

    fn state() -> PageState {
        let shapes = ShapeRegistry::with_defaults();
        PageState::new(shapes.default_shape(), &PathBuf::from("/site/docs/index.html"))
    }

    #[test]
    fn test_built_ins_are_populated() {
        let state = state();
        assert_eq!(state.get(SOURCE_PATH_SLOT), Some("/site/docs/index.html"));
        assert_eq!(state.get(SOURCE_DIR_SLOT), Some("/site/docs"));
        assert_eq!(state.get(BASE_FILE_NAME_SLOT), Some("index.html"));
    }

    #[test]
    fn test_built_ins_are_read_only() {
        let mut state = state();
        assert_eq!(
            state.set(BASE_FILE_NAME_SLOT, "other.html"),
            Err(SlotError::ReadOnly(BASE_FILE_NAME_SLOT.into()))
        );
        assert_eq!(
            state.clear(SOURCE_DIR_SLOT),
            Err(SlotError::ReadOnly(SOURCE_DIR_SLOT.into()))
        );
    }

    #[test]
    fn test_set_get_and_clear() {
        let mut state = state();
        state.set("title", "Hello").unwrap();
        assert_eq!(state.get("title"), Some("Hello"));
        state.clear("title").unwrap();
        assert_eq!(state.get("title"), None);
    }

    #[test]
    fn test_keyword_is_not_a_slot() {
        let mut state = state();
        assert_eq!(
            state.set("script", "x"),
            Err(SlotError::InvalidName("script".into()))
        );
    }

    #[test]
    fn test_install_shape_discards_slots_but_keeps_built_ins() {
        let mut state = state();
        state.set("title", "Hello").unwrap();

        let shape = PageShape::new("Article").with_default("layout", "article");
        state.install_shape(&shape);

        assert_eq!(state.shape(), "Article");
        assert_eq!(state.get("title"), None);
        assert_eq!(state.get("layout"), Some("article"));
        assert_eq!(state.get(BASE_FILE_NAME_SLOT), Some("index.html"));
    }
}
