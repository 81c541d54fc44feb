//! Rendering
//!
//! Serializes a component sequence back to document text. In [`RenderMode::Source`]
//! every directive is re-emitted in its exact original form, so the output is itself a
//! valid regeneration input. Rendered data slots read their value from the page state
//! at render time, which is how script results reach the output.
//!
//! [`RenderMode::Published`] strips the directives and keeps only visible content.

use crate::component::{Component, SlotKind};
use crate::page_state::PageState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Round-trippable output with all directives
    #[default]
    Source,
    /// Visible content only
    Published,
}

pub fn render_document(components: &[Component], state: &PageState, mode: RenderMode) -> String {
    components
        .iter()
        .map(|component| render_component(component, state, mode))
        .collect()
}

pub fn render_component(component: &Component, state: &PageState, mode: RenderMode) -> String {
    match (component, mode) {
        (Component::PlainText(text), _) => format!("{}\n", text.body.text()),
        (Component::Script(script), RenderMode::Source) => format!(
            "<!-- [{keyword}\n{}\n{keyword}] -->\n",
            script.body.text(),
            keyword = script.keyword
        ),
        (Component::ClassSelector(selector), RenderMode::Source) => {
            format!("<!-- [{} {}] -->\n", selector.keyword, selector.identifier)
        }
        (Component::DataSlot(slot), RenderMode::Source) => {
            let value = state.get(&slot.name).unwrap_or_default();
            match slot.kind {
                SlotKind::Rendered if value.is_empty() => format!("<!-- [{}] -->\n", slot.name),
                SlotKind::Rendered => {
                    format!("<!-- [{name} -->\n{value}\n<!-- {name}] -->\n", name = slot.name)
                }
                SlotKind::CommentOnly => {
                    format!("<!-- [{name}\n{value}\n{name}] -->\n", name = slot.name)
                }
            }
        }
        (Component::DataSlot(slot), RenderMode::Published) if slot.kind == SlotKind::Rendered => {
            match state.get(&slot.name) {
                Some(value) if !value.is_empty() => format!("{value}\n"),
                _ => String::new(),
            }
        }
        (_, RenderMode::Published) => String::new(),
    }
}
