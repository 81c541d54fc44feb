//! Component inspection
//!
//! Summaries of a parsed document for debugging directive layouts, either as JSON or
//! as an indented tree.

use crate::component::{Component, SlotKind};
use crate::document::Document;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ComponentSummary {
    PlainText {
        line: usize,
        lines: usize,
    },
    Script {
        line: usize,
        text: String,
    },
    ClassSelector {
        line: usize,
        identifier: String,
    },
    DataSlot {
        line: usize,
        name: String,
        slot: SlotKind,
        text: String,
    },
}

impl From<&Component> for ComponentSummary {
    fn from(component: &Component) -> Self {
        match component {
            Component::PlainText(c) => ComponentSummary::PlainText {
                line: c.start_line,
                lines: c.body.lines().len(),
            },
            Component::Script(c) => ComponentSummary::Script {
                line: c.start_line,
                text: c.body.text().to_string(),
            },
            Component::ClassSelector(c) => ComponentSummary::ClassSelector {
                line: c.start_line,
                identifier: c.identifier.clone(),
            },
            Component::DataSlot(c) => ComponentSummary::DataSlot {
                line: c.start_line,
                name: c.name.clone(),
                slot: c.kind,
                text: c.body.text().to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct DocumentSummary<'a> {
    source: String,
    shape: &'a str,
    components: Vec<ComponentSummary>,
    slots: Vec<(&'a str, &'a str)>,
}

pub fn summarize(document: &Document<'_>) -> Vec<ComponentSummary> {
    document.components().iter().map(Into::into).collect()
}

pub fn to_json(document: &Document<'_>) -> Result<String, serde_json::Error> {
    let summary = DocumentSummary {
        source: document.source_path().display().to_string(),
        shape: document.state().shape(),
        components: summarize(document),
        slots: document.state().iter().collect(),
    };
    serde_json::to_string_pretty(&summary)
}

pub fn to_tree(document: &Document<'_>) -> String {
    let mut out = format!("document {}\n", document.source_path().display());
    for summary in summarize(document) {
        let entry = match summary {
            ComponentSummary::PlainText { line, lines } => {
                format!("plain-text @{line} ({lines} lines)")
            }
            ComponentSummary::Script { line, text } => {
                format!("script @{line} ({} lines)", text.lines().count())
            }
            ComponentSummary::ClassSelector { line, identifier } => {
                format!("class @{line} {identifier}")
            }
            ComponentSummary::DataSlot {
                line,
                name,
                slot,
                text,
            } => {
                let kind = match slot {
                    SlotKind::Rendered => "rendered",
                    SlotKind::CommentOnly => "comment-only",
                };
                format!("slot @{line} {name} [{kind}] {text:?}")
            }
        };
        out.push_str("├─ ");
        out.push_str(&entry);
        out.push('\n');
    }
    out.push_str(&format!("└─ shape {}\n", document.state().shape()));
    out
}
