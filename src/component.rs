//! Components
//!
//! A document is split into an ordered sequence of components, each a contiguous run of
//! lines forming one semantic unit. Every component accumulates raw lines while it is
//! open and gets a finalized text when it closes. Closing is also when a component
//! takes effect on the page: data slots write their text into the page state, class
//! selectors swap the page-state shape and scripts join the execution queue.

use crate::directive::{DirectiveKind, DirectiveLine};
use crate::document::{PageContext, QueuedScript, StateError};
use serde::Serialize;
use tracing::debug;

/// Lines of a component plus its finalized text (absent until closed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    lines: Vec<String>,
    text: Option<String>,
}

impl Body {
    pub fn push_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn finish(&mut self) {
        self.text = Some(self.lines.join("\n"));
    }

    pub fn is_finished(&self) -> bool {
        self.text.is_some()
    }

    /// Finalized text, or an empty string while still open
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// How a data slot's content appears in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotKind {
    /// Content is both the slot value and literal markup in the output
    Rendered,
    /// Content is input-only metadata kept inside a comment
    CommentOnly,
}

/// Literal markup between directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainText {
    pub start_line: usize,
    pub body: Body,
}

/// A script block, queued for execution when it closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub start_line: usize,
    /// Keyword as written, e.g. `script` or `Script`
    pub keyword: String,
    pub body: Body,
}

impl Script {
    /// Line number of the first body line, used for script diagnostics.
    pub fn line_number(&self) -> usize {
        self.start_line + 1
    }
}

/// `<!-- [class Identifier] -->`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSelector {
    pub start_line: usize,
    pub keyword: String,
    pub identifier: String,
    pub body: Body,
}

/// A named page-state slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSlot {
    pub start_line: usize,
    pub name: String,
    pub kind: SlotKind,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    PlainText(PlainText),
    Script(Script),
    ClassSelector(ClassSelector),
    DataSlot(DataSlot),
}

impl Component {
    pub fn plain_text(start_line: usize) -> Self {
        Component::PlainText(PlainText {
            start_line,
            body: Body::default(),
        })
    }

    /// Build the component that an opening directive starts.
    pub fn open(directive: &DirectiveLine, start_line: usize) -> Self {
        match directive.kind() {
            DirectiveKind::Script => Component::Script(Script {
                start_line,
                keyword: directive.name.clone(),
                body: Body::default(),
            }),
            DirectiveKind::Class => Component::ClassSelector(ClassSelector {
                start_line,
                keyword: directive.name.clone(),
                identifier: directive.value.clone().unwrap_or_default(),
                body: Body::default(),
            }),
            DirectiveKind::DataSlot => Component::DataSlot(DataSlot {
                start_line,
                name: directive.name.clone(),
                kind: if directive.has_comment_close {
                    SlotKind::Rendered
                } else {
                    SlotKind::CommentOnly
                },
                body: Body::default(),
            }),
        }
    }

    pub fn body(&self) -> &Body {
        match self {
            Component::PlainText(c) => &c.body,
            Component::Script(c) => &c.body,
            Component::ClassSelector(c) => &c.body,
            Component::DataSlot(c) => &c.body,
        }
    }

    fn body_mut(&mut self) -> &mut Body {
        match self {
            Component::PlainText(c) => &mut c.body,
            Component::Script(c) => &mut c.body,
            Component::ClassSelector(c) => &mut c.body,
            Component::DataSlot(c) => &mut c.body,
        }
    }

    pub fn start_line(&self) -> usize {
        match self {
            Component::PlainText(c) => c.start_line,
            Component::Script(c) => c.start_line,
            Component::ClassSelector(c) => c.start_line,
            Component::DataSlot(c) => c.start_line,
        }
    }

    /// Directive name; plain text has none.
    pub fn name(&self) -> Option<&str> {
        match self {
            Component::PlainText(_) => None,
            Component::Script(c) => Some(&c.keyword),
            Component::ClassSelector(c) => Some(&c.keyword),
            Component::DataSlot(c) => Some(&c.name),
        }
    }

    pub fn text(&self) -> &str {
        self.body().text()
    }

    pub fn is_finished(&self) -> bool {
        self.body().is_finished()
    }

    pub fn is_plain_text(&self) -> bool {
        matches!(self, Component::PlainText(_))
    }

    pub fn push_line(&mut self, line: &str) {
        self.body_mut().push_line(line);
    }

    /// Finalize without a closing directive: plain text at a directive or end of input,
    /// or a named component whose opening line was self-closing.
    pub fn finish(&mut self, ctx: &mut PageContext<'_>) -> Result<(), StateError> {
        self.body_mut().finish();
        self.add_to_page(ctx)
    }

    /// Finalize on the directive that closes this component.
    pub fn close(
        &mut self,
        closing: &DirectiveLine,
        ctx: &mut PageContext<'_>,
    ) -> Result<(), StateError> {
        self.body_mut().finish();
        self.check_closing_name(closing)?;
        if let Component::DataSlot(slot) = self {
            match slot.kind {
                SlotKind::Rendered if !closing.has_comment_open => {
                    return Err(StateError::RenderedCloseWithoutCommentStart(
                        slot.name.clone(),
                    ));
                }
                SlotKind::CommentOnly if closing.has_comment_open => {
                    return Err(StateError::CommentCloseWithCommentStart(slot.name.clone()));
                }
                _ => {}
            }
        }
        self.add_to_page(ctx)
    }

    fn check_closing_name(&self, closing: &DirectiveLine) -> Result<(), StateError> {
        let matches = match self {
            Component::PlainText(_) => false,
            Component::Script(_) => closing.kind() == DirectiveKind::Script,
            Component::ClassSelector(_) => closing.kind() == DirectiveKind::Class,
            Component::DataSlot(slot) => closing.is_data_slot && closing.name == slot.name,
        };
        if matches {
            return Ok(());
        }
        Err(StateError::NameMismatch {
            open: self.name().unwrap_or_default().to_string(),
            close: closing.name.clone(),
        })
    }

    fn add_to_page(&self, ctx: &mut PageContext<'_>) -> Result<(), StateError> {
        match self {
            Component::PlainText(_) => Ok(()),
            Component::Script(script) => {
                debug!(line = script.line_number(), "queued script");
                ctx.scripts.push(QueuedScript {
                    line_number: script.line_number(),
                    source: script.body.text().to_string(),
                });
                Ok(())
            }
            Component::ClassSelector(selector) => {
                let shape = ctx
                    .shapes
                    .get(&selector.identifier)
                    .ok_or_else(|| StateError::UnknownShape(selector.identifier.clone()))?;
                debug!(shape = %shape.name, "installing page shape");
                ctx.state.install_shape(shape);
                Ok(())
            }
            Component::DataSlot(slot) => {
                ctx.state
                    .set(&slot.name, slot.body.text())
                    .map_err(StateError::Slot)
            }
        }
    }
}
