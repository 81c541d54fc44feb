//! Directive Line Recognition
//!
//! Recognizes the comment directives embedded in a regenerated document. A directive
//! is a single line made of up to four markers around a name:
//!
//! ```text
//! <!-- [title] -->            self-contained slot reference
//! <!-- [title -->             open a rendered slot ... <!-- title] -->
//! <!-- [summary               open a comment-only slot ... summary] -->
//! <!-- [script                open a script block ... script] -->
//! <!-- [class Article] -->    select a page-state shape
//! ```
//!
//! A line only counts as a directive when it carries at least one comment marker
//! (`<!--` or `-->`) AND at least one section marker (`[` or `]`). Everything else is
//! plain text, even when it superficially matches the loose pattern (a lone word, say).
//!
//! Recognition happens in two steps: the loose regex extracts the markers, then
//! [`DirectiveLine::validate`] rejects directive-shaped lines that are malformed.

use crate::page_state::is_built_in;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The loose directive pattern.
///
/// Groups: 1 comment open, 2 section open, 3 name, 5 argument, 6 section close,
/// 7 comment close.
static DIRECTIVE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(<!--\s*|)(\[|)([_a-zA-Z][_a-zA-Z0-9]*)(|\s+([_a-zA-Z0-9]*))(\]|)(\s*-->|)\s*$",
    )
    .expect("directive pattern is a valid regex")
});

/// Reserved directive keywords. Matched case-insensitively.
pub const RESERVED_KEYWORDS: &[&str] = &["script", "class"];

/// What a directive's name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectiveKind {
    /// A named page-state slot
    DataSlot,
    /// `script` block
    Script,
    /// `class` shape selector
    Class,
}

impl DirectiveKind {
    /// Classify a name: reserved keywords win, anything else addresses a slot.
    pub fn of_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("script") {
            DirectiveKind::Script
        } else if name.eq_ignore_ascii_case("class") {
            DirectiveKind::Class
        } else {
            DirectiveKind::DataSlot
        }
    }
}

/// Structural problems with a directive-shaped line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("unknown directive name {0:?}")]
    UnknownName(String),
    #[error("empty section, but the line is not a closed comment")]
    EmptySectionNotClosedComment,
    #[error("end of section in a comment start")]
    SectionEndInCommentStart,
    #[error("start of section in a comment end")]
    SectionStartInCommentEnd,
    #[error("empty script section, scripts must have a body")]
    EmptyScript,
    #[error("reserved keyword {0:?} used as a slot name")]
    KeywordAsSlot(String),
    #[error("built-in slot {0:?} is read-only and cannot be used as a data slot")]
    BuiltInAsSlot(String),
    #[error("unexpected argument {value:?} after {name:?}")]
    UnexpectedArgument { name: String, value: String },
    #[error("class directive requires a shape identifier")]
    MissingClassIdentifier,
    #[error("class directive must be a single self-contained line")]
    ClassNotSelfContained,
    #[error("script markers must not close and reopen the comment")]
    ScriptCommentMarkers,
}

/// The parsed result of matching one input line against the directive grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectiveLine {
    pub has_comment_open: bool,
    pub has_comment_close: bool,
    pub has_section_open: bool,
    pub has_section_close: bool,
    pub is_data_slot: bool,
    /// Slot name, or the reserved keyword as written
    pub name: String,
    /// Inline argument, only meaningful for `class`
    pub value: Option<String>,
}

impl DirectiveLine {
    /// Match the loose pattern without validating. Returns `None` when the line does not
    /// have the directive shape at all.
    pub fn match_line(line: &str) -> Option<Self> {
        let caps = DIRECTIVE_REGEX.captures(line)?;
        let present = |i: usize| caps.get(i).is_some_and(|m| !m.as_str().is_empty());
        let name = caps.get(3).map(|m| m.as_str().to_string())?;
        let value = caps
            .get(5)
            .map(|m| m.as_str())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Some(Self {
            has_comment_open: present(1),
            has_section_open: present(2),
            has_section_close: present(6),
            has_comment_close: present(7),
            is_data_slot: DirectiveKind::of_name(&name) == DirectiveKind::DataSlot,
            name,
            value,
        })
    }

    /// Whether the markers make this a directive rather than plain text.
    pub fn is_directive(&self) -> bool {
        (self.has_comment_open || self.has_comment_close)
            && (self.has_section_open || self.has_section_close)
    }

    pub fn kind(&self) -> DirectiveKind {
        DirectiveKind::of_name(&self.name)
    }

    /// `[name]` on one line
    pub fn is_self_closing(&self) -> bool {
        self.has_section_open && self.has_section_close
    }

    /// Structural validation. Only meaningful once [`is_directive`](Self::is_directive)
    /// holds.
    pub fn validate(&self) -> Result<(), GrammarError> {
        let kind = self.kind();
        if kind == DirectiveKind::DataSlot && !is_slot_name(&self.name) {
            return Err(GrammarError::UnknownName(self.name.clone()));
        }
        if kind == DirectiveKind::DataSlot && is_built_in(&self.name) {
            return Err(GrammarError::BuiltInAsSlot(self.name.clone()));
        }
        if self.is_self_closing() && !(self.has_comment_open && self.has_comment_close) {
            return Err(GrammarError::EmptySectionNotClosedComment);
        }
        if !self.has_section_open && !self.has_comment_close {
            return Err(GrammarError::SectionEndInCommentStart);
        }
        if !self.has_section_close && !self.has_comment_open {
            return Err(GrammarError::SectionStartInCommentEnd);
        }

        match kind {
            DirectiveKind::DataSlot => {
                if let Some(value) = &self.value {
                    return Err(GrammarError::UnexpectedArgument {
                        name: self.name.clone(),
                        value: value.clone(),
                    });
                }
            }
            DirectiveKind::Script => {
                if self.is_self_closing() {
                    return Err(GrammarError::EmptyScript);
                }
                if let Some(value) = &self.value {
                    return Err(GrammarError::UnexpectedArgument {
                        name: self.name.clone(),
                        value: value.clone(),
                    });
                }
                // `<!-- [script -->` is the rendered-slot form
                if self.has_section_open && self.has_comment_close {
                    return Err(GrammarError::KeywordAsSlot(self.name.clone()));
                }
                if self.has_section_close && self.has_comment_open {
                    return Err(GrammarError::ScriptCommentMarkers);
                }
            }
            DirectiveKind::Class => {
                if !self.is_self_closing() {
                    return Err(GrammarError::ClassNotSelfContained);
                }
                if self.value.is_none() {
                    return Err(GrammarError::MissingClassIdentifier);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for DirectiveLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_comment_open {
            write!(f, "<!-- ")?;
        }
        if self.has_section_open {
            write!(f, "[")?;
        }
        write!(f, "{}", self.name)?;
        if let Some(value) = &self.value {
            write!(f, " {}", value)?;
        }
        if self.has_section_close {
            write!(f, "]")?;
        }
        if self.has_comment_close {
            write!(f, " -->")?;
        }
        Ok(())
    }
}

/// Slot names are plain identifiers and never a reserved keyword.
pub fn is_slot_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic());
    starts_well
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        && !RESERVED_KEYWORDS
            .iter()
            .any(|k| k.eq_ignore_ascii_case(name))
}

/// Classify one line (already stripped of its terminator).
///
/// Returns `Ok(None)` for plain text and `Ok(Some(_))` for a valid directive.
pub fn recognize(line: &str) -> Result<Option<DirectiveLine>, GrammarError> {
    match DirectiveLine::match_line(line) {
        Some(directive) if directive.is_directive() => {
            directive.validate()?;
            Ok(Some(directive))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn directive(line: &str) -> DirectiveLine {
        recognize(line)
            .expect("valid directive")
            .expect("line is a directive")
    }

    #[test]
    fn test_self_contained_slot() {
        let d = directive("<!-- [title] -->");
        assert!(d.has_comment_open && d.has_comment_close);
        assert!(d.has_section_open && d.has_section_close);
        assert!(d.is_data_slot);
        assert_eq!(d.name, "title");
        assert_eq!(d.value, None);
    }

    #[test]
    fn test_rendered_slot_open_and_close() {
        let open = directive("<!-- [title -->");
        assert!(open.has_comment_open && open.has_comment_close);
        assert!(open.has_section_open && !open.has_section_close);

        let close = directive("<!-- title] -->");
        assert!(close.has_comment_open && close.has_comment_close);
        assert!(!close.has_section_open && close.has_section_close);
    }

    #[test]
    fn test_comment_only_slot_markers() {
        let open = directive("<!-- [summary");
        assert!(open.has_comment_open && !open.has_comment_close);
        let close = directive("summary] -->");
        assert!(!close.has_comment_open && close.has_comment_close);
    }

    #[test]
    fn test_class_directive_carries_identifier() {
        let d = directive("<!-- [class Article] -->");
        assert_eq!(d.kind(), DirectiveKind::Class);
        assert!(!d.is_data_slot);
        assert_eq!(d.value.as_deref(), Some("Article"));
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(directive("<!-- [SCRIPT").kind(), DirectiveKind::Script);
        assert_eq!(directive("<!-- [Class Page] -->").kind(), DirectiveKind::Class);
    }

    #[test]
    fn test_surrounding_whitespace_is_tolerated() {
        let d = directive("   <!--   [title]   -->   ");
        assert_eq!(d.name, "title");
        assert!(d.is_self_closing());
    }

    #[rstest]
    #[case::bare_word("Hello")]
    #[case::bracketed_word("[Hello]")]
    #[case::section_close_only("Hello]")]
    #[case::comment_without_section("<!-- Hello -->")]
    #[case::comment_open_only("<!-- note")]
    #[case::empty("")]
    #[case::markup("<p>Hello</p>")]
    #[case::two_words("Hello world")]
    fn test_plain_text_lines(#[case] line: &str) {
        assert_eq!(recognize(line), Ok(None));
    }

    #[rstest]
    #[case::bracketed_in_open_comment("<!-- [title]", GrammarError::EmptySectionNotClosedComment)]
    #[case::close_in_comment_start("<!-- title]", GrammarError::SectionEndInCommentStart)]
    #[case::open_in_comment_end("[title -->", GrammarError::SectionStartInCommentEnd)]
    #[case::empty_script("<!-- [script] -->", GrammarError::EmptyScript)]
    #[case::script_as_rendered_slot("<!-- [script -->", GrammarError::KeywordAsSlot("script".into()))]
    #[case::built_in_self_contained(
        "<!-- [base_file_name] -->",
        GrammarError::BuiltInAsSlot("base_file_name".into())
    )]
    #[case::built_in_comment_only("<!-- [source_dir", GrammarError::BuiltInAsSlot("source_dir".into()))]
    #[case::script_close_reopens("<!-- script] -->", GrammarError::ScriptCommentMarkers)]
    #[case::class_without_identifier("<!-- [class] -->", GrammarError::MissingClassIdentifier)]
    #[case::class_open_form("<!-- [class Page -->", GrammarError::ClassNotSelfContained)]
    fn test_malformed_directives(#[case] line: &str, #[case] expected: GrammarError) {
        assert_eq!(recognize(line), Err(expected));
    }

    #[test]
    fn test_argument_on_slot_is_rejected() {
        assert_eq!(
            recognize("<!-- [title main] -->"),
            Err(GrammarError::UnexpectedArgument {
                name: "title".into(),
                value: "main".into(),
            })
        );
    }

    #[test]
    fn test_slot_names_exclude_keywords() {
        assert!(is_slot_name("title"));
        assert!(is_slot_name("_private2"));
        assert!(!is_slot_name("Script"));
        assert!(!is_slot_name("2fast"));
    }

    #[test]
    fn test_display_reconstructs_markers() {
        assert_eq!(directive("<!-- [title -->").to_string(), "<!-- [title -->");
        assert_eq!(directive("summary] -->").to_string(), "summary] -->");
    }
}
