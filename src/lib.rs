//! # regenerate
//!
//! Regenerates static HTML/XML documents from comment directives embedded in them.
//!
//! A document is ordinary markup interleaved with directive lines:
//!
//! ```text
//! <!-- [class Article] -->
//! <!-- [script
//! ...
//! script] -->
//! <h1>
//! <!-- [title -->
//! Hello
//! <!-- title] -->
//! </h1>
//! ```
//!
//! The [`document`] parser splits a file into [`component`]s, data slots populate the
//! [`page_state`], queued scripts run through a host-supplied [`script`] executor, and
//! [`render`] writes the directives back in their exact form so the output is a valid
//! input for the next run. The [`writer`] keeps one backup generation and can verify
//! that a run changed nothing.
//!
//! Entry points for callers that walk a site tree are
//! [`Regenerator::regenerate_in_place`] and [`Regenerator::regenerate_to_output`].

pub mod component;
pub mod directive;
pub mod document;
pub mod inspect;
pub mod page_state;
pub mod regenerate;
pub mod render;
pub mod script;
pub mod shapes;
pub mod writer;

pub use document::{Document, ParseError};
pub use regenerate::{RegenerateError, RegenerateOptions, RegenerationReport, Regenerator};
pub use render::RenderMode;
pub use script::{NoScripts, ProcessExecutor, ScriptExecutor};
pub use shapes::{PageShape, ShapeRegistry, BUILT_IN_SHAPES};
