//! Deck Merge
//!
//! Data binding for presentation templates: finding `{{tokens}}` in part
//! text, describing the fields a template may use, and merging a
//! hierarchical data tree into template text.
//!
//! # Features
//!
//! - Token extraction (`{{name}}`, `{{#loop}}`, `{{/loop}}`) with repair of
//!   tokens split across text runs
//! - A data-driven catalog of system fields
//! - Scoped rendering with nested loops, derived fields and XML escaping
//! - Strict mode for templates that must not reference unknown data
//!
//! # Example
//!
//! ```rust
//! use deck_merge::{extract, MergeEngine, RenderOptions};
//! use serde_json::json;
//!
//! let text = "<a:t>{{#workstations}}{{index}}. {{name}} {{/workstations}}</a:t>";
//! let tokens = extract(text);
//! assert!(tokens.loops.contains("workstations"));
//!
//! let engine = MergeEngine::new(RenderOptions::default());
//! let root = engine.prepare(&json!({"workstations": [{"name": "Infeed"}, {"name": "Outfeed"}]}));
//! let out = engine.render_text(text, &root).unwrap();
//! assert_eq!(out, "<a:t>1. Infeed 2. Outfeed </a:t>");
//! ```

mod bindings;
mod context;
mod error;
mod value;
pub mod catalog;
pub mod engine;
pub mod template;
pub mod token;

pub use bindings::{BindingRules, CountRule};
pub use catalog::{
    build_field_catalog, FieldCatalog, FieldCategory, FieldDescriptor, FieldKind, FieldSource,
    SystemField,
};
pub use context::RenderContext;
pub use engine::{escape_xml, MergeEngine, RenderOptions};
pub use error::{MergeError, Result, TemplateIssue};
pub use template::{Node, Template};
pub use token::{extract, heal_split_tokens, scan, LocatedToken, Token, TokenSet};
pub use value::{Scalar, Scope, Value};
