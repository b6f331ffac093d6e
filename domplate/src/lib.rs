//! Attribute-directive HTML templates
//!
//! A template is ordinary HTML whose elements carry directive attributes:
//!
//! - `js-if="expr"` / `js-if-not="expr"` keep the element conditionally
//! - `js-each="item in items"` repeats the element once per array item
//! - `js-value="expr"` replaces the element's content with text
//! - `js-attr-<name>="expr"` sets attribute `<name>`
//!
//! The template is parsed once into a DOM. Each render clones that DOM,
//! rewrites it against the caller's data and serializes the result.
//!
//! ```
//! use serde_json::json;
//!
//! let template = domplate::Template::compile(
//!     r#"<ul><li js-each="user in users" js-value="user.name"></li></ul>"#,
//! ).unwrap();
//! let html = template.render(&json!({"users": [{"name": "Alice"}, {"name": "Bob"}]}), true);
//! assert_eq!(html, "<ul><li>Alice</li><li>Bob</li></ul>");
//! ```

pub mod dom;
pub mod error;
pub mod expr;
pub mod options;
pub mod render;
pub mod scope;
pub mod template;

pub use error::{RenderError, TemplateError};
pub use expr::{EvalError, ParseError, Value, evaluate};
pub use options::{GlobalBinding, RenderOptions};
pub use render::Processor;
pub use scope::Scope;
pub use template::{Template, render_template};
