//! Compiled templates

use std::collections::BTreeMap;
use std::path::Path;

use crate::dom::{Document, parse_document};
use crate::error::{RenderError, TemplateError};
use crate::expr::{GLOBAL_NAME, Value};
use crate::options::{GlobalBinding, RenderOptions};
use crate::render::Processor;
use crate::render::directive::{self, LoopSpec};
use crate::scope::Scope;

/// A parsed template, rendered any number of times
///
/// The base document is never mutated: every render works on its own copy,
/// so a `Template` can be shared freely, including across threads.
#[derive(Debug, Clone)]
pub struct Template {
    document: Document,
    is_fragment: bool,
}

/// Whether source text is a fragment rather than a whole document
fn detect_fragment(source: &str) -> bool {
    let head = source.trim_start();
    let head = head.get(..9).unwrap_or(head).to_ascii_lowercase();
    !(head.starts_with("<!doctype") || head.starts_with("<html"))
}

impl Template {
    /// Parse a template, rejecting malformed `js-each` headers
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let is_fragment = detect_fragment(source);
        let document = parse_document(source);

        let elements = document.descendant_elements(document.root());
        for &id in &elements {
            if let Some(header) = document.get_attribute(id, directive::EACH) {
                if LoopSpec::parse(header).is_none() {
                    return Err(TemplateError::MalformedLoop {
                        spec: header.to_string(),
                    });
                }
            }
        }

        let directive_count = elements
            .iter()
            .filter(|&&id| {
                document
                    .attributes(id)
                    .iter()
                    .any(|(name, _)| directive::is_directive(name))
            })
            .count();
        log::debug!(
            "Compiled {} template: {} elements, {} with directives",
            if is_fragment { "fragment" } else { "document" },
            elements.len(),
            directive_count
        );

        Ok(Self {
            document,
            is_fragment,
        })
    }

    /// Read and compile a template file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded template from {}", path.display());
        Self::compile(&source)
    }

    /// Whether output is the body's content rather than a full document
    pub fn is_fragment(&self) -> bool {
        self.is_fragment
    }

    /// The base document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Render with `global` derived from `data` per the options
    pub fn render(&self, data: &serde_json::Value, options: impl Into<RenderOptions>) -> String {
        let options = options.into();
        let data = Value::from(data);
        let global = match options.global_binding {
            GlobalBinding::Direct => data.clone(),
            GlobalBinding::Wrapped => {
                let mut fields = BTreeMap::new();
                fields.insert(GLOBAL_NAME.to_string(), data.clone());
                Value::object(fields)
            }
        };
        self.render_values(data, global, options)
    }

    /// Render with an explicit global value
    pub fn render_with_global(
        &self,
        data: &serde_json::Value,
        global: &serde_json::Value,
        options: impl Into<RenderOptions>,
    ) -> String {
        self.render_values(Value::from(data), Value::from(global), options.into())
    }

    fn render_values(&self, data: Value, global: Value, options: RenderOptions) -> String {
        let mut doc = self.document.clone();
        let scope = Scope::root(data);
        let mut processor = Processor::new(global, options);

        let result = match doc.document_element() {
            Some(root) => processor.process(&mut doc, root, &scope),
            None => Err(RenderError::EmptyDocument),
        };
        if let Err(e) = result {
            log::error!("Render pass failed, serializing what was built: {}", e);
        }

        self.serialize(&doc)
    }

    fn serialize(&self, doc: &Document) -> String {
        if self.is_fragment {
            return doc
                .body()
                .or_else(|| doc.document_element())
                .map(|id| doc.inner_html(id))
                .unwrap_or_default();
        }

        let mut out = String::new();
        if let Some(doctype) = doc.doctype() {
            out.push_str(&doctype.to_string());
            out.push('\n');
        }
        if let Some(html) = doc.document_element() {
            out.push_str(&doc.outer_html(html));
        }
        out
    }
}

/// Compile and render in one step
pub fn render_template(
    source: &str,
    data: &serde_json::Value,
    options: impl Into<RenderOptions>,
) -> Result<String, TemplateError> {
    Ok(Template::compile(source)?.render(data, options))
}
