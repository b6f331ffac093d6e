//! Template and render errors

use crate::dom::DomError;

/// Failure while compiling a template
#[derive(Debug)]
pub enum TemplateError {
    /// A `js-each` value does not match `<name> in <expression>`
    MalformedLoop { spec: String },
    /// Reading a template file failed
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::MalformedLoop { spec } => write!(
                f,
                "malformed js-each \"{}\": expected \"<name> in <expression>\"",
                spec
            ),
            TemplateError::Io { path, source } => {
                write!(f, "failed to read template {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::MalformedLoop { .. } => None,
            TemplateError::Io { source, .. } => Some(source),
        }
    }
}

/// Failure during a processing pass
///
/// Expression failures never surface here; they evaluate to `undefined`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A structural tree operation failed
    Dom(DomError),
    /// The document has no element to process
    EmptyDocument,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Dom(e) => write!(f, "tree mutation failed: {}", e),
            RenderError::EmptyDocument => write!(f, "document has no root element"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Dom(e) => Some(e),
            RenderError::EmptyDocument => None,
        }
    }
}

impl From<DomError> for RenderError {
    fn from(e: DomError) -> Self {
        RenderError::Dom(e)
    }
}
