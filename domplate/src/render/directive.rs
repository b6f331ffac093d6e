//! Directive attribute names and the loop header grammar

use once_cell::sync::Lazy;
use regex::Regex;

/// Keep the element only when the expression is truthy
pub const IF: &str = "js-if";
/// Keep the element only when the expression is falsy
pub const IF_NOT: &str = "js-if-not";
/// Repeat the element once per item: `item in items`
pub const EACH: &str = "js-each";
/// Replace the element's content with the expression's text
pub const VALUE: &str = "js-value";
/// `js-attr-<name>` binds attribute `<name>`
pub const ATTR_PREFIX: &str = "js-attr-";

static LOOP_SPEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_$][\w$]*)\s+in\s+(.+?)\s*$").expect("loop pattern is valid")
});

/// Whether an attribute name is one of the directives
pub fn is_directive(name: &str) -> bool {
    matches!(name, IF | IF_NOT | EACH | VALUE) || name.starts_with(ATTR_PREFIX)
}

/// Whether `name` can be set as an attribute and serialized back
///
/// Rejects the characters `setAttribute` refuses with an
/// `InvalidCharacterError`, plus those that would break the markup.
pub fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace()
                || c.is_control()
                || matches!(c, '"' | '\'' | '<' | '>' | '/' | '=')
        })
}

/// Parsed `js-each` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSpec {
    /// Name bound to each item
    pub variable: String,
    /// Expression producing the collection
    pub collection: String,
}

impl LoopSpec {
    /// Parse `<name> in <expression>`; `None` when malformed
    pub fn parse(spec: &str) -> Option<Self> {
        let caps = LOOP_SPEC.captures(spec)?;
        let spec = LoopSpec {
            variable: caps.get(1)?.as_str().to_string(),
            collection: caps.get(2)?.as_str().to_string(),
        };
        log::trace!("Parsed loop spec {:?}", spec);
        Some(spec)
    }
}
