//! Layered variable scopes
//!
//! The root layer is the caller's data record: each member of the record is a
//! name. Every loop iteration pushes a child layer that binds exactly one
//! name and borrows its parent, so lookups walk outward until they hit.

use crate::expr::Value;

#[derive(Debug)]
enum Layer {
    /// Members of a record are visible as names
    Record(Value),
    /// A single name bound by a loop
    Binding { name: String, value: Value },
}

/// A chain of variable layers, innermost first
#[derive(Debug)]
pub struct Scope<'a> {
    layer: Layer,
    parent: Option<&'a Scope<'a>>,
}

impl Scope<'static> {
    /// Root scope over a data record
    pub fn root(data: Value) -> Self {
        Scope {
            layer: Layer::Record(data),
            parent: None,
        }
    }
}

impl<'a> Scope<'a> {
    /// Child scope binding one additional name; the parent is untouched
    pub fn child(&'a self, name: impl Into<String>, value: Value) -> Scope<'a> {
        Scope {
            layer: Layer::Binding {
                name: name.into(),
                value,
            },
            parent: Some(self),
        }
    }

    /// Resolve a name, walking out towards the root
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut current = Some(self);
        while let Some(scope) = current {
            let found = match &scope.layer {
                Layer::Record(record) => record.as_object().and_then(|fields| fields.get(name)),
                Layer::Binding { name: bound, value } => (bound == name).then_some(value),
            };
            if found.is_some() {
                return found;
            }
            current = scope.parent;
        }
        None
    }

    /// Number of layers including this one
    pub fn depth(&self) -> usize {
        1 + self.parent.map_or(0, |parent| parent.depth())
    }
}
