//! Directive processing over a document tree
//!
//! [`Processor::process`] walks an element depth-first, pre-order. Per element
//! the directives run in a fixed order, and the order matters:
//!
//! 1. `js-if` / `js-if-not` may remove the element, ending its processing
//! 2. `js-each` replaces the element with one processed clone per item
//! 3. `js-value` replaces the content
//! 4. `js-attr-*` sets attributes
//! 5. child elements are processed left to right from a snapshot

pub mod directive;

use std::collections::HashMap;

use crate::dom::{Document, NodeId};
use crate::error::RenderError;
use crate::expr::{EvalError, Expr, ParseError, Value, eval_expr, parse_expression};
use crate::options::RenderOptions;
use crate::scope::Scope;

use directive::LoopSpec;

/// Applies directives to elements of a document
///
/// Holds the global value for one render; it never changes while walking.
/// Parsed expressions are cached, so loop bodies parse once.
#[derive(Debug)]
pub struct Processor {
    global: Value,
    options: RenderOptions,
    cache: HashMap<String, Result<Expr, ParseError>>,
}

impl Processor {
    pub fn new(global: Value, options: RenderOptions) -> Self {
        Self {
            global,
            options,
            cache: HashMap::new(),
        }
    }

    pub fn global(&self) -> &Value {
        &self.global
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Evaluate an expression, swallowing failures into `undefined`
    pub fn evaluate(&mut self, expression: &str, scope: &Scope<'_>) -> Value {
        if !self.cache.contains_key(expression) {
            self.cache
                .insert(expression.to_string(), parse_expression(expression));
        }

        let result = match &self.cache[expression] {
            Ok(expr) => eval_expr(expr, scope, &self.global),
            Err(e) => Err(EvalError::Parse(e.clone())),
        };

        match result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Expression '{}' evaluated to undefined: {}", expression, e);
                Value::Undefined
            }
        }
    }

    /// Strip a directive attribute if the options ask for it
    fn strip(&self, doc: &mut Document, node: NodeId, attr: &str) {
        if self.options.remove_js_attributes {
            doc.remove_attribute(node, attr);
        }
    }

    /// Apply all directives to `node` and its descendants
    ///
    /// Non-element nodes are left alone.
    pub fn process(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        scope: &Scope<'_>,
    ) -> Result<(), RenderError> {
        let Some(tag) = doc.tag_name(node).map(str::to_string) else {
            return Ok(());
        };

        // Conditionals
        for (attr, keep_when) in [(directive::IF, true), (directive::IF_NOT, false)] {
            let Some(expression) = doc.get_attribute(node, attr).map(str::to_string) else {
                continue;
            };
            let truthy = self.evaluate(&expression, scope).is_truthy();
            self.strip(doc, node, attr);
            if truthy != keep_when {
                log::debug!("<{}> removed by {}=\"{}\"", tag, attr, expression);
                doc.remove(node);
                return Ok(());
            }
        }

        // Loop: the header never survives, whatever the options say
        if let Some(header) = doc.remove_attribute(node, directive::EACH) {
            match LoopSpec::parse(&header) {
                Some(spec) => return self.expand_loop(doc, node, &spec, scope),
                None => log::warn!(
                    "Malformed {}=\"{}\" on <{}>, expected \"<name> in <expression>\"",
                    directive::EACH,
                    header,
                    tag
                ),
            }
        }

        // Content
        if let Some(expression) = doc.get_attribute(node, directive::VALUE).map(str::to_string) {
            let value = self.evaluate(&expression, scope);
            self.strip(doc, node, directive::VALUE);
            doc.set_text_content(node, &value.to_display_string());
        }

        // Attributes, from a snapshot since binding mutates the list
        for (name, expression) in doc.attributes(node) {
            let Some(target) = name.strip_prefix(directive::ATTR_PREFIX) else {
                continue;
            };
            if target.is_empty() {
                log::warn!("<{}> has {} with no attribute name", tag, name);
                self.strip(doc, node, &name);
                continue;
            }
            if !directive::is_valid_attribute_name(target) {
                log::warn!(
                    "<{}> {}: InvalidCharacterError, '{}' is not a valid attribute name",
                    tag,
                    name,
                    target
                );
                self.strip(doc, node, &name);
                continue;
            }
            let value = self.evaluate(&expression, scope);
            self.strip(doc, node, &name);
            match value {
                Value::Bool(false) | Value::Null | Value::Undefined => {
                    log::debug!("<{}> attribute '{}' suppressed by {:?}", tag, target, value);
                }
                _ => doc.set_attribute(node, target, value.to_display_string()),
            }
        }

        for child in doc.element_children(node) {
            self.process(doc, child, scope)?;
        }

        Ok(())
    }

    /// Replace `node` with one clone per collection item
    ///
    /// A non-array collection, or a node without a parent, produces nothing
    /// and the node is removed.
    fn expand_loop(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        spec: &LoopSpec,
        scope: &Scope<'_>,
    ) -> Result<(), RenderError> {
        let collection = self.evaluate(&spec.collection, scope);
        let (Some(parent), Some(items)) = (doc.parent(node), collection.as_array()) else {
            log::debug!(
                "{} over '{}' is not an array, removing the element",
                directive::EACH,
                spec.collection
            );
            doc.remove(node);
            return Ok(());
        };

        log::debug!(
            "Expanding {} in {} over {} items",
            spec.variable,
            spec.collection,
            items.len()
        );

        for item in items {
            let clone = doc.deep_clone(node);
            doc.remove_attribute(clone, directive::EACH);
            doc.insert_before(parent, clone, node)?;

            let item_scope = scope.child(spec.variable.as_str(), item.clone());
            self.process(doc, clone, &item_scope)?;
        }

        doc.remove_child(parent, node)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;
    use serde_json::json;

    /// Process the body of a fragment and return its markup
    fn run(source: &str, data: serde_json::Value, options: RenderOptions) -> String {
        let mut doc = parse_document(source);
        let body = doc.body().unwrap();
        let value = Value::from(&data);
        let scope = Scope::root(value.clone());
        let mut processor = Processor::new(value, options);
        processor.process(&mut doc, body, &scope).unwrap();
        doc.inner_html(body)
    }

    #[test]
    fn test_if_keeps_and_removes() {
        let html = run(
            r#"<p js-if="show">a</p><p js-if="hide">b</p>"#,
            json!({"show": true, "hide": 0}),
            RenderOptions::default(),
        );
        assert_eq!(html, r#"<p js-if="show">a</p>"#);
    }

    #[test]
    fn test_if_not_and_combined_conditions() {
        let html = run(
            r#"<p js-if-not="admin">guest</p><p js-if="user" js-if-not="admin">member</p>"#,
            json!({"admin": false, "user": {"name": "x"}}),
            true.into(),
        );
        assert_eq!(html, "<p>guest</p><p>member</p>");
    }

    #[test]
    fn test_value_replaces_children() {
        let html = run(
            r#"<span js-value="user.name"><b>placeholder</b></span><i js-value="missing.x">old</i>"#,
            json!({"user": {"name": "Alice"}}),
            true.into(),
        );
        assert_eq!(html, "<span>Alice</span><i></i>");
    }

    #[test]
    fn test_value_text_is_escaped() {
        let html = run(
            r#"<p js-value="code"></p>"#,
            json!({"code": "<b>&</b>"}),
            true.into(),
        );
        assert_eq!(html, "<p>&lt;b&gt;&amp;&lt;/b&gt;</p>");
    }

    #[test]
    fn test_attribute_binding_and_suppression() {
        let html = run(
            r#"<a js-attr-href="url" js-attr-title="none" js-attr-hidden="flag" js-attr-data-n="n"></a>"#,
            json!({"url": "/home", "none": null, "flag": false, "n": 0}),
            true.into(),
        );
        assert_eq!(html, r#"<a href="/home" data-n="0"></a>"#);
    }

    #[test]
    fn test_empty_attribute_target_is_stripped() {
        let html = run(r#"<a js-attr-="x">L</a>"#, json!({"x": 1}), true.into());
        assert_eq!(html, "<a>L</a>");

        let html = run(r#"<a js-attr-="x">L</a>"#, json!({"x": 1}), RenderOptions::default());
        assert_eq!(html, r#"<a js-attr-="x">L</a>"#);
    }

    #[test]
    fn test_invalid_attribute_target_is_refused() {
        let html = run(
            r#"<a js-attr-x<y="v" js-attr-ok="v">L</a>"#,
            json!({"v": "1"}),
            true.into(),
        );
        assert_eq!(html, r#"<a ok="1">L</a>"#);
    }

    #[test]
    fn test_attributes_added_while_processing_are_not_reprocessed() {
        // js-attr-js-value creates a js-value attribute after content was handled
        let html = run(r#"<p js-attr-js-value="'x'">orig</p>"#, json!({}), true.into());
        assert_eq!(html, r#"<p js-value="x">orig</p>"#);

        // Only the attributes present when binding started are bound
        let html = run(
            r#"<p js-attr-js-attr-title="'t'">orig</p>"#,
            json!({}),
            true.into(),
        );
        assert_eq!(html, r#"<p js-attr-title="t">orig</p>"#);
    }

    #[test]
    fn test_removed_elements_are_freed() {
        let mut doc = parse_document(
            r#"<p js-if="false"><b>gone</b></p><ul><li js-each="i in items">x</li></ul>"#,
        );
        let body = doc.body().unwrap();
        let dropped = doc.descendant_elements(body);
        let value = Value::from(&json!({"items": [1]}));
        let mut processor = Processor::new(value.clone(), RenderOptions::default());
        processor.process(&mut doc, body, &Scope::root(value)).unwrap();

        // p, b and the original li are freed; ul survives
        let freed: Vec<bool> = dropped.iter().map(|&id| doc.is_removed(id)).collect();
        assert_eq!(freed, vec![true, true, false, true]);
        assert_eq!(doc.inner_html(body), "<ul><li>x</li></ul>");
    }

    #[test]
    fn test_attribute_binding_keeps_directives_by_default() {
        let html = run(
            r#"<img js-attr-src="src">"#,
            json!({"src": "a.png"}),
            RenderOptions::default(),
        );
        assert_eq!(html, r#"<img js-attr-src="src" src="a.png">"#);
    }

    #[test]
    fn test_each_repeats_in_order() {
        let html = run(
            r#"<ul><li js-each="item in items" js-value="item"></li></ul>"#,
            json!({"items": ["a", "b", "c"]}),
            RenderOptions::default(),
        );
        assert_eq!(
            html,
            r#"<ul><li js-value="item">a</li><li js-value="item">b</li><li js-value="item">c</li></ul>"#
        );
    }

    #[test]
    fn test_each_over_non_array_removes_element() {
        for data in [json!({}), json!({"items": "abc"}), json!({"items": {"a": 1}})] {
            let html = run(
                r#"<ul><li js-each="item in items">x</li></ul>"#,
                data,
                RenderOptions::default(),
            );
            assert_eq!(html, "<ul></ul>");
        }
    }

    #[test]
    fn test_each_with_empty_array() {
        let html = run(
            r#"<ul><li js-each="item in items">x</li><li>tail</li></ul>"#,
            json!({"items": []}),
            RenderOptions::default(),
        );
        assert_eq!(html, "<ul><li>tail</li></ul>");
    }

    #[test]
    fn test_each_inside_if_filters_per_item() {
        let html = run(
            r#"<p js-each="n in nums" js-if="n > 1" js-value="n"></p>"#,
            json!({"nums": [1, 2, 3]}),
            true.into(),
        );
        // js-if runs before js-each, against the outer scope where `n` is undefined
        assert_eq!(html, "");
    }

    #[test]
    fn test_nested_loops_see_outer_bindings() {
        let html = run(
            r#"<div js-each="row in rows"><span js-each="cell in row.cells" js-value="row.name + ':' + cell"></span></div>"#,
            json!({"rows": [{"name": "a", "cells": [1, 2]}, {"name": "b", "cells": [3]}]}),
            true.into(),
        );
        assert_eq!(
            html,
            "<div><span>a:1</span><span>a:2</span></div><div><span>b:3</span></div>"
        );
    }

    #[test]
    fn test_malformed_each_is_stripped_and_element_kept() {
        let html = run(
            r#"<p js-each="items" js-value="'kept'"></p>"#,
            json!({"items": [1, 2]}),
            RenderOptions::default(),
        );
        assert_eq!(html, r#"<p js-value="'kept'">kept</p>"#);
    }

    #[test]
    fn test_global_stays_fixed_inside_loops() {
        let mut doc = parse_document(
            r#"<p js-each="company in names" js-value="company + '/' + global.company"></p>"#,
        );
        let body = doc.body().unwrap();
        let data = Value::from(json!({"names": ["x", "y"], "company": "Root"}));
        let scope = Scope::root(data.clone());
        let mut processor = Processor::new(data, true.into());
        processor.process(&mut doc, body, &scope).unwrap();
        assert_eq!(doc.inner_html(body), "<p>x/Root</p><p>y/Root</p>");
        assert_eq!(processor.global().as_object().map(|o| o.len()), Some(2));
    }

    #[test]
    fn test_non_element_nodes_are_ignored() {
        let mut doc = parse_document("<p>text</p>");
        let body = doc.body().unwrap();
        let p = doc.element_children(body)[0];
        let text = doc.first_child(p).unwrap();
        let mut processor = Processor::new(Value::Undefined, RenderOptions::default());
        let scope = Scope::root(Value::Undefined);
        processor.process(&mut doc, text, &scope).unwrap();
        assert_eq!(doc.inner_html(body), "<p>text</p>");
    }

    #[test]
    fn test_expression_cache_reuses_parses() {
        let mut processor = Processor::new(Value::Undefined, RenderOptions::default());
        let scope = Scope::root(Value::from(json!({"a": 2})));
        assert_eq!(processor.evaluate("a * 2", &scope), Value::Number(4.0));
        assert_eq!(processor.evaluate("a * 2", &scope), Value::Number(4.0));
        assert_eq!(processor.evaluate("a *", &scope), Value::Undefined);
        assert_eq!(processor.cache.len(), 2);
    }
}
