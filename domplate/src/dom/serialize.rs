//! HTML serialization of document subtrees

use super::parse::is_void_element;
use super::{Document, NodeData, NodeId};

/// Elements whose text children are emitted verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "plaintext", "script", "style", "xmp",
];

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

impl Document {
    /// Markup of the node itself and its descendants
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Markup of the node's descendants only
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_children(id, &mut out);
        out
    }

    fn write_children(&self, id: NodeId, out: &mut String) {
        let raw = self
            .tag_name(id)
            .is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name));
        for child in self.children(id) {
            match self.data(child) {
                NodeData::Text(text) if raw => out.push_str(text),
                _ => self.write_node(child, out),
            }
        }
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            NodeData::Document => self.write_children(id, out),
            NodeData::Doctype(doctype) => out.push_str(&doctype.to_string()),
            NodeData::Text(text) => escape_text(text, out),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }
                out.push('>');
                if is_void_element(&el.name) {
                    return;
                }
                self.write_children(id, out);
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::parse_document;

    #[test]
    fn test_fragment_round_trip() {
        let source = "<div class=\"a\"><p>one</p><br><!-- note --><span>two</span></div>";
        let doc = parse_document(source);
        assert_eq!(doc.inner_html(doc.body().unwrap()), source);
    }

    #[test]
    fn test_escapes_text_and_attributes() {
        let mut doc = parse_document("<p></p>");
        let p = doc.element_children(doc.body().unwrap())[0];
        doc.set_attribute(p, "title", "say \"hi\" & <bye>");
        doc.set_text_content(p, "1 < 2 & 3 > 2");
        assert_eq!(
            doc.outer_html(p),
            "<p title=\"say &quot;hi&quot; &amp; <bye>\">1 &lt; 2 &amp; 3 &gt; 2</p>"
        );
    }

    #[test]
    fn test_script_text_is_not_escaped() {
        let doc = parse_document("<div><script>a && b < c</script></div>");
        assert_eq!(
            doc.inner_html(doc.body().unwrap()),
            "<div><script>a && b < c</script></div>"
        );
    }

    #[test]
    fn test_document_outer_html() {
        let doc = parse_document("<!DOCTYPE html><html><body><p>x</p></body></html>");
        let html = doc.document_element().unwrap();
        assert_eq!(
            doc.outer_html(html),
            "<html><head></head><body><p>x</p></body></html>"
        );
        assert_eq!(
            doc.outer_html(doc.root()),
            "<!DOCTYPE html><html><head></head><body><p>x</p></body></html>"
        );
    }
}
