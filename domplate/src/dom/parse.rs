//! Tree builder on top of the html5gum tokenizer
//!
//! This is a lenient builder, not the full HTML5 tree construction algorithm.
//! It always produces `html > (head, body)`, routes metadata elements into
//! `head`, closes a handful of elements implicitly (`li`, `p`, table cells,
//! ...) and otherwise nests tags exactly as written.

use html5gum::{DefaultEmitter, State, Token, Tokenizer};

use super::{Doctype, Document, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const HEAD_ELEMENTS: &[&str] = &[
    "base", "link", "meta", "noscript", "script", "style", "template", "title",
];

/// Elements whose start tag closes an open `<p>`
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p",
    "pre", "section", "table", "ul",
];

pub(super) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Whether opening `incoming` implicitly ends the currently open `open`
fn closes_implicitly(open: &str, incoming: &str) -> bool {
    match open {
        "p" => CLOSES_P.contains(&incoming),
        "li" => incoming == "li",
        "dt" | "dd" => matches!(incoming, "dt" | "dd"),
        "option" => matches!(incoming, "option" | "optgroup"),
        "td" | "th" => matches!(incoming, "td" | "th" | "tr" | "tbody" | "thead" | "tfoot"),
        "tr" => matches!(incoming, "tr" | "tbody" | "thead" | "tfoot"),
        "thead" | "tbody" | "tfoot" => matches!(incoming, "tbody" | "thead" | "tfoot"),
        _ => false,
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

struct TreeBuilder {
    doc: Document,
    stack: Vec<NodeId>,
    html: Option<NodeId>,
    head: Option<NodeId>,
    body: Option<NodeId>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            doc: Document::new(),
            stack: Vec::new(),
            html: None,
            head: None,
            body: None,
        }
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn current_name(&self) -> Option<&str> {
        self.stack.last().and_then(|&id| self.doc.tag_name(id))
    }

    fn ensure_html(&mut self) -> NodeId {
        if let Some(html) = self.html {
            return html;
        }
        let html = self.doc.create_element("html", Vec::new());
        let root = self.doc.root();
        self.doc.append_child(root, html);
        self.html = Some(html);
        self.stack = vec![html];
        html
    }

    fn enter_head(&mut self) {
        let html = self.ensure_html();
        let head = match self.head {
            Some(head) => head,
            None => {
                let head = self.doc.create_element("head", Vec::new());
                self.doc.append_child(html, head);
                self.head = Some(head);
                head
            }
        };
        if self.stack.last() != Some(&head) {
            self.stack.truncate(1);
            self.stack.push(head);
        }
    }

    fn enter_body(&mut self) {
        let html = self.ensure_html();
        if self.body.is_some() {
            return;
        }
        let body = self.doc.create_element("body", Vec::new());
        self.doc.append_child(html, body);
        self.body = Some(body);
        self.stack.truncate(1);
        self.stack.push(body);
    }

    /// Copy attributes onto an existing element without overriding
    fn merge_attributes(&mut self, id: NodeId, attrs: Vec<(String, String)>) {
        for (name, value) in attrs {
            if !self.doc.has_attribute(id, &name) {
                self.doc.set_attribute(id, &name, value);
            }
        }
    }

    fn start_tag(&mut self, name: String, attrs: Vec<(String, String)>, self_closing: bool) -> bool {
        match name.as_str() {
            "html" => {
                let html = self.ensure_html();
                self.merge_attributes(html, attrs);
                return false;
            }
            "head" => {
                if self.body.is_none() {
                    self.enter_head();
                    if let Some(head) = self.head {
                        self.merge_attributes(head, attrs);
                    }
                }
                return false;
            }
            "body" => {
                self.enter_body();
                if let Some(body) = self.body {
                    self.merge_attributes(body, attrs);
                }
                return false;
            }
            _ => {}
        }

        if self.body.is_none() {
            if HEAD_ELEMENTS.contains(&name.as_str()) {
                self.enter_head();
            } else {
                self.enter_body();
            }
        }

        while let Some(open) = self.current_name() {
            if closes_implicitly(open, &name) {
                self.stack.pop();
            } else {
                break;
            }
        }

        let void = self_closing || is_void_element(&name);
        let element = self.doc.create_element(name, attrs);
        let parent = self.current();
        self.doc.append_child(parent, element);
        if !void {
            self.stack.push(element);
        }
        !void
    }

    fn end_tag(&mut self, name: &str) {
        match name {
            // body and html stay open so trailing content still lands in body
            "html" | "body" => {}
            "head" => {
                if let Some(idx) = self.stack.iter().rposition(|&id| Some(id) == self.head) {
                    self.stack.truncate(idx);
                }
            }
            _ => {
                let matching = self
                    .stack
                    .iter()
                    .rposition(|&id| self.doc.tag_name(id) == Some(name));
                if let Some(idx) = matching {
                    self.stack.truncate(idx);
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.body.is_none() {
            // inside <title>, <script> and friends
            if !matches!(self.current_name(), None | Some("html") | Some("head")) {
                self.append_text(text);
                return;
            }
            let in_head = self.head.is_some() && self.stack.last().copied() == self.head;
            if text.trim().is_empty() {
                if in_head {
                    self.append_text(text);
                }
                return;
            }
            self.enter_body();
        }
        self.append_text(text);
    }

    /// Append text, merging with a trailing text sibling
    fn append_text(&mut self, text: &str) {
        let parent = self.current();
        if let Some(last) = self.doc.last_child(parent) {
            if let NodeData::Text(existing) = self.doc.data_mut(last) {
                existing.push_str(text);
                return;
            }
        }
        let node = self.doc.create_text(text);
        self.doc.append_child(parent, node);
    }

    fn comment(&mut self, text: String) {
        let node = self.doc.create_comment(text);
        let parent = self.current();
        self.doc.append_child(parent, node);
    }

    fn doctype(&mut self, doctype: Doctype) {
        if self.html.is_some() || self.doc.doctype().is_some() {
            return;
        }
        let node = self.doc.create_doctype(doctype);
        let root = self.doc.root();
        self.doc.append_child(root, node);
    }

    fn finish(mut self) -> Document {
        let html = self.ensure_html();
        if self.head.is_none() {
            let head = self.doc.create_element("head", Vec::new());
            match self.doc.first_child(html) {
                Some(first) => {
                    // first is a child of html by construction
                    let _ = self.doc.insert_before(html, head, first);
                }
                None => self.doc.append_child(html, head),
            }
        }
        if self.body.is_none() {
            let body = self.doc.create_element("body", Vec::new());
            self.doc.append_child(html, body);
        }
        self.doc
    }
}

/// Parse an HTML string into a full document tree
///
/// Fragments are wrapped the way a browser would: the result always has an
/// `<html>` element containing `<head>` and `<body>`.
pub fn parse_document(input: &str) -> Document {
    // Spans are only used to recover attribute source order
    let mut tokenizer =
        Tokenizer::new_with_emitter(input, DefaultEmitter::<usize>::new_with_span());
    let mut builder = TreeBuilder::new();

    while let Some(token_result) = tokenizer.next() {
        let token = match token_result {
            Ok(token) => token,
            Err(_) => break,
        };

        match token {
            Token::StartTag(tag) => {
                let name = lossy(&tag.name).to_ascii_lowercase();
                // html5gum keys attributes by name; put them back in source order
                let mut spanned: Vec<_> = tag.attributes.iter().collect();
                spanned.sort_by_key(|(_, v)| v.span.start);
                let attributes: Vec<(String, String)> = spanned
                    .into_iter()
                    .map(|(k, v)| (lossy(k).to_ascii_lowercase(), lossy(&v.value)))
                    .collect();

                let opened = builder.start_tag(name.clone(), attributes, tag.self_closing);
                if opened {
                    match name.as_str() {
                        "script" | "style" => tokenizer.set_state(State::ScriptData),
                        "textarea" | "title" => tokenizer.set_state(State::RcData),
                        _ => {}
                    }
                }
            }
            Token::EndTag(tag) => {
                let name = lossy(&tag.name).to_ascii_lowercase();
                builder.end_tag(&name);
            }
            Token::String(text) => builder.text(&String::from_utf8_lossy(&text)),
            Token::Comment(text) => builder.comment(lossy(&text)),
            Token::Doctype(doctype) => builder.doctype(Doctype {
                name: lossy(&doctype.name).to_ascii_lowercase(),
                public_id: doctype.public_identifier.as_ref().map(|s| lossy(s)),
                system_id: doctype.system_identifier.as_ref().map(|s| lossy(s)),
            }),
            Token::Error(_) => {
                // the tokenizer recovers on its own
            }
        }
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(doc: &Document, id: NodeId) -> Vec<String> {
        doc.element_children(id)
            .into_iter()
            .filter_map(|c| doc.tag_name(c).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_fragment_is_wrapped_in_body() {
        let doc = parse_document("<div><p>hi</p></div>");
        let html = doc.document_element().unwrap();
        assert_eq!(names(&doc, html), vec!["head", "body"]);
        let body = doc.body().unwrap();
        assert_eq!(names(&doc, body), vec!["div"]);
        assert_eq!(doc.text_content(body), "hi");
    }

    #[test]
    fn test_full_document_with_doctype() {
        let doc = parse_document(
            "<!DOCTYPE html><html lang=\"en\"><head><title>T</title></head><body><h1>x</h1></body></html>",
        );
        assert_eq!(doc.doctype().map(|d| d.name.as_str()), Some("html"));
        let html = doc.document_element().unwrap();
        assert_eq!(doc.get_attribute(html, "lang"), Some("en"));
        assert_eq!(doc.text_content(doc.head().unwrap()), "T");
        assert_eq!(names(&doc, doc.body().unwrap()), vec!["h1"]);
    }

    #[test]
    fn test_void_and_self_closing_elements_have_no_children() {
        let doc = parse_document("<div><img src=\"a.png\"><br/><span>t</span></div>");
        let div = doc.element_children(doc.body().unwrap())[0];
        assert_eq!(names(&doc, div), vec!["img", "br", "span"]);
    }

    #[test]
    fn test_implicit_li_close() {
        let doc = parse_document("<ul><li>a<li>b</ul>");
        let ul = doc.element_children(doc.body().unwrap())[0];
        assert_eq!(names(&doc, ul), vec!["li", "li"]);
    }

    #[test]
    fn test_stray_end_tag_is_ignored() {
        let doc = parse_document("<div>a</span>b</div>");
        let div = doc.element_children(doc.body().unwrap())[0];
        assert_eq!(doc.text_content(div), "ab");
    }

    #[test]
    fn test_script_content_is_raw_text() {
        let doc = parse_document("<script>if (a < b) { x = '<p>'; }</script>");
        let head = doc.head().unwrap();
        let script = doc.element_children(head)[0];
        assert!(doc.element_children(script).is_empty());
        assert_eq!(doc.text_content(script), "if (a < b) { x = '<p>'; }");
    }

    #[test]
    fn test_entities_are_decoded() {
        let doc = parse_document("<p title=\"a &amp; b\">x &lt; y</p>");
        let p = doc.element_children(doc.body().unwrap())[0];
        assert_eq!(doc.get_attribute(p, "title"), Some("a & b"));
        assert_eq!(doc.text_content(p), "x < y");
    }

    #[test]
    fn test_attributes_keep_source_order() {
        let doc = parse_document(r#"<a href="/x" class="btn" id="k" data-z="1" data-a="2">L</a>"#);
        let a = doc.element_children(doc.body().unwrap())[0];
        let names: Vec<String> = doc.attributes(a).into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["href", "class", "id", "data-z", "data-a"]);
    }

    #[test]
    fn test_duplicate_attribute_keeps_first_value() {
        let doc = parse_document(r#"<p title="one" id="x" title="two"></p>"#);
        let p = doc.element_children(doc.body().unwrap())[0];
        assert_eq!(
            doc.attributes(p),
            vec![("title".to_string(), "one".to_string()), ("id".to_string(), "x".to_string())]
        );
    }
}
