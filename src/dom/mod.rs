//! Owned document tree the resolver mutates.
//!
//! Parsing goes through `scraper`; the parsed tree is copied into a flat
//! arena so fragments stay detached until their nodes are grafted into the
//! live document.

use std::sync::Arc;

use scraper::Html;
use ego_tree::NodeRef;
use scraper::node::Node as HtmlNode;
use tokio::sync::Mutex;

use crate::constants::{RAW_TEXT_ELEMENTS, VOID_ELEMENTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct ElementData {
    /// Lowercased tag name, as produced by the parser.
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is(&self, tag: &str) -> bool {
        self.name.eq_ignore_ascii_case(tag)
    }
}

#[derive(Debug)]
struct DomNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Arena-backed document. Node 0 is the document root; detached nodes stay in
/// the arena but are unreachable from the root.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<DomNode>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![DomNode {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    /// Parses a complete HTML document, doctype included.
    pub fn parse_document(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Self::new();
        let root = doc.root();
        for child in parsed.tree.root().children() {
            convert_into(&mut doc, root, child);
        }
        doc
    }

    /// Parses an HTML fragment. Fragment parsing wraps content in a synthetic
    /// `<html>` element; its children become the top-level nodes here.
    pub fn parse_fragment(html: &str) -> Self {
        let parsed = Html::parse_fragment(html);
        let mut doc = Self::new();
        let root = doc.root();
        let tree_root = parsed.tree.root();
        match tree_root.children().find(|child| child.value().is_element()) {
            Some(wrapper) => {
                for child in wrapper.children() {
                    convert_into(&mut doc, root, child);
                }
            }
            None => {
                for child in tree_root.children() {
                    convert_into(&mut doc, root, child);
                }
            }
        }
        doc
    }

    pub fn into_shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> &DomNode {
        &self.nodes[id.0]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id) {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attr(name))
    }

    pub fn is_script(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|element| element.is("script"))
    }

    fn push_orphan(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DomNode {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Creates a node and appends it under `parent` in one step.
    pub fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.push_orphan(data);
        self.append_child(parent, id);
        id
    }

    pub fn create_element(&mut self, name: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push_orphan(NodeData::Element(ElementData {
            name: name.to_string(),
            attrs,
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_orphan(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push_orphan(NodeData::Comment(text.into()))
    }

    /// Attaches an orphan node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.nodes[child.0].parent.is_none());
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Detaches every child of `parent`. Detached subtrees remain in the
    /// arena, unreachable from the root.
    pub fn clear_children(&mut self, parent: NodeId) {
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Deep-copies a subtree from another document under `parent`.
    pub fn graft(&mut self, src: &Document, src_id: NodeId, parent: NodeId) -> NodeId {
        let id = self.append(parent, src.data(src_id).clone());
        for &child in src.children(src_id) {
            self.graft(src, child, id);
        }
        id
    }

    /// Pre-order traversal of the subtree below `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every element bearing `name`, in document order.
    pub fn elements_with_attribute(&self, name: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.attribute(id, name).is_some())
            .collect()
    }

    /// Concatenated text of every text node below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for descendant in self.descendants(id) {
            if let NodeData::Text(text) = self.data(descendant) {
                out.push_str(text);
            }
        }
        out
    }

    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let raw = self
            .element(id)
            .is_some_and(|element| RAW_TEXT_ELEMENTS.contains(&element.name.as_str()));
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        match self.data(id) {
            NodeData::Document => {
                for &child in self.children(id) {
                    self.write_node(child, false, out);
                }
            }
            NodeData::Doctype(name) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Text(text) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    escape_text(text, out);
                }
            }
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for (key, value) in &element.attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_attr(value, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.name.as_str()) {
                    return;
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&element.name.as_str());
                for &child in self.children(id) {
                    self.write_node(child, raw, out);
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}

fn convert_into(doc: &mut Document, parent: NodeId, node: NodeRef<'_, HtmlNode>) {
    match node.value() {
        HtmlNode::Element(element) => {
            let attrs = element
                .attrs()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect();
            let id = doc.append(
                parent,
                NodeData::Element(ElementData {
                    name: element.name().to_string(),
                    attrs,
                }),
            );
            for child in node.children() {
                convert_into(doc, id, child);
            }
        }
        HtmlNode::Text(text) => {
            doc.append(parent, NodeData::Text(text.text.to_string()));
        }
        HtmlNode::Comment(comment) => {
            doc.append(parent, NodeData::Comment(comment.comment.to_string()));
        }
        HtmlNode::Doctype(doctype) => {
            doc.append(parent, NodeData::Doctype(doctype.name().to_string()));
        }
        HtmlNode::Document | HtmlNode::Fragment => {
            for child in node.children() {
                convert_into(doc, parent, child);
            }
        }
        HtmlNode::ProcessingInstruction(_) => {}
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_preserves_top_level_order() {
        let doc = Document::parse_fragment("<p>one</p>text<span>two</span>");
        let top = doc.children(doc.root());
        assert_eq!(top.len(), 3);
        assert!(matches!(doc.data(top[0]), NodeData::Element(e) if e.name == "p"));
        assert!(matches!(doc.data(top[1]), NodeData::Text(t) if t == "text"));
        assert!(matches!(doc.data(top[2]), NodeData::Element(e) if e.name == "span"));
    }

    #[test]
    fn script_elements_are_recognized() {
        let doc = Document::parse_fragment("<div></div><script>let x = 1;</script>");
        let top = doc.children(doc.root());
        assert!(!doc.is_script(top[0]));
        assert!(doc.is_script(top[1]));
        assert_eq!(doc.text_content(top[1]), "let x = 1;");
    }

    #[test]
    fn graft_deep_copies_subtrees() {
        let fragment = Document::parse_fragment("<ul><li>a</li><li>b</li></ul>");
        let mut doc = Document::parse_fragment("<div id=\"host\"></div>");
        let host = doc.children(doc.root())[0];
        let src = fragment.children(fragment.root())[0];
        doc.graft(&fragment, src, host);
        assert_eq!(doc.inner_html(host), "<ul><li>a</li><li>b</li></ul>");
        // the source stays intact
        assert_eq!(fragment.inner_html(fragment.root()), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn serializer_escapes_text_and_attributes() {
        let mut doc = Document::new();
        let root = doc.root();
        let el = doc.create_element(
            "p",
            vec![("title".to_string(), "a\"b&c".to_string())],
        );
        doc.append_child(root, el);
        let text = doc.create_text("1 < 2 & 3 > 2");
        doc.append_child(el, text);
        assert_eq!(
            doc.to_html(),
            "<p title=\"a&quot;b&amp;c\">1 &lt; 2 &amp; 3 &gt; 2</p>"
        );
    }

    #[test]
    fn script_text_serializes_verbatim() {
        let doc = Document::parse_fragment("<script>if (a < b && c > d) {}</script>");
        assert_eq!(doc.to_html(), "<script>if (a < b && c > d) {}</script>");
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let doc = Document::parse_fragment("<br><img src=\"x.png\">");
        assert_eq!(doc.to_html(), "<br><img src=\"x.png\">");
    }

    #[test]
    fn clear_children_detaches_subtree() {
        let mut doc = Document::parse_fragment("<div><p>gone</p></div>");
        let host = doc.children(doc.root())[0];
        doc.clear_children(host);
        assert!(doc.children(host).is_empty());
        assert_eq!(doc.to_html(), "<div></div>");
    }

    #[test]
    fn elements_with_attribute_in_document_order() {
        let doc = Document::parse_fragment(
            "<div data-include=\"a.html\"><span data-include=\"b.html\"></span></div>\
             <section data-include=\"c.html\"></section>",
        );
        let hosts = doc.elements_with_attribute("data-include");
        let paths: Vec<_> = hosts
            .iter()
            .map(|&id| doc.attribute(id, "data-include").unwrap())
            .collect();
        assert_eq!(paths, vec!["a.html", "b.html", "c.html"]);
    }

    #[test]
    fn document_parse_keeps_doctype() {
        let doc = Document::parse_document("<!DOCTYPE html><html><head></head><body></body></html>");
        let html = doc.to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<body></body>"));
    }

    #[test]
    fn comment_round_trip() {
        let doc = Document::parse_fragment("<!-- marker -->");
        assert_eq!(doc.to_html(), "<!-- marker -->");
    }
}
