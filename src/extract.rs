use crate::types::{Link, Result};
use ego_tree::NodeRef;
use scraper::node::Element;
use scraper::{Html, Node};
use url::Url;
use uuid::Uuid;

/// Visitor for depth-first traversal of a parsed HTML tree.
///
/// `enter` is called when a node is reached; returning `false` skips the
/// node's entire subtree (and its `exit` call). `exit` is called after all of
/// a node's children have been walked.
pub trait DomVisitor {
    fn enter(&mut self, node: NodeRef<'_, Node>) -> bool;

    fn exit(&mut self, _node: NodeRef<'_, Node>) {}
}

/// Walks `node` and its descendants in document order, driving `visitor`.
pub fn walk<V: DomVisitor>(node: NodeRef<'_, Node>, visitor: &mut V) {
    if !visitor.enter(node) {
        return;
    }
    for child in node.children() {
        walk(child, visitor);
    }
    visitor.exit(node);
}

/// Case-insensitive attribute lookup.
fn attr<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element
        .attrs()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// Concatenates every text node under a subtree, each followed by a single
/// space. No trimming or whitespace normalization.
#[derive(Default)]
struct TextFlattener {
    out: String,
}

impl DomVisitor for TextFlattener {
    fn enter(&mut self, node: NodeRef<'_, Node>) -> bool {
        if let Node::Text(text) = node.value() {
            self.out.push_str(text);
            self.out.push(' ');
        }
        true
    }
}

pub fn flatten(node: NodeRef<'_, Node>) -> String {
    let mut visitor = TextFlattener::default();
    walk(node, &mut visitor);
    visitor.out
}

/// Collects candidate links from every anchor element in a tree.
///
/// Anchors with a missing or empty href, or an href that fails URL parsing,
/// are skipped without affecting sibling anchors. Descent always continues,
/// including into the anchor itself.
#[derive(Default)]
pub struct LinkExtractor {
    links: Vec<Link>,
}

impl DomVisitor for LinkExtractor {
    fn enter(&mut self, node: NodeRef<'_, Node>) -> bool {
        if let Node::Element(element) = node.value() {
            if element.name() == "a" {
                if let Some(href) = attr(element, "href").filter(|href| !href.is_empty()) {
                    if let Ok(parsed) = Url::parse(href) {
                        self.links.push(Link {
                            id: Uuid::new_v4(),
                            url: href.to_string(),
                            domain: parsed.host_str().unwrap_or("").to_string(),
                            context: flatten(node),
                            queued: false,
                            queued_at: None,
                        });
                    }
                }
            }
        }
        true
    }
}

/// Parses an HTML string and returns all extracted links in document order.
///
/// scraper's parser recovers from malformed markup rather than failing, so in
/// practice this always succeeds; the Result keeps parse failure a hard error
/// for callers.
pub fn find_links(html: &str) -> Result<Vec<Link>> {
    let document = Html::parse_document(html);
    let mut visitor = LinkExtractor::default();
    walk(document.tree.root(), &mut visitor);
    Ok(visitor.links)
}
