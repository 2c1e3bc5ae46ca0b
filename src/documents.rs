//! XML document handling
//!
//! Thin views over a parsed `roxmltree` tree exposing exactly what conversion
//! and validation need: local names, resolved prefixes, unqualified
//! attributes, element children grouped by namespace, and own text.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::{self, NamespaceGroup};
use quick_xml::events::Event;
use quick_xml::Reader;
use roxmltree::{Node, ParsingOptions};
use std::ops::Range;

/// Characters stripped from both ends of text content
pub const TRIM_CHARS: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B'];

/// Trim text content the way conversion and validation expect
pub fn trim_text(text: &str) -> &str {
    text.trim_matches(TRIM_CHARS)
}

/// A parsed, well-formed XML document
#[derive(Debug)]
pub struct Document<'input> {
    tree: roxmltree::Document<'input>,
    uses_namespaces: bool,
}

impl<'input> Document<'input> {
    /// Parse an XML document from a string
    ///
    /// DOCTYPE declarations are accepted and internal entities are expanded.
    /// Any well-formedness failure becomes [`Error::InvalidInput`]. Nesting is
    /// measured with a streaming pass first, so a document deeper than
    /// `max_xml_depth` is rejected before the tree is built.
    pub fn parse(xml: &'input str, limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;
        check_nesting(xml, limits)?;

        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let tree = roxmltree::Document::parse_with_options(xml, options)
            .map_err(|e| Error::invalid_input(e.to_string()))?;

        let uses_namespaces = tree.descendants().filter(|n| n.is_element()).any(|n| {
            n.tag_name().namespace().is_some() || n.attributes().any(|a| a.namespace().is_some())
        });

        Ok(Self {
            tree,
            uses_namespaces,
        })
    }

    /// Get the root element
    pub fn root_element(&self) -> Element<'_, 'input> {
        Element {
            node: self.tree.root_element(),
            uses_namespaces: self.uses_namespaces,
        }
    }

    /// Whether any element or attribute name in the document is namespaced
    pub fn uses_namespaces(&self) -> bool {
        self.uses_namespaces
    }

    /// 1-based (line, column) of a node's start tag
    pub fn position(&self, node: Node<'_, '_>) -> (u32, u32) {
        let pos = self.tree.text_pos_at(node.range().start);
        (pos.row, pos.col)
    }

    /// Access the underlying tree
    pub fn tree(&self) -> &roxmltree::Document<'input> {
        &self.tree
    }
}

/// Byte range of the `<!DOCTYPE ...>` declaration in the prolog, if any
///
/// Quoted literals, comments and processing instructions are stepped over
/// while looking for the closing `>`, so markup characters inside an entity
/// value or a comment of the internal subset do not end the declaration.
pub(crate) fn doctype_span(xml: &str) -> Option<Range<usize>> {
    let mut pos = 0;
    loop {
        let rest = &xml[pos..];
        let trimmed = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
        pos += rest.len() - trimmed.len();
        if trimmed.starts_with("<!DOCTYPE") {
            break;
        } else if trimmed.starts_with("<?") {
            pos += trimmed.find("?>")? + 2;
        } else if trimmed.starts_with("<!--") {
            pos += trimmed.find("-->")? + 3;
        } else {
            return None;
        }
    }

    let start = pos;
    let bytes = xml.as_bytes();
    let mut i = start + "<!DOCTYPE".len();
    let mut in_subset = false;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                i += 1 + xml[i + 1..].find(quote as char)?;
            }
            b'<' if in_subset && bytes[i..].starts_with(b"<!--") => {
                i += xml[i..].find("-->")? + 2;
            }
            b'<' if in_subset && bytes[i..].starts_with(b"<?") => {
                i += xml[i..].find("?>")? + 1;
            }
            b'[' if !in_subset => in_subset = true,
            b']' if in_subset => in_subset = false,
            b'>' if !in_subset => return Some(start..i + 1),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Reject documents nested deeper than `max_xml_depth`
///
/// Runs over start and end tags only, without building a tree, so
/// arbitrarily deep input costs no stack.
pub(crate) fn check_nesting(xml: &str, limits: &Limits) -> Result<()> {
    let body = match doctype_span(xml) {
        Some(span) => &xml[span.end..],
        None => xml,
    };

    let mut reader = Reader::from_str(body);
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                depth += 1;
                limits.check_xml_depth(depth)?;
            }
            Ok(Event::Empty(_)) => limits.check_xml_depth(depth + 1)?,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => return Err(Error::invalid_input(e.to_string())),
        }
    }
}

/// View of one XML element during conversion or validation
#[derive(Debug, Clone, Copy)]
pub struct Element<'a, 'input> {
    node: Node<'a, 'input>,
    uses_namespaces: bool,
}

impl<'a, 'input> Element<'a, 'input> {
    /// Local name, with any namespace prefix stripped
    pub fn local_name(&self) -> &'a str {
        self.node.tag_name().name()
    }

    /// Namespace URI of the element
    pub fn namespace(&self) -> Option<&'a str> {
        self.node.tag_name().namespace()
    }

    /// Prefix bound to the element's namespace; `Some("")` for a default namespace
    pub fn prefix(&self) -> Option<&'a str> {
        self.namespace()
            .and_then(|uri| namespaces::prefix_for(self.node, uri))
    }

    /// Name as written in the document, `prefix:local` when prefixed
    pub fn qualified_name(&self) -> String {
        namespaces::qualified_name(self.node, self.namespace(), self.local_name())
    }

    /// Attributes without a namespace, in document order
    pub fn attributes(&self) -> Vec<(&'a str, &'a str)> {
        self.node
            .attributes()
            .filter(|a| a.namespace().is_none())
            .map(|a| (a.name(), a.value()))
            .collect()
    }

    /// Number of attributes, namespaced ones included
    pub fn attribute_count(&self) -> usize {
        self.node.attributes().count()
    }

    /// Look up an attribute by namespace and local name
    pub fn attribute(&self, namespace: Option<&str>, name: &str) -> Option<&'a str> {
        self.node
            .attributes()
            .find(|a| a.namespace() == namespace && a.name() == name)
            .map(|a| a.value())
    }

    /// Element children in document order
    pub fn children(&self) -> impl Iterator<Item = Element<'a, 'input>> + 'a {
        let uses_namespaces = self.uses_namespaces;
        self.node
            .children()
            .filter(|n| n.is_element())
            .map(move |node| Element {
                node,
                uses_namespaces,
            })
    }

    /// Whether the element has element children
    pub fn has_children(&self) -> bool {
        self.node.children().any(|n| n.is_element())
    }

    /// Element children grouped by namespace
    pub fn namespace_groups(&self) -> Vec<NamespaceGroup<'a, 'input>> {
        if !self.uses_namespaces {
            let children: Vec<_> = self.node.children().filter(|n| n.is_element()).collect();
            if children.is_empty() {
                return Vec::new();
            }
            return vec![NamespaceGroup {
                namespace: None,
                children,
            }];
        }
        namespaces::group_children(self.node)
    }

    /// Wrap a child node of this element
    pub fn wrap(&self, node: Node<'a, 'input>) -> Element<'a, 'input> {
        Element {
            node,
            uses_namespaces: self.uses_namespaces,
        }
    }

    /// The element's own text and CDATA content, excluding descendants
    pub fn text(&self) -> String {
        self.node
            .children()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect()
    }

    /// Own text with surrounding whitespace trimmed
    pub fn trimmed_text(&self) -> String {
        trim_text(&self.text()).to_string()
    }

    /// The underlying tree node
    pub fn node(&self) -> Node<'a, 'input> {
        self.node
    }
}
