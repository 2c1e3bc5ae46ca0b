//! XML namespace handling
//!
//! Qualified names, prefix resolution, and the namespace grouping used when
//! walking an element's children.

use crate::error::{Error, Result};
use roxmltree::Node;
use std::fmt;

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace (bound to the reserved `xml` prefix)
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Expanded name: namespace URI plus local part
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// None when the name is in no namespace
    pub namespace: Option<String>,
    /// Local part
    pub local_name: String,
}

impl QName {
    /// Name in `namespace`, or in no namespace for None
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(Into::into),
            local_name: local_name.into(),
        }
    }

    /// Name in no namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new(None::<String>, local_name)
    }

    /// Name in a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self::new(Some(namespace), local_name)
    }

    /// Whether this name is in the given namespace
    pub fn is_in(&self, namespace: Option<&str>) -> bool {
        self.namespace.as_deref() == namespace
    }
}

impl fmt::Display for QName {
    /// Clark notation: `{uri}local`, or just `local`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(uri) => write!(f, "{{{}}}{}", uri, self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

/// Expand a `prefix:local` value (an `xsi:type` or a schema `type=` reference)
/// against the bindings in scope at `node`
///
/// Unprefixed values take the default namespace in scope, if any.
pub fn resolve_prefixed(node: Node<'_, '_>, value: &str) -> Result<QName> {
    let value = value.trim();
    let (prefix, local) = match value.split_once(':') {
        Some(("xml", local)) => return Ok(QName::namespaced(XML_NAMESPACE, local)),
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, value),
    };
    let uri = node.namespaces().find(|ns| ns.name() == prefix).map(|ns| ns.uri());
    match (prefix, uri) {
        (Some(prefix), None) => Err(Error::Schema(format!(
            "prefix '{}' is not bound in '{}'",
            prefix, value
        ))),
        (_, uri) => Ok(QName::new(uri, local)),
    }
}

/// Prefix bound to `uri` in the scope of `node`; empty for a default namespace
pub fn prefix_for<'a>(node: Node<'a, '_>, uri: &str) -> Option<&'a str> {
    if uri == XML_NAMESPACE {
        return Some("xml");
    }
    // Prefer a real prefix over the default binding when both map to `uri`.
    let mut default = None;
    for ns in node.namespaces() {
        if ns.uri() == uri {
            match ns.name() {
                Some(prefix) => return Some(prefix),
                None => default = Some(""),
            }
        }
    }
    default
}

/// Name of an element or attribute as written, `prefix:local` when prefixed
pub fn qualified_name(node: Node<'_, '_>, namespace: Option<&str>, local_name: &str) -> String {
    match namespace.and_then(|uri| prefix_for(node, uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local_name),
        _ => local_name.to_string(),
    }
}

/// Children of one element that share a namespace
#[derive(Debug, Clone)]
pub struct NamespaceGroup<'a, 'input> {
    /// Namespace URI shared by every child (None for no namespace)
    pub namespace: Option<&'a str>,
    /// The children, in document order
    pub children: Vec<Node<'a, 'input>>,
}

/// Group the element children of `node` by namespace
///
/// Namespaced groups are ordered by the first use of their namespace in the
/// subtree of `node` (element names first, then prefixed attribute names, in
/// document order). Children in no namespace come last, as one group. Within
/// a group children keep document order.
pub fn group_children<'a, 'input>(node: Node<'a, 'input>) -> Vec<NamespaceGroup<'a, 'input>> {
    let mut groups: Vec<NamespaceGroup<'a, 'input>> = Vec::new();

    for child in node.children().filter(|n| n.is_element()) {
        let namespace = child.tag_name().namespace();
        match groups.iter_mut().find(|g| g.namespace == namespace) {
            Some(group) => group.children.push(child),
            None => groups.push(NamespaceGroup {
                namespace,
                children: vec![child],
            }),
        }
    }

    if groups.len() < 2 {
        return groups;
    }

    let mut order: Vec<Option<&'a str>> = Vec::with_capacity(groups.len());
    let namespaced = groups.iter().filter(|g| g.namespace.is_some()).count();
    for descendant in node.descendants().filter(|n| n.is_element()) {
        if let Some(ns) = descendant.tag_name().namespace() {
            note_use(&mut order, &groups, ns);
        }
        for attr in descendant.attributes() {
            if let Some(ns) = attr.namespace() {
                note_use(&mut order, &groups, ns);
            }
        }
        if order.len() == namespaced {
            break;
        }
    }

    groups.sort_by_key(|g| {
        order
            .iter()
            .position(|ns| *ns == g.namespace)
            .unwrap_or(usize::MAX)
    });
    groups
}

fn note_use<'a>(order: &mut Vec<Option<&'a str>>, groups: &[NamespaceGroup<'a, '_>], namespace: &'a str) {
    let namespace = Some(namespace);
    if !order.contains(&namespace) && groups.iter().any(|g| g.namespace == namespace) {
        order.push(namespace);
    }
}
